use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::RwLock;

use crate::domain::{
    repository::WeatherProvider,
    weather::{Coordinates, SkyState},
};

/// Raised by the owning view when it goes away before a fetch settles.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst) }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

#[derive(Clone)]
pub struct SkyService {
    state: Arc<RwLock<SkyState>>,
    fetched: Arc<AtomicBool>,
}

impl SkyService {
    pub fn new(hour: u32) -> Self {
        Self { state: Arc::new(RwLock::new(SkyState::fallback(hour))), fetched: Arc::new(AtomicBool::new(false)) }
    }

    pub async fn state(&self) -> SkyState { *self.state.read().await }

    pub async fn refresh_time_of_day(&self, hour: u32) -> SkyState {
        let mut state = self.state.write().await;
        *state = state.at_hour(hour);
        *state
    }

    /// At most one lookup per session. Failures leave the time-of-day
    /// fallback in place.
    pub async fn fetch_weather<P: WeatherProvider + ?Sized>(
        &self,
        provider: &P,
        at: Option<Coordinates>,
        hour: u32,
        cancel: &CancelFlag,
    ) -> SkyState {
        let Some(at) = at else {
            tracing::debug!("no coordinates; keeping time-of-day sky");
            return self.state().await;
        };
        if self.fetched.swap(true, Ordering::SeqCst) {
            return self.state().await;
        }
        match provider.current(at).await {
            Ok(_) if cancel.is_cancelled() => {
                tracing::debug!("weather arrived after cancellation; discarded");
                self.state().await
            }
            Ok(observation) => {
                let next = SkyState::with_observation(hour, observation);
                *self.state.write().await = next;
                tracing::debug!(weather = ?next.weather, "weather applied");
                next
            }
            Err(err) => {
                tracing::debug!(error = %err, "weather unavailable");
                self.state().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        repository::WeatherError,
        weather::{Observation, TimeOfDay, WeatherKind},
    };
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct FakeWeather {
        calls: AtomicUsize,
        fail: bool,
        cancel_during: Option<CancelFlag>,
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn current(&self, _at: Coordinates) -> Result<Observation, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(flag) = &self.cancel_during {
                flag.cancel();
            }
            if self.fail {
                return Err(WeatherError("offline".into()));
            }
            Ok(Observation { code: 61, temperature: Some(11.5) })
        }
    }

    const HERE: Option<Coordinates> = Some(Coordinates { latitude: 51.5, longitude: -0.1 });

    #[tokio::test]
    async fn weather_is_fetched_once() {
        let sky = SkyService::new(12);
        let provider = FakeWeather::default();
        let cancel = CancelFlag::default();
        let state = sky.fetch_weather(&provider, HERE, 12, &cancel).await;
        assert_eq!(state.weather, WeatherKind::Rain);
        assert_eq!(state.temperature, Some(11.5));
        sky.fetch_weather(&provider, HERE, 12, &cancel).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_and_missing_coordinates_keep_the_fallback() {
        let sky = SkyService::new(23);
        let provider = FakeWeather { fail: true, ..FakeWeather::default() };
        let cancel = CancelFlag::default();
        assert_eq!(sky.fetch_weather(&provider, None, 23, &cancel).await, SkyState::fallback(23));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        let state = sky.fetch_weather(&provider, HERE, 23, &cancel).await;
        assert_eq!(state, SkyState::fallback(23));
        assert!(state.show_stars);
    }

    #[tokio::test]
    async fn cancelled_fetch_is_discarded() {
        let sky = SkyService::new(12);
        let cancel = CancelFlag::default();
        let provider = FakeWeather { cancel_during: Some(cancel.clone()), ..FakeWeather::default() };
        let state = sky.fetch_weather(&provider, HERE, 12, &cancel).await;
        assert!(!state.weather_known);
        assert_eq!(state.weather, WeatherKind::Clear);
    }

    #[tokio::test]
    async fn time_of_day_refresh_keeps_weather() {
        let sky = SkyService::new(12);
        sky.fetch_weather(&FakeWeather::default(), HERE, 12, &CancelFlag::default()).await;
        let evening = sky.refresh_time_of_day(23).await;
        assert_eq!(evening.time_of_day, TimeOfDay::Night);
        assert_eq!(evening.weather, WeatherKind::Rain);
        assert!(!evening.show_stars);
    }
}
