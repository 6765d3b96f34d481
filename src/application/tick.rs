use std::{future::Future, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

/// A fixed-interval callback that stops when the handle is dropped.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// The first call happens one `period` after spawning.
    pub fn spawn<F, Fut>(period: Duration, mut callback: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                callback().await;
            }
        });
        Self { handle }
    }

    pub fn stop(self) {}

    pub fn is_running(&self) -> bool { !self.handle.is_finished() }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
