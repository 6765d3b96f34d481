use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::{
    repository::{WeatherError, WeatherProvider},
    weather::{Coordinates, Observation},
};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    weather_code: Option<u16>,
    temperature_2m: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into().trim_end_matches('/').to_string() }
    }
}

impl Default for OpenMeteoClient {
    fn default() -> Self { Self::new(DEFAULT_BASE_URL) }
}

fn observation_from(body: ForecastResponse) -> Observation {
    let current = body.current;
    Observation {
        code: current.as_ref().and_then(|c| c.weather_code).unwrap_or(0),
        temperature: current.and_then(|c| c.temperature_2m),
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn current(&self, at: Coordinates) -> Result<Observation, WeatherError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", at.latitude.to_string()),
                ("longitude", at.longitude.to_string()),
                ("current", "weather_code,temperature_2m".to_string()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError(format!("http {}", status.as_u16())));
        }
        let body: ForecastResponse = response.json().await.map_err(|e| WeatherError(e.to_string()))?;
        Ok(observation_from(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_clear() {
        let body: ForecastResponse = serde_json::from_str(r#"{"current": {"temperature_2m": 12.5}}"#).unwrap();
        assert_eq!(observation_from(body), Observation { code: 0, temperature: Some(12.5) });
        let empty: ForecastResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(observation_from(empty), Observation { code: 0, temperature: None });
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(OpenMeteoClient::new("http://localhost:9/").base_url, "http://localhost:9");
    }
}
