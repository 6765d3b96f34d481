use std::{net::SocketAddr, path::PathBuf};

use thiserror::Error;

use crate::{domain::weather::Coordinates, infrastructure::open_meteo::DEFAULT_BASE_URL};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_DATA_DIR: &str = ".hamlet";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: `{value}`")]
    InvalidBind { var: &'static str, value: String },
    #[error("{var} must be a number between {min} and {max}, got `{value}`")]
    InvalidCoordinate { var: &'static str, value: String, min: f64, max: f64 },
    #[error("HAMLET_LATITUDE and HAMLET_LONGITUDE must be set together")]
    IncompleteCoordinates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `None` runs against the unconfigured store.
    pub database_url: Option<String>,
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub coordinates: Option<Coordinates>,
    pub weather_url: String,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = var("HAMLET_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse()
            .map_err(|_| ConfigError::InvalidBind { var: "HAMLET_BIND", value: bind_raw.clone() })?;

        let latitude = var("HAMLET_LATITUDE").map(|v| coordinate("HAMLET_LATITUDE", v, 90.0)).transpose()?;
        let longitude = var("HAMLET_LONGITUDE").map(|v| coordinate("HAMLET_LONGITUDE", v, 180.0)).transpose()?;
        let coordinates = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteCoordinates),
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            bind,
            data_dir: PathBuf::from(var("HAMLET_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            coordinates,
            weather_url: var("HAMLET_WEATHER_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

fn coordinate(var: &'static str, value: String, limit: f64) -> Result<f64, ConfigError> {
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.abs() <= limit => Ok(parsed),
        _ => Err(ConfigError::InvalidCoordinate { var, value, min: -limit, max: limit }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.bind, DEFAULT_BIND.parse().unwrap());
        assert_eq!(cfg.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(cfg.coordinates, None);
        assert_eq!(cfg.weather_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn blank_database_url_counts_as_unset() {
        assert_eq!(config(&[("DATABASE_URL", "  ")]).unwrap().database_url, None);
        assert_eq!(
            config(&[("DATABASE_URL", "sqlite://village.db")]).unwrap().database_url.as_deref(),
            Some("sqlite://village.db")
        );
    }

    #[test]
    fn coordinates_come_in_pairs() {
        let cfg = config(&[("HAMLET_LATITUDE", "51.5"), ("HAMLET_LONGITUDE", "-0.12")]).unwrap();
        assert_eq!(cfg.coordinates, Some(Coordinates { latitude: 51.5, longitude: -0.12 }));
        assert_eq!(config(&[("HAMLET_LATITUDE", "51.5")]).unwrap_err(), ConfigError::IncompleteCoordinates);
        assert!(matches!(
            config(&[("HAMLET_LATITUDE", "95"), ("HAMLET_LONGITUDE", "0")]),
            Err(ConfigError::InvalidCoordinate { var: "HAMLET_LATITUDE", .. })
        ));
    }

    #[test]
    fn bad_bind_is_rejected() {
        assert!(matches!(config(&[("HAMLET_BIND", "localhost")]), Err(ConfigError::InvalidBind { .. })));
    }
}
