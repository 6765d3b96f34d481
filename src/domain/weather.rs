use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Night,
    Dawn,
    Morning,
    Day,
    Evening,
    Dusk,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            h if h >= 22 || h < 5 => TimeOfDay::Night,
            5..=6 => TimeOfDay::Dawn,
            7..=9 => TimeOfDay::Morning,
            10..=16 => TimeOfDay::Day,
            17..=18 => TimeOfDay::Evening,
            _ => TimeOfDay::Dusk,
        }
    }

    fn is_dark(self) -> bool {
        matches!(self, TimeOfDay::Night | TimeOfDay::Dusk | TimeOfDay::Dawn)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    #[default]
    Clear,
    Clouds,
    Fog,
    Rain,
    Snow,
    Storm,
}

impl WeatherKind {
    /// WMO weather interpretation code to a coarse kind.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => WeatherKind::Clear,
            1..=3 => WeatherKind::Clouds,
            4..=48 => WeatherKind::Fog,
            49..=67 | 80..=82 => WeatherKind::Rain,
            68..=77 | 85..=86 => WeatherKind::Snow,
            _ => WeatherKind::Storm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions as reported by a weather provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub code: u16,
    pub temperature: Option<f64>,
}

/// What the decorative background is drawn from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SkyState {
    pub time_of_day: TimeOfDay,
    pub weather: WeatherKind,
    pub temperature: Option<f64>,
    pub show_stars: bool,
    pub weather_known: bool,
}

impl SkyState {
    /// Time-of-day only; used until (and unless) weather arrives.
    pub fn fallback(hour: u32) -> Self {
        let time_of_day = TimeOfDay::from_hour(hour);
        Self {
            time_of_day,
            weather: WeatherKind::Clear,
            temperature: None,
            show_stars: time_of_day.is_dark(),
            weather_known: false,
        }
    }

    pub fn with_observation(hour: u32, observation: Observation) -> Self {
        let time_of_day = TimeOfDay::from_hour(hour);
        let weather = WeatherKind::from_code(observation.code);
        Self {
            time_of_day,
            weather,
            temperature: observation.temperature,
            show_stars: time_of_day.is_dark() && matches!(weather, WeatherKind::Clear | WeatherKind::Clouds),
            weather_known: true,
        }
    }

    /// Re-evaluates the time of day, keeping any known weather.
    pub fn at_hour(self, hour: u32) -> Self {
        let time_of_day = TimeOfDay::from_hour(hour);
        if time_of_day == self.time_of_day { return self }
        let stars_allowed = !self.weather_known || matches!(self.weather, WeatherKind::Clear | WeatherKind::Clouds);
        Self { time_of_day, show_stars: time_of_day.is_dark() && stars_allowed, ..self }
    }
}
