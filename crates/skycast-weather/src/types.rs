use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skycast_core::StorageError;

use crate::condition;

/// First match returned by the geocoding endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocodeResult {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    /// First-level administrative area (state, province)
    #[serde(default)]
    pub admin1: Option<String>,
}

/// Current conditions for a geocoded city, at full API precision
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    /// Canonical name from geocoding, not the user's raw input
    pub city: String,
    pub condition_code: i32,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    /// km/h
    pub wind_speed: f64,
    pub feels_like_c: f64,
    pub is_day: bool,
}

/// Display-ready weather record.
///
/// This is what the controller exposes and what the cache persists, so
/// numbers are already rounded and formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherView {
    pub city: String,
    pub condition: String,
    pub icon_id: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    /// Background gradient, top color first
    #[serde(default)]
    pub palette: Vec<String>,
    pub temperature: String,
    pub humidity: String,
    pub wind: String,
    pub feels_like: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl WeatherView {
    /// Map raw conditions into the display form, stamped with `updated_at`.
    pub fn from_current(current: &CurrentWeather, updated_at: DateTime<Utc>) -> Self {
        let style = condition::map(current.condition_code, current.is_day);

        Self {
            city: current.city.clone(),
            condition: style.label.to_string(),
            icon_id: style.icon_id.to_string(),
            icon_url: style.icon_url,
            palette: style.palette.iter().map(|c| (*c).to_string()).collect(),
            temperature: format_degrees(current.temperature_c),
            humidity: format!("{}%", round_whole(current.humidity_pct)),
            wind: format!("{} km/h", round_whole(current.wind_speed)),
            feels_like: format_degrees(current.feels_like_c),
            last_updated: Some(updated_at),
        }
    }
}

fn format_degrees(value: f64) -> String {
    format!("{}°", round_whole(value))
}

/// Nearest whole unit. Goes through i64 so -0.4 prints as "0", not "-0".
fn round_whole(value: f64) -> i64 {
    value.round() as i64
}

/// Weather lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeatherError {
    #[error("City name is empty")]
    InvalidInput,
    #[error("City not found: {0}")]
    CityNotFound(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
}

impl WeatherError {
    /// Short message suitable for the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput => "Enter a city name.",
            Self::CityNotFound(_) => "City not found. Please try another name.",
            Self::Network(_) => "Network error. Check your connection.",
            Self::CacheUnavailable(_) => "Local cache unavailable.",
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network("request timed out".to_string())
        } else if let Some(status) = e.status() {
            Self::Network(format!("HTTP {}", status))
        } else if e.is_decode() {
            Self::Network(format!("malformed response: {}", e))
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<StorageError> for WeatherError {
    fn from(e: StorageError) -> Self {
        Self::CacheUnavailable(e.to_string())
    }
}
