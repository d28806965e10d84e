use nalssi_core::NetworkError;
use serde::{Deserialize, Serialize};

/// Outcome of asking the user for location access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationPermissionStatus {
    Granted,
    Denied,
}

/// Requested positioning accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    Low,
    Balanced,
    #[default]
    High,
}

/// A position fix from the location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Accuracy,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: Accuracy::High,
        }
    }

    /// Short label used when no place name is known
    pub fn label(&self) -> String {
        format!("{:.2}, {:.2}", self.latitude, self.longitude)
    }
}

/// One reverse geocoding result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

/// Current conditions, already validated and rounded for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature_celsius: i32,
    pub category: String,
}

/// Round to the nearest integer, halves toward positive infinity.
pub fn round_temperature(celsius: f64) -> i32 {
    (celsius + 0.5).floor() as i32
}

/// Coarse weather groups as reported in OpenWeatherMap's `weather[].main`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherCategory {
    Clouds,
    Clear,
    Atmosphere,
    Snow,
    Rain,
    Drizzle,
    Thunderstorm,
    Other(String),
}

impl WeatherCategory {
    pub fn from_main(main: &str) -> Self {
        match main {
            "Clouds" => Self::Clouds,
            "Clear" => Self::Clear,
            "Atmosphere" => Self::Atmosphere,
            "Snow" => Self::Snow,
            "Rain" => Self::Rain,
            "Drizzle" => Self::Drizzle,
            "Thunderstorm" => Self::Thunderstorm,
            other => Self::Other(other.to_string()),
        }
    }

    /// Fontisto glyph name. Unknown categories show the sunny glyph.
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clouds => "cloudy",
            Self::Clear => "day-sunny",
            Self::Atmosphere => "cloudy-gusts",
            Self::Snow => "snow",
            Self::Rain => "rains",
            Self::Drizzle => "rain",
            Self::Thunderstorm => "lightning",
            Self::Other(_) => "day-sunny",
        }
    }
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Reverse geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(NetworkError),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(NetworkError),
    #[error("No API key configured")]
    MissingApiKey,
    #[error("API key rejected")]
    InvalidApiKey,
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Malformed weather response: {0}")]
    Malformed(&'static str),
}
