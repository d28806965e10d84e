use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather service settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Where coordinates come from
    #[serde(default)]
    pub location: LocationConfig,

    /// Reverse geocoding backend
    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the OpenWeatherMap-compatible API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// API key. Prefer the environment or the system keyring; see `secrets`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// HTTP timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            api_key: None,
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Location backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Coordinates from this config file
    #[default]
    Fixed,
    /// GeoClue2 over the system D-Bus (Linux only)
    Geoclue,
}

/// Consent answer used by the fixed location source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationPermission {
    #[default]
    Granted,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub source: LocationSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub permission: LocationPermission,

    /// How long to wait for a position fix
    #[serde(default = "default_location_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_location_timeout_secs() -> u64 {
    30
}

impl Default for LocationConfig {
    fn default() -> Self {
        // Seoul City Hall
        Self {
            source: LocationSource::Fixed,
            latitude: Some(37.5665),
            longitude: Some(126.9780),
            permission: LocationPermission::Granted,
            timeout_secs: default_location_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Nominatim-compatible reverse geocoding endpoint
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,

    /// Nominatim's usage policy requires an identifying User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    format!("Nalssi/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        self.validate_url(&self.geocoding.base_url, "geocoding.base_url", &mut result);

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        }
        if self.geocoding.timeout_secs == 0 {
            result.add_error("geocoding.timeout_secs", "Timeout must be greater than 0");
        }
        if self.location.timeout_secs == 0 {
            result.add_error("location.timeout_secs", "Timeout must be greater than 0");
        }

        if self.geocoding.user_agent.trim().is_empty() {
            result.add_error("geocoding.user_agent", "User agent must not be empty");
        }

        if let Some(lat) = self.location.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                result.add_error("location.latitude", "Latitude must be within -90..=90");
            }
        }
        if let Some(lon) = self.location.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                result.add_error("location.longitude", "Longitude must be within -180..=180");
            }
        }

        match self.location.source {
            LocationSource::Fixed => {
                if self.location.latitude.is_none() || self.location.longitude.is_none() {
                    result.add_error(
                        "location",
                        "Fixed location source requires latitude and longitude",
                    );
                }
            }
            LocationSource::Geoclue => {
                if !cfg!(target_os = "linux") {
                    result.add_error("location.source", "GeoClue is only available on Linux");
                }
            }
        }

        // The key may still come from the environment or the keyring
        if self.weather.api_key.as_deref().map_or(true, str::is_empty) {
            result.add_warning(
                "weather.api_key",
                "No API key in config file - expecting NALSSI_OWM_API_KEY or keyring entry",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nalssi");

        Ok(config_dir.join("config.toml"))
    }
}
