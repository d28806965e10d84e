pub mod config;
pub mod error;
pub mod secrets;

pub use config::{
    Config, GeocodingConfig, LocationConfig, LocationPermission, LocationSource, ValidationResult,
    WeatherConfig,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, WeatherError};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Log output goes to stderr so stdout only carries the rendered screen.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Nalssi core initialized");
    Ok(())
}
