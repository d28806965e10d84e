//! Location and weather acquisition.
//!
//! A run walks `Idle → PermissionRequested → CoordinatesAcquired →
//! PlaceResolved → WeatherRequested → WeatherPublished`, stopping early in
//! one of the failure states. Each stage either yields a value or a
//! `PipelineError`; every error ends up as a status message on the
//! `DisplayState`, never as an unobserved failure.

use nalssi_core::{AppError, WeatherError as CoreWeatherError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::geocode::{GeocodeOptions, ReverseGeocoder};
use crate::location::LocationService;
use crate::provider::WeatherSource;
use crate::types::{
    Accuracy, Coordinates, LocationError, LocationPermissionStatus, WeatherError, WeatherReading,
};

pub const LOADING_PLACEHOLDER: &str = "Loading...";

const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Idle,
    PermissionRequested,
    Denied,
    LocationUnavailable,
    CoordinatesAcquired,
    PlaceResolved,
    WeatherRequested,
    WeatherPublished,
    WeatherUnavailable,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Denied | Self::LocationUnavailable | Self::WeatherPublished | Self::WeatherUnavailable
        )
    }
}

/// Everything the screen shows. One writer: the running pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    /// Place name, or the loading placeholder until resolved
    pub city: String,
    /// Failure message; shown in place of the city when set
    pub status: Option<String>,
    pub date_label: String,
    /// Rounded °C; `None` until weather is published
    pub temperature: Option<i32>,
    /// `weather[0].main` from the provider; empty until known
    pub weather_category: String,
    pub stage: PipelineStage,
}

impl DisplayState {
    pub fn new(date_label: impl Into<String>) -> Self {
        Self {
            city: LOADING_PLACEHOLDER.to_string(),
            status: None,
            date_label: date_label.into(),
            temperature: None,
            weather_category: String::new(),
            stage: PipelineStage::Idle,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location failed: {0}")]
    Location(LocationError),
    #[error("Weather failed: {0}")]
    Weather(#[from] WeatherError),
}

impl From<LocationError> for PipelineError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::PermissionDenied => PipelineError::PermissionDenied,
            other => PipelineError::Location(other),
        }
    }
}

impl PipelineError {
    pub fn terminal_stage(&self) -> PipelineStage {
        match self {
            PipelineError::PermissionDenied => PipelineStage::Denied,
            PipelineError::Location(_) => PipelineStage::LocationUnavailable,
            PipelineError::Weather(_) => PipelineStage::WeatherUnavailable,
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::PermissionDenied => {
                AppError::Weather(CoreWeatherError::PermissionDenied)
            }
            PipelineError::Location(e) => {
                AppError::Weather(CoreWeatherError::LocationUnavailable(e.to_string()))
            }
            PipelineError::Weather(WeatherError::Network(n)) => AppError::Network(n),
            PipelineError::Weather(WeatherError::MissingApiKey) => {
                AppError::Weather(CoreWeatherError::MissingApiKey)
            }
            PipelineError::Weather(WeatherError::InvalidApiKey) => {
                AppError::Weather(CoreWeatherError::InvalidApiKey)
            }
            PipelineError::Weather(e @ (WeatherError::Parse(_) | WeatherError::Malformed(_))) => {
                AppError::Weather(CoreWeatherError::DataUnavailable(e.to_string()))
            }
        }
    }
}

pub struct AcquisitionPipeline {
    location: Arc<dyn LocationService>,
    geocoder: Arc<dyn ReverseGeocoder>,
    weather: Arc<dyn WeatherSource>,
    location_timeout: Duration,
}

impl AcquisitionPipeline {
    pub fn new(
        location: Arc<dyn LocationService>,
        geocoder: Arc<dyn ReverseGeocoder>,
        weather: Arc<dyn WeatherSource>,
    ) -> Self {
        Self {
            location,
            geocoder,
            weather,
            location_timeout: DEFAULT_LOCATION_TIMEOUT,
        }
    }

    /// Upper bound on waiting for a position fix.
    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    /// Run every stage once, publishing into `state`. Returns the terminal stage.
    pub async fn run(&self, state: &watch::Sender<DisplayState>) -> PipelineStage {
        match self.acquire(state).await {
            Ok(reading) => {
                state.send_modify(|s| {
                    s.temperature = Some(reading.temperature_celsius);
                    s.weather_category = reading.category;
                    s.stage = PipelineStage::WeatherPublished;
                });
                tracing::info!("Weather published");
                PipelineStage::WeatherPublished
            }
            Err(err) => {
                let stage = err.terminal_stage();
                tracing::warn!("Acquisition stopped at {:?}: {}", stage, err);
                let message = AppError::from(err).user_message();
                state.send_modify(|s| {
                    s.status = Some(message.to_string());
                    s.stage = stage;
                });
                stage
            }
        }
    }

    async fn acquire(
        &self,
        state: &watch::Sender<DisplayState>,
    ) -> Result<WeatherReading, PipelineError> {
        advance(state, PipelineStage::PermissionRequested);
        let permission = self.location.request_permission().await?;
        if permission != LocationPermissionStatus::Granted {
            return Err(PipelineError::PermissionDenied);
        }

        let coordinates = tokio::time::timeout(
            self.location_timeout,
            self.location.current_coordinates(Accuracy::High),
        )
        .await
        .map_err(|_| LocationError::Timeout)??;
        advance(state, PipelineStage::CoordinatesAcquired);

        let city = self.resolve_city(&coordinates).await;
        tracing::info!("City: {}", city);
        state.send_modify(|s| {
            s.city = city;
            s.stage = PipelineStage::PlaceResolved;
        });

        advance(state, PipelineStage::WeatherRequested);
        Ok(self.weather.current(&coordinates).await?)
    }

    /// First result's city, or the coordinates when there is none.
    async fn resolve_city(&self, coordinates: &Coordinates) -> String {
        let options = GeocodeOptions {
            use_vendor_geocoder: false,
        };

        match self.geocoder.reverse_geocode(coordinates, options).await {
            Ok(places) => match places.into_iter().next().and_then(|p| p.city) {
                Some(city) => city,
                None => {
                    tracing::warn!("No place found, showing coordinates");
                    coordinates.label()
                }
            },
            Err(e) => {
                tracing::warn!("Reverse geocode failed: {}, showing coordinates", e);
                coordinates.label()
            }
        }
    }
}

fn advance(state: &watch::Sender<DisplayState>, stage: PipelineStage) {
    tracing::debug!("Pipeline stage: {:?}", stage);
    state.send_modify(|s| s.stage = stage);
}
