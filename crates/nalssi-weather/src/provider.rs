//! Current conditions from an OpenWeatherMap-compatible API.

use async_trait::async_trait;
use nalssi_core::{NetworkError, ReqwestErrorExt, WeatherConfig};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::types::{round_temperature, Coordinates, WeatherError, WeatherReading};

/// Fetches current weather for a position.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, coordinates: &Coordinates) -> Result<WeatherReading, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: Option<OwmMain>,
    weather: Option<Vec<OwmCondition>>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    #[serde(default)]
    main: String,
}

/// Error body returned alongside non-2xx statuses
#[derive(Debug, Deserialize)]
struct OwmErrorBody {
    message: Option<String>,
}

/// Turn a response body into a reading.
///
/// A reading needs both a numeric `main.temp` and at least one entry in
/// `weather`; anything else is malformed.
pub fn parse_reading(body: &str) -> Result<WeatherReading, WeatherError> {
    let response: OwmResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let temp = response
        .main
        .and_then(|m| m.temp)
        .ok_or(WeatherError::Malformed("missing main.temp"))?;

    let condition = response
        .weather
        .and_then(|w| w.into_iter().next())
        .ok_or(WeatherError::Malformed("missing weather conditions"))?;

    Ok(WeatherReading {
        temperature_celsius: round_temperature(temp),
        category: condition.main,
    })
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig, api_key: Option<String>) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl WeatherSource for WeatherProvider {
    async fn current(&self, coordinates: &Coordinates) -> Result<WeatherReading, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;

        let url = format!("{}/data/2.5/weather", self.base_url);
        tracing::debug!(
            "Requesting weather for {}, {}",
            coordinates.latitude,
            coordinates.longitude
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("units", "metric".to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(WeatherError::InvalidApiKey);
        }

        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OwmErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.to_string());
            return Err(WeatherError::Network(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            }));
        }

        let reading = parse_reading(&body)?;
        tracing::info!(
            "Weather: {}°C, {}",
            reading.temperature_celsius,
            reading.category
        );
        Ok(reading)
    }
}
