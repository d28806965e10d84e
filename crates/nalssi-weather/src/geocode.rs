//! Reverse geocoding: convert coordinates to human-readable place names.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use async_trait::async_trait;
use nalssi_core::{GeocodingConfig, ReqwestErrorExt};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::types::{Coordinates, GeocodeError, Place};

/// Options for a reverse geocoding request
#[derive(Debug, Clone, Copy, Default)]
pub struct GeocodeOptions {
    /// Use a map vendor's geocoder instead of the open backend.
    ///
    /// The pipeline always sends `false`. `NominatimGeocoder` has no vendor
    /// mode and ignores the flag either way.
    pub use_vendor_geocoder: bool,
}

/// Resolves coordinates to places, best match first.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(
        &self,
        coordinates: &Coordinates,
        options: GeocodeOptions,
    ) -> Result<Vec<Place>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
    /// Present instead of `address` when nothing is found
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    province: Option<String>,
    country: Option<String>,
}

impl From<NominatimAddress> for Place {
    fn from(addr: NominatimAddress) -> Self {
        // Prefer city > town > village > municipality
        let city = addr
            .city
            .or(addr.town)
            .or(addr.village)
            .or(addr.municipality);

        Place {
            city,
            region: addr.state.or(addr.province),
            country: addr.country,
        }
    }
}

/// OpenStreetMap reverse geocoder. Never contacts a map vendor, whatever
/// `GeocodeOptions::use_vendor_geocoder` says.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GeocodeError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(
        &self,
        coordinates: &Coordinates,
        options: GeocodeOptions,
    ) -> Result<Vec<Place>, GeocodeError> {
        if options.use_vendor_geocoder {
            tracing::debug!("Vendor geocoder requested; Nominatim has no vendor mode");
        }

        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("layer", "address".to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GeocodeError::Network(e.into_network_error()))?;

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        if let Some(err) = body.error {
            tracing::debug!("Reverse geocode found nothing: {}", err);
        }

        let places: Vec<Place> = body.address.map(Place::from).into_iter().collect();
        tracing::debug!("Reverse geocoded to {} place(s)", places.len());
        Ok(places)
    }
}
