//! Device location: permission and position fixes.

use async_trait::async_trait;
use nalssi_core::{LocationConfig, LocationPermission, LocationSource};
use std::sync::Arc;

use crate::types::{Accuracy, Coordinates, LocationError, LocationPermissionStatus};

/// Source of the device's position.
#[async_trait]
pub trait LocationService: Send + Sync {
    /// Ask for location access.
    async fn request_permission(&self) -> Result<LocationPermissionStatus, LocationError>;

    /// Read the current position. Only valid after permission was granted.
    async fn current_coordinates(&self, accuracy: Accuracy) -> Result<Coordinates, LocationError>;
}

/// Coordinates and consent taken from configuration.
#[derive(Debug, Clone)]
pub struct FixedLocation {
    latitude: f64,
    longitude: f64,
    permission: LocationPermission,
}

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64, permission: LocationPermission) -> Self {
        Self {
            latitude,
            longitude,
            permission,
        }
    }

    pub fn from_config(config: &LocationConfig) -> Result<Self, LocationError> {
        match (config.latitude, config.longitude) {
            (Some(lat), Some(lon)) => Ok(Self::new(lat, lon, config.permission)),
            _ => Err(LocationError::ServiceUnavailable(
                "no coordinates configured".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LocationService for FixedLocation {
    async fn request_permission(&self) -> Result<LocationPermissionStatus, LocationError> {
        Ok(match self.permission {
            LocationPermission::Granted => LocationPermissionStatus::Granted,
            LocationPermission::Denied => LocationPermissionStatus::Denied,
        })
    }

    async fn current_coordinates(&self, accuracy: Accuracy) -> Result<Coordinates, LocationError> {
        if self.permission == LocationPermission::Denied {
            return Err(LocationError::PermissionDenied);
        }
        Ok(Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy,
        })
    }
}

/// Build the location service selected in configuration.
pub fn from_config(config: &LocationConfig) -> Result<Arc<dyn LocationService>, LocationError> {
    match config.source {
        LocationSource::Fixed => Ok(Arc::new(FixedLocation::from_config(config)?)),
        #[cfg(target_os = "linux")]
        LocationSource::Geoclue => Ok(Arc::new(crate::geoclue::GeoClueLocation::new(
            crate::geoclue::DEFAULT_DESKTOP_ID,
        ))),
        #[cfg(not(target_os = "linux"))]
        LocationSource::Geoclue => Err(LocationError::ServiceUnavailable(
            "GeoClue is only available on Linux".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_granted() {
        let loc = FixedLocation::new(37.5665, 126.9780, LocationPermission::Granted);
        assert_eq!(
            loc.request_permission().await.unwrap(),
            LocationPermissionStatus::Granted
        );
        let coords = loc.current_coordinates(Accuracy::High).await.unwrap();
        assert_eq!(coords.latitude, 37.5665);
        assert_eq!(coords.longitude, 126.9780);
        assert_eq!(coords.accuracy, Accuracy::High);
    }

    #[tokio::test]
    async fn test_fixed_denied() {
        let loc = FixedLocation::new(37.5665, 126.9780, LocationPermission::Denied);
        assert_eq!(
            loc.request_permission().await.unwrap(),
            LocationPermissionStatus::Denied
        );
        assert!(matches!(
            loc.current_coordinates(Accuracy::High).await,
            Err(LocationError::PermissionDenied)
        ));
    }

    #[test]
    fn test_from_config_requires_coordinates() {
        let config = LocationConfig {
            latitude: None,
            ..LocationConfig::default()
        };
        assert!(FixedLocation::from_config(&config).is_err());
    }
}
