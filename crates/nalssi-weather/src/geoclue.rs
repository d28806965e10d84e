//! GeoClue2 location over the system D-Bus.
//!
//! Permission is decided by the GeoClue agent when the client is started: an
//! `AccessDenied` reply means the user refused. The first `LocationUpdated`
//! signal after start carries the fix.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use zbus::proxy::SignalStream;
use zbus::zvariant::OwnedObjectPath;
use zbus::{Connection, Proxy};

use crate::location::LocationService;
use crate::types::{Accuracy, Coordinates, LocationError, LocationPermissionStatus};

pub const DEFAULT_DESKTOP_ID: &str = "nalssi";

const DESTINATION: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";
const ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";

/// GClueAccuracyLevel values
fn accuracy_level(accuracy: Accuracy) -> u32 {
    match accuracy {
        Accuracy::Low => 4,      // city
        Accuracy::Balanced => 6, // street
        Accuracy::High => 8,     // exact
    }
}

struct Session {
    connection: Connection,
    client: Proxy<'static>,
    updates: SignalStream<'static>,
}

pub struct GeoClueLocation {
    desktop_id: String,
    session: Mutex<Option<Session>>,
}

impl GeoClueLocation {
    pub fn new(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
            session: Mutex::new(None),
        }
    }

    async fn start_client(&self, accuracy: Accuracy) -> Result<Session, zbus::Error> {
        let connection = Connection::system().await?;

        let manager = Proxy::new(&connection, DESTINATION, MANAGER_PATH, MANAGER_IFACE).await?;
        let client_path: OwnedObjectPath = manager.call("GetClient", &()).await?;
        tracing::debug!("GeoClue client at {}", client_path.as_str());

        let client = Proxy::new(&connection, DESTINATION, client_path, CLIENT_IFACE).await?;
        client
            .set_property("DesktopId", self.desktop_id.as_str())
            .await?;
        client
            .set_property("RequestedAccuracyLevel", accuracy_level(accuracy))
            .await?;

        // Subscribe before starting so the first update isn't missed
        let updates = client.receive_signal("LocationUpdated").await?;
        client.call_method("Start", &()).await?;

        Ok(Session {
            connection,
            client,
            updates,
        })
    }
}

fn is_access_denied(err: &zbus::Error) -> bool {
    match err {
        zbus::Error::MethodError(name, _, _) => name.as_str() == ACCESS_DENIED,
        zbus::Error::FDO(e) => matches!(**e, zbus::fdo::Error::AccessDenied(_)),
        _ => false,
    }
}

fn unavailable(err: zbus::Error) -> LocationError {
    LocationError::ServiceUnavailable(err.to_string())
}

#[async_trait]
impl LocationService for GeoClueLocation {
    async fn request_permission(&self) -> Result<LocationPermissionStatus, LocationError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(LocationPermissionStatus::Granted);
        }

        match self.start_client(Accuracy::High).await {
            Ok(s) => {
                *session = Some(s);
                tracing::info!("GeoClue granted location access");
                Ok(LocationPermissionStatus::Granted)
            }
            Err(e) if is_access_denied(&e) => {
                tracing::info!("GeoClue denied location access");
                Ok(LocationPermissionStatus::Denied)
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn current_coordinates(&self, accuracy: Accuracy) -> Result<Coordinates, LocationError> {
        let mut guard = self.session.lock().await;
        let mut session = guard.take().ok_or(LocationError::PermissionDenied)?;

        let message = session
            .updates
            .next()
            .await
            .ok_or_else(|| LocationError::Other("GeoClue update stream ended".to_string()))?;

        let (_old, new): (OwnedObjectPath, OwnedObjectPath) = message
            .body()
            .deserialize()
            .map_err(|e| LocationError::Other(e.to_string()))?;

        let location = Proxy::new(&session.connection, DESTINATION, new, LOCATION_IFACE)
            .await
            .map_err(unavailable)?;
        let latitude: f64 = location.get_property("Latitude").await.map_err(unavailable)?;
        let longitude: f64 = location
            .get_property("Longitude")
            .await
            .map_err(unavailable)?;

        if let Err(e) = session.client.call_method("Stop", &()).await {
            tracing::debug!("Failed to stop GeoClue client: {}", e);
        }

        tracing::info!("GeoClue fix: {}, {}", latitude, longitude);
        Ok(Coordinates {
            latitude,
            longitude,
            accuracy,
        })
    }
}
