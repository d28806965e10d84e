//! Integration tests for the Nominatim reverse geocoder using wiremock.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nalssi_core::{GeocodingConfig, NetworkError};
use nalssi_weather::{Coordinates, GeocodeError, GeocodeOptions, NominatimGeocoder, ReverseGeocoder};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn geocoder(server: &MockServer) -> NominatimGeocoder {
    NominatimGeocoder::new(&GeocodingConfig {
        base_url: server.uri(),
        ..GeocodingConfig::default()
    })
    .unwrap()
}

fn seoul() -> Coordinates {
    Coordinates::new(37.5665, 126.9780)
}

#[tokio::test]
async fn test_vendor_flag_still_uses_nominatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .and(query_param("addressdetails", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "address": { "town": "Gapyeong", "province": "Gyeonggi", "country": "South Korea" }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let geocoder = geocoder(&server);
    let open = geocoder
        .reverse_geocode(&seoul(), GeocodeOptions::default())
        .await
        .unwrap();
    let vendor = geocoder
        .reverse_geocode(
            &seoul(),
            GeocodeOptions {
                use_vendor_geocoder: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(open, vendor);
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].city.as_deref(), Some("Gapyeong"));
    assert_eq!(open[0].region.as_deref(), Some("Gyeonggi"));
}

#[tokio::test]
async fn test_unable_to_geocode_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "error": "Unable to geocode" })),
        )
        .mount(&server)
        .await;

    let places = geocoder(&server)
        .reverse_geocode(&seoul(), GeocodeOptions::default())
        .await
        .unwrap();
    assert!(places.is_empty());
}

#[tokio::test]
async fn test_server_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = geocoder(&server)
        .reverse_geocode(&seoul(), GeocodeOptions::default())
        .await;
    assert!(matches!(
        result,
        Err(GeocodeError::Network(NetworkError::ServerError { status: 503, .. }))
    ));
}
