//! Weather screen for Nalssi
//!
//! Finds where the device is, names the place via OpenStreetMap, fetches
//! current conditions from OpenWeatherMap and publishes everything as a
//! `DisplayState` for the screen to render.

pub mod date;
pub mod geocode;
pub mod location;
pub mod pipeline;
pub mod provider;
pub mod screen;
pub mod types;
pub mod view;

#[cfg(target_os = "linux")]
pub mod geoclue;

pub use date::{date_label, Clock, FixedClock, SystemClock};
pub use geocode::{GeocodeOptions, NominatimGeocoder, ReverseGeocoder};
pub use location::{FixedLocation, LocationService};
pub use pipeline::{AcquisitionPipeline, DisplayState, PipelineError, PipelineStage};
pub use provider::{WeatherProvider, WeatherSource};
pub use screen::Screen;
pub use types::*;
pub use view::WeatherView;
