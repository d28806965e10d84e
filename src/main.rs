use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nalssi_core::{secrets, LocationPermission, LocationSource};
use nalssi_weather::{
    location, AcquisitionPipeline, NominatimGeocoder, Screen, SystemClock, WeatherProvider,
    WeatherView,
};

/// Current city, date, temperature and weather icon for where you are.
#[derive(Debug, Parser)]
#[command(name = "nalssi", version)]
struct Cli {
    /// Alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Latitude override (uses fixed coordinates)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude override (uses fixed coordinates)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Print the display state as JSON instead of the text screen
    #[arg(long)]
    json: bool,

    /// Save an OpenWeatherMap API key in the system keyring and exit
    #[arg(long, value_name = "KEY")]
    store_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    nalssi_core::init()?;

    if let Some(key) = cli.store_api_key.as_deref() {
        secrets::store_api_key(key).context("Failed to store API key")?;
        println!("API key saved to the system keyring");
        return Ok(());
    }

    let (mut config, _) = nalssi_core::Config::load_validated(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let (Some(lat), Some(lon)) = (cli.lat, cli.lon) {
        config.location.source = LocationSource::Fixed;
        config.location.latitude = Some(lat);
        config.location.longitude = Some(lon);
        config.location.permission = LocationPermission::Granted;
    }

    let api_key = secrets::resolve_api_key(&config.weather);
    if api_key.is_none() {
        tracing::warn!("No weather API key found");
    }

    let locator = location::from_config(&config.location)
        .context("Failed to set up location service")?;
    let geocoder = NominatimGeocoder::new(&config.geocoding)
        .context("Failed to set up geocoder")?;
    let weather =
        WeatherProvider::new(&config.weather, api_key).context("Failed to set up weather provider")?;

    let pipeline = AcquisitionPipeline::new(locator, Arc::new(geocoder), Arc::new(weather))
        .with_location_timeout(Duration::from_secs(config.location.timeout_secs));

    let screen = Screen::new(
        pipeline,
        Arc::new(SystemClock),
        tokio::runtime::Handle::current(),
    );
    screen.mount();
    let stage = screen.wait().await;
    tracing::info!("Pipeline finished: {:?}", stage);

    let state = screen.state();
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&state).context("Failed to serialize state")?
        );
    } else {
        print!("{}", WeatherView::from(&state).render());
    }

    Ok(())
}
