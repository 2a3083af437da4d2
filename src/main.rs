use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use voyage_core::{AppError, Config, ConfigError};
use voyage_weather::{
    condition_icon, extract_forecast, SqliteWeatherStore, WeatherRecord, WeatherService,
    WeatherStore,
};

/// Weather for trip destinations
#[derive(Parser)]
#[command(name = "voyage", about = "Look up and cache weather for trip destinations")]
struct Cli {
    /// Destinations to look up, e.g. "Paris" or "New York"
    locations: Vec<String>,

    /// Fetch fresh weather for every stored destination, then exit.
    #[arg(long)]
    refresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize core
    voyage_core::init()?;

    let (config, _validation) = match Config::load_validated() {
        Ok(loaded) => loaded,
        Err(e) => {
            if let Some(config_err) = e.downcast_ref::<ConfigError>() {
                eprintln!("{}", config_err.user_message());
            }
            return Err(e);
        }
    };

    let store: Arc<dyn WeatherStore> = match SqliteWeatherStore::open(&config.database_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            let app = AppError::from(e);
            eprintln!("{}", app.user_message());
            return Err(app.into());
        }
    };
    tracing::info!("Weather store at {}", config.database_path.display());

    let service = WeatherService::new(config.weather.clone(), store.clone())
        .map_err(AppError::from)?;

    if cli.refresh {
        let refreshed = service.refresh_all().await;
        println!("Refreshed weather for {} location(s)", refreshed);
        return Ok(());
    }

    if cli.locations.is_empty() {
        println!("Voyage - trip destination weather");
        println!("\nUsage: voyage [LOCATION ...] | voyage --refresh");
        print_summary(store.as_ref(), &config);
        return Ok(());
    }

    for location in &cli.locations {
        match service.resolve_weather(location).await {
            Some(record) => print_record(&record),
            None => println!("{}: weather unavailable", location),
        }
    }

    Ok(())
}

fn print_record(record: &WeatherRecord) {
    println!("{}", record);
    for day in extract_forecast(Some(record)) {
        println!(
            "  {}  {:>5.1}°C  {:<14} {:<16} [{}]",
            day.date,
            day.temperature,
            day.condition,
            day.description,
            condition_icon(&day.condition)
        );
    }
}

fn print_summary(store: &dyn WeatherStore, config: &Config) {
    println!("\nConfiguration:");
    println!("  Database: {}", config.database_path.display());
    println!("  Provider: {}", config.weather.base_url);
    println!(
        "  API key: {}",
        if config.weather.is_configured() { "configured" } else { "not configured" }
    );
    println!("  Mock fallback: {}", config.weather.mock_fallback_enabled);

    match (store.count(), store.distinct_locations()) {
        (Ok(count), Ok(locations)) => {
            println!("\nStored records: {}", count);
            if !locations.is_empty() {
                println!("Locations: {}", locations.join(", "));
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Failed to read weather store: {}", e);
            println!("\n{}", e.user_message());
        }
    }
}
