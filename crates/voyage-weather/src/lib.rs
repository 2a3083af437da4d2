//! Weather retrieval, caching and aggregation for Voyage trips.
//!
//! [`WeatherService`] is the entry point: it serves a recent stored record for
//! a destination when one exists and otherwise asks [`WeatherProvider`], which
//! talks to an OpenWeatherMap-compatible API and falls back to generated data
//! when configured to.

pub mod error;
pub mod forecast;
pub mod mock;
pub mod provider;
pub mod service;
pub mod store;
pub mod types;

pub use error::{ProviderError, WeatherError, WeatherResult};
pub use forecast::{aggregate_daily, extract_forecast};
pub use mock::mock_record;
pub use provider::WeatherProvider;
pub use service::WeatherService;
pub use store::{SqliteWeatherStore, WeatherStore};
pub use types::{condition_color, condition_icon, DailyForecast, WeatherRecord};
