//! Cache-backed weather resolution.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::instrument;
use voyage_core::WeatherConfig;

use crate::error::{ProviderError, WeatherError, WeatherResult};
use crate::provider::WeatherProvider;
use crate::store::WeatherStore;
use crate::types::WeatherRecord;

/// Application entry point for weather lookups.
///
/// Serves records from the store while they are inside the cache window and
/// goes to the provider otherwise. Lookups never fail outward; every failure is
/// logged and reported as `None`.
pub struct WeatherService {
    provider: WeatherProvider,
    /// `None` when the configured window exceeds what chrono can represent.
    cache_window: Option<Duration>,
}

impl WeatherService {
    pub fn new(config: WeatherConfig, store: Arc<dyn WeatherStore>) -> WeatherResult<Self> {
        let provider = WeatherProvider::new(config, store)?;
        Ok(Self::with_provider(provider))
    }

    /// Build around an existing provider, e.g. one with a seeded random source.
    ///
    /// Cached records are read from the same store the provider writes to.
    pub fn with_provider(provider: WeatherProvider) -> Self {
        let cache_window = Duration::from_std(provider.config().cache_window()).ok();
        Self {
            provider,
            cache_window,
        }
    }

    pub fn store(&self) -> &Arc<dyn WeatherStore> {
        self.provider.store()
    }

    /// Oldest `retrieved_at` still inside the cache window.
    fn freshness_cutoff(&self) -> DateTime<Utc> {
        self.cache_window
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Weather for `location`, from the cache when fresh enough.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve_weather(&self, location: &str) -> Option<WeatherRecord> {
        if location.trim().is_empty() {
            tracing::warn!("No location provided for weather lookup");
            return None;
        }

        let cutoff = self.freshness_cutoff();
        match self.store().find_latest(location, cutoff) {
            Ok(Some(record)) => {
                tracing::info!("Using cached weather for {} from {}", location, record.retrieved_at);
                return Some(record);
            }
            Ok(None) => {
                tracing::debug!("No fresh cached weather for {}", location);
            }
            Err(e) => {
                tracing::error!("Failed to read cached weather for {}: {}", location, e);
                return None;
            }
        }

        match self.provider.fetch(location).await {
            Ok(record) => Some(record),
            Err(e) => {
                log_failure(location, &e);
                None
            }
        }
    }

    /// Fetch fresh weather for every location that has stored records.
    ///
    /// Returns the number of locations refreshed successfully.
    #[instrument(skip(self), level = "info")]
    pub async fn refresh_all(&self) -> usize {
        let locations = match self.store().distinct_locations() {
            Ok(locations) => locations,
            Err(e) => {
                tracing::error!("Failed to list stored locations: {}", e);
                return 0;
            }
        };

        let mut refreshed = 0;
        for location in &locations {
            match self.provider.fetch(location).await {
                Ok(_) => refreshed += 1,
                Err(e) => log_failure(location, &e),
            }
        }

        tracing::info!("Refreshed weather for {} of {} locations", refreshed, locations.len());
        refreshed
    }
}

fn log_failure(location: &str, error: &WeatherError) {
    match error {
        WeatherError::Provider(ProviderError::LocationNotFound(_)) => {
            tracing::warn!("Weather location not found: {}", location);
        }
        WeatherError::Provider(ProviderError::RateLimited) => {
            tracing::warn!("Weather provider rate limit hit while fetching {}", location);
        }
        WeatherError::Provider(e) if e.is_connection_level() => {
            tracing::warn!("Weather provider unreachable for {}: {}", location, e);
        }
        WeatherError::MissingCredentials | WeatherError::Provider(ProviderError::InvalidApiKey) => {
            tracing::error!("Weather provider credentials rejected or missing: {}", error);
        }
        _ => {
            tracing::error!("Error fetching weather for {}: {}", location, error);
        }
    }
}
