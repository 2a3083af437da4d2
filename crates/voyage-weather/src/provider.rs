//! OpenWeatherMap-compatible provider client.

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;
use voyage_core::{ReqwestErrorExt, WeatherConfig};

use crate::error::{ProviderError, WeatherError, WeatherResult};
use crate::forecast::aggregate_daily;
use crate::mock::mock_record;
use crate::store::WeatherStore;
use crate::types::WeatherRecord;

/// Number of forecast samples requested from the provider.
const FORECAST_SAMPLE_COUNT: &str = "5";

/// Current conditions as read from the provider.
#[derive(Debug, Clone, PartialEq)]
struct CurrentConditions {
    temperature: f64,
    conditions: String,
}

impl CurrentConditions {
    fn from_json(data: &Value) -> Self {
        Self {
            temperature: data
                .pointer("/main/temp")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            conditions: data
                .pointer("/weather/0/main")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
        }
    }
}

/// Fetches weather from the provider and persists every record it produces.
pub struct WeatherProvider {
    client: reqwest::Client,
    config: WeatherConfig,
    store: Arc<dyn WeatherStore>,
    rng: Mutex<StdRng>,
}

impl WeatherProvider {
    pub fn new(config: WeatherConfig, store: Arc<dyn WeatherStore>) -> WeatherResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| WeatherError::Unexpected(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            store,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Replace the random source used for generated records.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    /// Store every fetched or generated record is written to.
    pub fn store(&self) -> &Arc<dyn WeatherStore> {
        &self.store
    }

    /// Fetch current conditions and forecast for `location`, then store the result.
    ///
    /// With mock fallback enabled, missing credentials and connection-level
    /// failures produce a generated record instead. HTTP status errors and
    /// unreadable responses are always returned as errors.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self, location: &str) -> WeatherResult<WeatherRecord> {
        if !self.config.is_configured() {
            if self.config.mock_fallback_enabled {
                tracing::warn!("Weather API key not configured, using mock data for {}", location);
                return self.store_mock(location);
            }
            tracing::error!("Weather API key not configured");
            return Err(WeatherError::MissingCredentials);
        }

        let current = match self.fetch_current(location).await {
            Ok(current) => current,
            Err(e) if e.is_connection_level() && self.config.mock_fallback_enabled => {
                tracing::warn!("Weather provider unreachable ({}), using mock data for {}", e, location);
                return self.store_mock(location);
            }
            Err(e) => return Err(e.into()),
        };

        match self.complete_record(location, current).await {
            Ok(record) => Ok(record),
            Err(e) if self.config.mock_fallback_enabled => {
                tracing::warn!("Failed to build weather record ({}), using mock data for {}", e, location);
                self.store_mock(location)
            }
            Err(e) => Err(e),
        }
    }

    async fn complete_record(
        &self,
        location: &str,
        current: CurrentConditions,
    ) -> WeatherResult<WeatherRecord> {
        let samples = self.fetch_forecast_samples(location).await;
        let forecast = aggregate_daily(&samples);

        let record = WeatherRecord::new(
            location,
            current.temperature,
            &current.conditions,
            &forecast,
        )?;
        let record = self.store.insert(record)?;

        tracing::info!(
            "Fetched weather for {}: {} {:.1}°C, {} forecast days",
            location,
            record.conditions,
            record.temperature,
            forecast.len()
        );
        Ok(record)
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_current(&self, location: &str) -> Result<CurrentConditions, ProviderError> {
        let url = format!("{}/weather", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.config.access_key.trim()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.into_network_error()))?;

        let data = self.handle_response(response, location).await?;
        Ok(CurrentConditions::from_json(&data))
    }

    /// Raw forecast samples; any failure is logged and yields an empty list.
    #[instrument(skip(self), level = "debug")]
    async fn fetch_forecast_samples(&self, location: &str) -> Vec<Value> {
        match self.try_fetch_forecast(location).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::error!("Error fetching forecast for {}: {}", location, e);
                Vec::new()
            }
        }
    }

    async fn try_fetch_forecast(&self, location: &str) -> Result<Vec<Value>, ProviderError> {
        let url = format!("{}/forecast", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.config.access_key.trim()),
                ("units", "metric"),
                ("cnt", FORECAST_SAMPLE_COUNT),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.into_network_error()))?;

        let data = self.handle_response(response, location).await?;
        match data.get("list") {
            Some(Value::Array(samples)) => Ok(samples.clone()),
            Some(_) => Err(ProviderError::InvalidResponse(
                "forecast list is not an array".to_string(),
            )),
            None => Ok(Vec::new()),
        }
    }

    /// Map the status, then decode the body as JSON.
    async fn handle_response(
        &self,
        response: reqwest::Response,
        location: &str,
    ) -> Result<Value, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), location));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.into_network_error()))?;

        serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    fn store_mock(&self, location: &str) -> WeatherResult<WeatherRecord> {
        let today = Utc::now().date_naive();
        let record = {
            let mut rng = self.rng.lock();
            mock_record(location, &mut *rng, today)?
        };

        let record = self.store.insert(record)?;
        tracing::info!("Stored mock weather for {}", location);
        Ok(record)
    }
}
