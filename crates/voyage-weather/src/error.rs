//! Weather lookup errors.

use thiserror::Error;
use voyage_core::{AppError, ConfigError, DatabaseError, NetworkError};

/// Why the provider could not produce current conditions.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Timeout or connection failure; no HTTP status was received.
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("HTTP error: {status}")]
    Http { status: u16 },

    #[error("Invalid API response format: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Map a non-success status from the current-conditions endpoint.
    pub fn from_status(status: u16, location: &str) -> Self {
        match status {
            401 => Self::InvalidApiKey,
            404 => Self::LocationNotFound(location.to_string()),
            429 => Self::RateLimited,
            _ => Self::Http { status },
        }
    }

    /// Failures that happened before the provider answered at all.
    ///
    /// Only these are eligible for the mock fallback; status and format errors are not.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_connection_level())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidApiKey => Some(401),
            Self::LocationNotFound(_) => Some(404),
            Self::RateLimited => Some(429),
            Self::Http { status } => Some(*status),
            Self::Network(_) | Self::InvalidResponse(_) => None,
        }
    }
}

/// Errors from fetching and storing weather for a location.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather API key is not configured")]
    MissingCredentials,

    #[error("Weather provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Weather storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Unexpected weather error: {0}")]
    Unexpected(String),
}

pub type WeatherResult<T> = Result<T, WeatherError>;

impl From<serde_json::Error> for WeatherError {
    fn from(e: serde_json::Error) -> Self {
        Self::Unexpected(format!("forecast serialization failed: {}", e))
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::MissingCredentials => {
                AppError::Config(ConfigError::MissingSetting("weather.access_key".to_string()))
            }
            WeatherError::Provider(ProviderError::Network(net)) => AppError::Network(net),
            WeatherError::Provider(ProviderError::InvalidResponse(msg)) => {
                AppError::Network(NetworkError::InvalidResponse(msg))
            }
            WeatherError::Provider(provider) => {
                let status = provider.status().unwrap_or_default();
                AppError::Network(NetworkError::ServerError {
                    status,
                    message: provider.to_string(),
                })
            }
            WeatherError::Storage(db) => AppError::Database(db),
            WeatherError::Unexpected(msg) => AppError::Other(anyhow::anyhow!(msg)),
        }
    }
}
