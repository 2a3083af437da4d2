use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the weather provider access key.
pub const ENV_API_KEY: &str = "WEATHER_API_KEY";
/// Environment variable holding the weather provider base URL.
pub const ENV_API_URL: &str = "WEATHER_API_URL";
/// Environment variable toggling the mock-data fallback.
pub const ENV_USE_MOCK_DATA: &str = "WEATHER_USE_MOCK_DATA";

/// Longest accepted cache window (one year).
pub const MAX_CACHE_HOURS: u32 = 24 * 365;

/// Placeholder shipped in sample settings files; treated as "no key".
const PLACEHOLDER_API_KEY: &str = "your_weather_api_key";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database holding cached weather records
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Weather provider configuration, handed to the provider and resolver at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Provider access key (`appid`). Empty means not configured.
    #[serde(default)]
    pub access_key: String,

    /// Provider endpoint root, e.g. `https://api.openweathermap.org/data/2.5`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Degrade to generated data on missing credentials or connection failures
    #[serde(default = "default_mock_fallback")]
    pub mock_fallback_enabled: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long a stored record stays fresh, in hours
    #[serde(default = "default_cache_hours")]
    pub cache_hours: u32,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_mock_fallback() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_cache_hours() -> u32 {
    3
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voyage")
        .join("weather.db")
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            base_url: default_base_url(),
            mock_fallback_enabled: default_mock_fallback(),
            timeout_secs: default_timeout_secs(),
            cache_hours: default_cache_hours(),
        }
    }
}

impl WeatherConfig {
    /// Check if an access key is configured (not empty and not a placeholder)
    pub fn is_configured(&self) -> bool {
        let key = self.access_key.trim();
        !key.is_empty()
            && !key.eq_ignore_ascii_case(PLACEHOLDER_API_KEY)
            && !key.starts_with("YOUR_")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Maximum age of a reusable cached record
    pub fn cache_window(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_hours) * 60 * 60)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default file
    /// if none exists, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file, writing defaults there if it is missing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", config_path.display(), e))
        })?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load()?.into_validated()
    }

    fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Apply `WEATHER_*` environment variables on top of file settings.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the process environment in production).
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.weather.access_key = key;
        }

        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.weather.base_url = url;
        }

        if let Some(raw) = lookup(ENV_USE_MOCK_DATA) {
            match parse_flag(&raw) {
                Some(flag) => self.weather.mock_fallback_enabled = flag,
                None => tracing::warn!(
                    "Ignoring {}={:?}: expected true/false",
                    ENV_USE_MOCK_DATA,
                    raw
                ),
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 60 {
            result.add_warning(
                "weather.timeout_secs",
                "Timeout is unusually long (>60 seconds)",
            );
        }

        if self.weather.cache_hours > MAX_CACHE_HOURS {
            result.add_error(
                "weather.cache_hours",
                format!("Cache window must be at most {} hours", MAX_CACHE_HOURS),
            );
        } else if self.weather.cache_hours == 0 {
            result.add_warning(
                "weather.cache_hours",
                "Weather cache disabled (0 hours); every lookup hits the provider",
            );
        }

        if !self.weather.is_configured() {
            let message = if self.weather.mock_fallback_enabled {
                "Weather API key not configured - generated data will be shown"
            } else {
                "Weather API key not configured - weather will be unavailable"
            };
            result.add_warning("weather.access_key", message);
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to a file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("voyage");

        Ok(config_dir.join("config.toml"))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
