use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RECENTS_CAPACITY: usize = 8;
const DEFAULT_USER_AGENT: &str = "Skycast/0.1.0";
const DATABASE_FILE: &str = "skycast.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The config cannot be used
    Error,
    /// Usable, but probably not what was meant
    Warning,
}

/// A single problem found by `Config::validate`
#[derive(Debug, Clone, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ConfigIssue {
    /// Dotted TOML path, e.g. `weather.forecast_url`
    pub field: &'static str,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    issues: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ConfigIssue> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ConfigIssue> {
        self.with_severity(Severity::Warning)
    }

    /// Warnings on success; every error folded into one message otherwise.
    pub fn into_result(self) -> Result<Vec<ConfigIssue>> {
        let (errors, warnings): (Vec<_>, Vec<_>) = self
            .issues
            .into_iter()
            .partition(|issue| issue.severity == Severity::Error);

        if !errors.is_empty() {
            let summary = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::bail!("Configuration validation failed: {}", summary);
        }
        Ok(warnings)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &ConfigIssue> {
        self.issues.iter().filter(move |issue| issue.severity == severity)
    }

    fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.push(field, message.into(), Severity::Error);
    }

    fn warn(&mut self, field: &'static str, message: impl Into<String>) {
        self.push(field, message.into(), Severity::Warning);
    }

    fn push(&mut self, field: &'static str, message: String, severity: Severity) {
        self.issues.push(ConfigIssue {
            field,
            message,
            severity,
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the local database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Open-Meteo endpoints and request settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Recent searches list settings
    #[serde(default)]
    pub recents: RecentsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Geocoding search endpoint
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// Forecast endpoint
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Language for geocoded place names
    #[serde(default = "default_language")]
    pub language: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_geocoding_url() -> String {
    DEFAULT_GEOCODING_URL.to_string()
}

fn default_forecast_url() -> String {
    DEFAULT_FORECAST_URL.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            language: default_language(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentsConfig {
    /// Maximum number of cities kept in the list
    #[serde(default = "default_recents_capacity")]
    pub capacity: usize,

    /// Cities shown before anything has been searched
    #[serde(default)]
    pub seed: Vec<String>,
}

fn default_recents_capacity() -> usize {
    DEFAULT_RECENTS_CAPACITY
}

impl Default for RecentsConfig {
    fn default() -> Self {
        Self {
            capacity: default_recents_capacity(),
            seed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            weather: WeatherConfig::default(),
            recents: RecentsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default
    /// file if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating a default file if
    /// it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from the user config directory and validate it
    pub fn load_validated() -> Result<Self> {
        Self::load_validated_from(&Self::config_path()?)
    }

    /// Load and validate an explicit path
    ///
    /// Warnings are logged; any error fails the load.
    pub fn load_validated_from(path: &Path) -> Result<Self> {
        let config = Self::load_from(path)?;
        for warning in config.validate().into_result()? {
            tracing::warn!("Config warning: {}", warning);
        }
        Ok(config)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.weather.geocoding_url, "weather.geocoding_url", &mut result);
        validate_url(&self.weather.forecast_url, "weather.forecast_url", &mut result);

        if self.weather.request_timeout_secs == 0 {
            result.error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 60 {
            result.warn(
                "weather.request_timeout_secs",
                "Request timeout is longer than a minute",
            );
        }

        if self.weather.language.trim().is_empty() {
            result.warn("weather.language", "Language is empty, API default applies");
        }

        if self.recents.capacity == 0 {
            result.error("recents.capacity", "Capacity must be greater than 0");
        } else if self.recents.capacity > 50 {
            result.warn("recents.capacity", "Capacity is unusually large (>50)");
        }

        if self.recents.seed.iter().any(|city| city.trim().is_empty()) {
            result.warn("recents.seed", "Blank seed entries are ignored");
        }

        result
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the SQLite database backing the persisted stores
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

fn validate_url(url_str: &str, field_name: &'static str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.error(field_name, format!("Invalid URL: {}", e));
        }
    }
}
