//! Configuration management for the Taiwan guide
//!
//! Handles loading configuration from a TOML file and environment variables,
//! and provides validation for all configuration settings. Every credential is
//! optional: a missing key only disables the feature that needs it.

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding an explicit config file path
pub const CONFIG_PATH_ENV: &str = "TAIWAN_GUIDE_CONFIG";

const ENV_PREFIX: &str = "TAIWAN_GUIDE";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub completion: CompletionConfig,
    pub search: SearchConfig,
    pub weather: WeatherConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
    pub telemetry: TelemetryConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for stylesheets and images
    pub static_dir: String,
    /// Whole-request timeout in seconds; must exceed the slowest client timeout
    pub request_timeout_seconds: u32,
    pub max_body_bytes: usize,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

/// Generative AI backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Model suggested to the user when `model` is rejected
    pub fallback_model: String,
    /// Language the guide answers in
    pub answer_language: String,
    pub timeout_seconds: u32,
}

/// Blog search backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: String,
    /// Prepended to every query to scope it to the destination
    pub query_prefix: String,
    pub default_limit: u32,
    pub timeout_seconds: u32,
}

/// Weather backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub language: String,
    pub timeout_seconds: u32,
}

/// Per-tab session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped
    pub idle_minutes: u32,
    /// Live sessions kept at once; the least recently used goes first
    pub max_sessions: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// OTLP/HTTP endpoint; export is disabled when unset
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

// Default value functions
fn default_completion_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_fallback_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_search_base_url() -> String {
    "https://openapi.naver.com".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_client_timeout() -> u32 {
    10
}

fn default_weather_timeout() -> u32 {
    5
}

fn default_search_limit() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: "static".to_string(),
            request_timeout_seconds: 30,
            max_body_bytes: 16 * 1024,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_completion_base_url(),
            model: default_model(),
            fallback_model: default_fallback_model(),
            answer_language: "Korean".to_string(),
            timeout_seconds: default_client_timeout(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: default_search_base_url(),
            query_prefix: "대만".to_string(),
            default_limit: default_search_limit(),
            timeout_seconds: default_client_timeout(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            language: "en".to_string(),
            timeout_seconds: default_weather_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_minutes: 120,
            max_sessions: 10_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: "taiwan-guide".to_string(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.into())
    }
}

impl CompletionConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl SearchConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl WeatherConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl SessionConfig {
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.idle_minutes) * 60)
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from_path(path)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            tracing::debug!("Reading configuration from {}", config_file.display());
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TAIWAN_GUIDE_WEATHER__API_KEY -> weather.api_key
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_env_fallbacks(|name| env::var(name).ok());
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("taiwan-guide").join("config.toml"))
    }

    /// Fill credentials that are still unset from the conventional variables
    /// of each provider (`GOOGLE_API_KEY`, `NAVER_CLIENT_ID`, ...).
    pub fn apply_env_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fill_from(&mut self.completion.api_key, &lookup, "GOOGLE_API_KEY");
        fill_from(&mut self.search.client_id, &lookup, "NAVER_CLIENT_ID");
        fill_from(&mut self.search.client_secret, &lookup, "NAVER_CLIENT_SECRET");
        fill_from(&mut self.weather.api_key, &lookup, "OPENWEATHER_API_KEY");
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        for key in [
            &mut self.completion.api_key,
            &mut self.search.client_id,
            &mut self.search.client_secret,
            &mut self.weather.api_key,
        ] {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                *key = None;
            }
        }

        if self.completion.base_url.is_empty() {
            self.completion.base_url = default_completion_base_url();
        }
        if self.completion.model.is_empty() {
            self.completion.model = default_model();
        }
        if self.completion.fallback_model.is_empty() {
            self.completion.fallback_model = default_fallback_model();
        }
        if self.completion.timeout_seconds == 0 {
            self.completion.timeout_seconds = default_client_timeout();
        }
        if self.search.base_url.is_empty() {
            self.search.base_url = default_search_base_url();
        }
        if self.search.default_limit == 0 {
            self.search.default_limit = default_search_limit();
        }
        if self.search.timeout_seconds == 0 {
            self.search.timeout_seconds = default_client_timeout();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        for (name, seconds) in [
            ("completion", self.completion.timeout_seconds),
            ("search", self.search.timeout_seconds),
            ("weather", self.weather.timeout_seconds),
        ] {
            if seconds > 300 {
                bail!("{name} timeout cannot exceed 300 seconds");
            }
        }

        if !(1..=100).contains(&self.search.default_limit) {
            bail!("Search limit must be between 1 and 100");
        }

        if self.session.idle_minutes == 0 {
            bail!("Session idle timeout must be at least one minute");
        }

        if self.session.max_sessions == 0 {
            bail!("Session capacity must be at least one");
        }

        let slowest_client = self
            .completion
            .timeout_seconds
            .max(self.search.timeout_seconds)
            .max(self.weather.timeout_seconds);
        if self.server.request_timeout_seconds <= slowest_client {
            bail!(
                "server.request_timeout_seconds ({}) must exceed the slowest client timeout ({slowest_client})",
                self.server.request_timeout_seconds
            );
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            );
        }

        for (name, url) in [
            ("completion", &self.completion.base_url),
            ("search", &self.search.base_url),
            ("weather", &self.weather.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("{name} base URL must be a valid HTTP or HTTPS URL");
            }
        }

        if self.server.tls_cert_path.is_some() != self.server.tls_key_path.is_some() {
            bail!("TLS needs both server.tls_cert_path and server.tls_key_path");
        }

        Ok(())
    }
}

fn fill_from<F>(slot: &mut Option<String>, lookup: &F, name: &str)
where
    F: Fn(&str) -> Option<String>,
{
    if slot.is_none() {
        *slot = lookup(name).filter(|value| !value.trim().is_empty());
    }
}
