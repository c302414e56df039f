//! Worker configuration
//!
//! Loaded from a TOML file or built from defaults, then overridden from the
//! environment. The result is an immutable value handed to the clients and
//! the worker at construction.

use crate::consignment::retry::{RetryPolicy, DEFAULT_RETRIES, RETRY_DELAY};
use crate::sanitize::strip_user_info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable overriding `engine.base_url`
pub const ENGINE_URL_ENV: &str = "CAMUNDA_ENGINE_REST_URL";
/// Environment variable overriding `provider.base_url`
pub const PROVIDER_URL_ENV: &str = "SPEDITION_BASE_URL";

/// Main worker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub worker: WorkerSection,
}

/// Workflow engine (task queue) connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    /// Engine REST base URL; may embed `user:password@`
    #[serde(default = "default_engine_url")]
    pub base_url: String,
    /// Environment variable containing the basic-auth username
    #[serde(default = "default_username_env")]
    pub username_env: Option<String>,
    /// Environment variable containing the basic-auth password
    #[serde(default = "default_password_env")]
    pub password_env: Option<String>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            base_url: default_engine_url(),
            username_env: default_username_env(),
            password_env: default_password_env(),
        }
    }
}

fn default_engine_url() -> String {
    "http://localhost:8080/engine-rest".to_string()
}

fn default_username_env() -> Option<String> {
    Some("CAMUNDA_USERNAME".to_string())
}

fn default_password_env() -> Option<String> {
    Some("CAMUNDA_PASSWORD".to_string())
}

/// Logistics provider API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSection {
    /// Provider base URL; `/consignment/request` is appended
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    /// Whole-request timeout in milliseconds (default: 10000)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Connect timeout in milliseconds (default: 5000)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl ProviderSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_provider_url() -> String {
    "http://localhost:8081/v1".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Subscription settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerSection {
    /// External task topic to subscribe to
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Worker id reported to the engine; generated when absent
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Lock duration per fetched task in milliseconds (default: 30000)
    #[serde(default = "default_lock_duration_ms")]
    pub lock_duration_ms: u64,
    /// Long-polling timeout for fetch-and-lock in milliseconds (default: 10000)
    #[serde(default = "default_async_response_timeout_ms")]
    pub async_response_timeout_ms: u64,
    /// Maximum tasks locked per poll (default: 10)
    #[serde(default = "default_max_tasks")]
    pub max_tasks: u32,
    /// Pause after a failed poll in milliseconds (default: 5000)
    #[serde(default = "default_fetch_backoff_ms")]
    pub fetch_backoff_ms: u64,
    /// Retry budget assumed when the engine sends none (default: 3)
    #[serde(default = "default_retries")]
    pub default_retries: u32,
    /// Delay before a failed task is re-delivered in milliseconds (default: 60000)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            worker_id: None,
            lock_duration_ms: default_lock_duration_ms(),
            async_response_timeout_ms: default_async_response_timeout_ms(),
            max_tasks: default_max_tasks(),
            fetch_backoff_ms: default_fetch_backoff_ms(),
            default_retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl WorkerSection {
    pub fn fetch_backoff(&self) -> Duration {
        Duration::from_millis(self.fetch_backoff_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            i32::try_from(self.default_retries).unwrap_or(i32::MAX),
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

fn default_topic() -> String {
    "group4_rest".to_string()
}

fn default_lock_duration_ms() -> u64 {
    30_000
}

fn default_async_response_timeout_ms() -> u64 {
    10_000
}

fn default_max_tasks() -> u32 {
    10
}

fn default_fetch_backoff_ms() -> u64 {
    5_000
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES as u32
}

fn default_retry_delay_ms() -> u64 {
    RETRY_DELAY.as_millis() as u64
}

/// Basic-auth credentials for the engine
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &crate::sanitize::mask_value(&self.username))
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkerConfig {
    /// Load configuration from a TOML file, apply environment overrides and validate
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: WorkerConfig = toml::from_str(&content)?;

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = WorkerConfig::default();

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Apply URL overrides from a variable lookup; blank values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = non_blank(ENGINE_URL_ENV) {
            self.engine.base_url = url;
        }
        if let Some(url) = non_blank(PROVIDER_URL_ENV) {
            self.provider.base_url = url;
        }
    }

    /// Check URLs, topic and numeric bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("engine.base_url", &self.engine.base_url)?;
        validate_http_url("provider.base_url", &self.provider.base_url)?;

        if self.worker.topic.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "worker.topic must not be empty".to_string(),
            ));
        }

        let positive = [
            ("provider.request_timeout_ms", self.provider.request_timeout_ms),
            ("provider.connect_timeout_ms", self.provider.connect_timeout_ms),
            ("worker.lock_duration_ms", self.worker.lock_duration_ms),
            (
                "worker.async_response_timeout_ms",
                self.worker.async_response_timeout_ms,
            ),
            ("worker.max_tasks", u64::from(self.worker.max_tasks)),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        Ok(())
    }

    /// Engine base URL with any embedded credentials removed
    pub fn engine_url_without_credentials(&self) -> String {
        strip_user_info(&self.engine.base_url)
    }

    /// Resolve engine credentials at runtime
    ///
    /// The named environment variables win; credentials embedded in the
    /// engine URL are the fallback.
    pub fn engine_credentials(&self) -> Option<Credentials> {
        self.engine_credentials_from(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::engine_credentials`] with an explicit variable lookup
    pub fn engine_credentials_from<F>(&self, lookup: F) -> Option<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |name: Option<&String>| {
            name.and_then(|n| lookup(n.as_str()))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let embedded = Url::parse(&self.engine.base_url).ok().and_then(|url| {
            if url.username().is_empty() {
                None
            } else {
                Some((
                    url.username().to_string(),
                    url.password().map(str::to_string),
                ))
            }
        });

        let username = from_env(self.engine.username_env.as_ref())
            .or_else(|| embedded.as_ref().map(|(user, _)| user.clone()))?;
        let password = from_env(self.engine.password_env.as_ref())
            .or_else(|| embedded.and_then(|(_, password)| password));

        Some(Credentials { username, password })
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidConfig(format!("{name} is not a valid URL: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidConfig(format!(
            "{name} must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(())
}
