//! textpace Configuration
//!
//! TOML-based configuration with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Shared secret used when `API_KEY` is not configured.
pub const DEFAULT_API_KEY: &str = "your_secret_key_here";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub pacing: PacingConfig,
    pub dispatch: DispatchConfig,
    pub delivery: DeliveryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

impl HttpConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// API authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value the `X-API-Key` header must carry
    pub api_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
        }
    }
}

impl AuthConfig {
    pub fn uses_default_key(&self) -> bool {
        self.api_key == DEFAULT_API_KEY
    }
}

/// Randomized delay between consecutive sends, in milliseconds (inclusive)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 10_000,
            max_delay_ms: 15_000,
        }
    }
}

/// Background dispatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum number of dispatch loops delivering at once.
    /// `None` lets every accepted request run immediately.
    pub max_concurrent_jobs: Option<usize>,
}

/// Which delivery client sends the messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryBackend {
    /// macOS Messages via osascript
    #[default]
    AppleScript,
    /// JSON POST to an SMS/iMessage gateway
    Http,
    /// Log only, nothing is sent
    Log,
}

impl std::str::FromStr for DeliveryBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "applescript" | "osascript" | "imessage" => Ok(DeliveryBackend::AppleScript),
            "http" => Ok(DeliveryBackend::Http),
            "log" | "dry-run" => Ok(DeliveryBackend::Log),
            other => Err(ConfigError::ValidationError(format!(
                "unknown delivery backend: {}",
                other
            ))),
        }
    }
}

/// Delivery client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub backend: DeliveryBackend,
    pub applescript: AppleScriptConfig,
    pub http: HttpDeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppleScriptConfig {
    pub osascript_path: String,
}

impl Default for AppleScriptConfig {
    fn default() -> Self {
        Self {
            osascript_path: "osascript".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpDeliveryConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HttpDeliveryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

impl HttpDeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.api_key.is_empty() {
            return Err(ConfigError::ValidationError("auth.api_key must not be empty".to_string()));
        }
        if self.pacing.min_delay_ms > self.pacing.max_delay_ms {
            return Err(ConfigError::ValidationError(format!(
                "pacing.min_delay_ms ({}) is greater than pacing.max_delay_ms ({})",
                self.pacing.min_delay_ms, self.pacing.max_delay_ms
            )));
        }
        if self.dispatch.max_concurrent_jobs == Some(0) {
            return Err(ConfigError::ValidationError(
                "dispatch.max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        if self.delivery.backend == DeliveryBackend::Http && self.delivery.http.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "delivery.http.url is required for the http backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# textpace configuration
# Environment variables override these settings

[http]
host = "0.0.0.0"
port = 5001

[auth]
api_key = "your_secret_key_here"

[pacing]
min_delay_ms = 10000
max_delay_ms = 15000

[dispatch]
# max_concurrent_jobs = 4

[delivery]
backend = "applescript"  # applescript, http, or log

[delivery.applescript]
osascript_path = "osascript"

[delivery.http]
url = ""
timeout_secs = 30
"#
        .to_string()
    }
}
