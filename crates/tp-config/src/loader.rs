//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "textpace.toml",
    "config.toml",
    "./config/textpace.toml",
    "/etc/textpace/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) but reads overrides through `lookup`
    /// instead of the process environment.
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file(&lookup) {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, &lookup)?;
        config.validate()?;

        Ok(config)
    }

    fn find_config_file<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file does not exist, searching default locations");
        }

        if let Some(path) = lookup("TEXTPACE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_overrides<F>(config: &mut AppConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(val) = lookup("TEXTPACE_HTTP_HOST") {
        config.http.host = val;
    }
    let port = lookup("TEXTPACE_HTTP_PORT")
        .map(|val| ("TEXTPACE_HTTP_PORT", val))
        .or_else(|| lookup("PORT").map(|val| ("PORT", val)));
    if let Some((key, val)) = port {
        config.http.port = parse_number(key, &val)?;
    }

    // Auth
    if let Some(val) = lookup("API_KEY") {
        config.auth.api_key = val;
    }

    // Pacing
    if let Some(val) = lookup("TEXTPACE_PACING_MIN_DELAY_MS") {
        config.pacing.min_delay_ms = parse_number("TEXTPACE_PACING_MIN_DELAY_MS", &val)?;
    }
    if let Some(val) = lookup("TEXTPACE_PACING_MAX_DELAY_MS") {
        config.pacing.max_delay_ms = parse_number("TEXTPACE_PACING_MAX_DELAY_MS", &val)?;
    }

    // Dispatch
    if let Some(val) = lookup("TEXTPACE_MAX_CONCURRENT_JOBS") {
        config.dispatch.max_concurrent_jobs = if val.is_empty() {
            None
        } else {
            Some(parse_number("TEXTPACE_MAX_CONCURRENT_JOBS", &val)?)
        };
    }

    // Delivery
    if let Some(val) = lookup("TEXTPACE_DELIVERY_BACKEND") {
        config.delivery.backend = val.parse()?;
    }
    if let Some(val) = lookup("TEXTPACE_OSASCRIPT_PATH") {
        config.delivery.applescript.osascript_path = val;
    }
    if let Some(val) = lookup("TEXTPACE_DELIVERY_HTTP_URL") {
        config.delivery.http.url = val;
    }
    if let Some(val) = lookup("TEXTPACE_DELIVERY_HTTP_TOKEN") {
        config.delivery.http.auth_token = Some(val).filter(|t| !t.is_empty());
    }
    if let Some(val) = lookup("TEXTPACE_DELIVERY_HTTP_TIMEOUT_SECS") {
        config.delivery.http.timeout_secs = parse_number("TEXTPACE_DELIVERY_HTTP_TIMEOUT_SECS", &val)?;
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, ConfigError> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{} is not a valid number: {:?}", key, val)))
}
