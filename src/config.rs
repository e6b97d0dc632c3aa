//! Configuration for firecrawl-flow.
//!
//! Everything is resolved from environment variables (with `.env` support).
//! CLI flags override individual poll settings after resolution.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Default Firecrawl API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev/v2";

/// Smallest accepted `FIRECRAWL_MAX_WAIT_SECS`.
pub const MIN_MAX_WAIT_SECS: u64 = 2;

/// Largest accepted `FIRECRAWL_MAX_WAIT_SECS`.
pub const MAX_MAX_WAIT_SECS: u64 = 600;

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub firecrawl: FirecrawlConfig,
    pub poll: PollConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            firecrawl: FirecrawlConfig::from_env()?,
            poll: PollConfig::from_env()?,
        })
    }
}

/// Connection settings for the Firecrawl API.
#[derive(Debug, Clone)]
pub struct FirecrawlConfig {
    /// Bearer token. Optional so offline commands work without one.
    pub api_key: Option<SecretString>,
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl Default for FirecrawlConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl FirecrawlConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = optional_env("FIRECRAWL_API_KEY")?.map(SecretString::from);

        let base_url = match optional_env("FIRECRAWL_BASE_URL")? {
            Some(raw) => normalize_base_url(&raw)?,
            None => DEFAULT_BASE_URL.to_string(),
        };

        let timeout_secs = parse_optional_env("FIRECRAWL_REQUEST_TIMEOUT_SECS", 60u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FIRECRAWL_REQUEST_TIMEOUT_SECS".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            api_key,
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Get the API key (exposes the secret), or explain how to set one.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "FIRECRAWL_API_KEY".to_string(),
                hint: "Set FIRECRAWL_API_KEY in the environment or in a .env file".to_string(),
            })
    }
}

/// Validate a base URL and strip any trailing slash.
pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        key: "FIRECRAWL_BASE_URL".to_string(),
        message: format!("not a valid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: "FIRECRAWL_BASE_URL".to_string(),
            message: format!("scheme must be http or https, got '{}'", parsed.scheme()),
        });
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Settings for the job status poller.
///
/// Passed explicitly into [`StatusPoller`](crate::jobs::StatusPoller); there
/// are no module-level defaults beyond [`Default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Fixed delay between status polls.
    pub poll_interval: Duration,
    /// Deadline measured from submission.
    pub max_wait: Duration,
    /// Retries allowed per poll cycle after the first failed fetch.
    pub max_poll_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            max_wait: Duration::from_secs(300),
            max_poll_retries: 3,
        }
    }
}

impl PollConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let interval_ms = parse_optional_env("FIRECRAWL_POLL_INTERVAL_MS", 2000u64)?;
        if interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FIRECRAWL_POLL_INTERVAL_MS".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        let max_wait_secs = parse_optional_env("FIRECRAWL_MAX_WAIT_SECS", 300u64)?;
        let max_wait = max_wait_from_secs(max_wait_secs).map_err(|message| {
            ConfigError::InvalidValue {
                key: "FIRECRAWL_MAX_WAIT_SECS".to_string(),
                message,
            }
        })?;

        let max_poll_retries = parse_optional_env("FIRECRAWL_MAX_POLL_RETRIES", 3u32)?;

        Ok(Self {
            poll_interval: Duration::from_millis(interval_ms),
            max_wait,
            max_poll_retries,
        })
    }
}

/// Convert a user-facing max wait (seconds) into a deadline, enforcing the
/// 2-600 second range.
pub fn max_wait_from_secs(secs: u64) -> Result<Duration, String> {
    if !(MIN_MAX_WAIT_SECS..=MAX_MAX_WAIT_SECS).contains(&secs) {
        return Err(format!(
            "must be between {MIN_MAX_WAIT_SECS} and {MAX_MAX_WAIT_SECS} seconds, got {secs}"
        ));
    }
    Ok(Duration::from_secs(secs))
}

// Helper functions

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}
