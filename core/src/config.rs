//! Client configuration loaded from JSON.
//!
//! ```json
//! {
//!   "base_url": "https://btcpay.example.com",
//!   "api_key": "c0ffee",
//!   "read_timeout_secs": 20,
//!   "verify_tls": true
//! }
//! ```
//!
//! Only `base_url` is required. The core never reads environment variables;
//! where the JSON comes from is up to the caller.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// `0` leaves the connect attempt to the OS timeout.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// `0` disables the read timeout.
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

fn default_verify_tls() -> bool {
    true
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: None,
            user_agent: None,
            connect_timeout_secs: None,
            read_timeout_secs: None,
            verify_tls: true,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ApiError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ApiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// `base_url` must be an absolute http(s) URL with a host.
    pub fn validate(&self) -> Result<(), ApiError> {
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("base_url {:?}: {e}", self.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ApiError::Config(format!(
                "base_url {:?} must be an http(s) URL",
                self.base_url
            )));
        }
        if self.api_key.as_deref().is_some_and(str::is_empty) {
            return Err(ApiError::Config("api_key must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
