use crate::error::config::ConfigError;
use crate::session::SessionInfo;
use crate::{
    DEFAULT_CORRELATION_ID_LENGTH, DEFAULT_CORRELATION_ID_NONCE_LENGTH,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_URL,
};

use common::ErrorLocation;

use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

/// Correlation ID and nonce together form one DNS label.
const MAX_DNS_LABEL_LENGTH: usize = 63;

// ============================================
// CONFIG STRUCT
// ============================================

/// Options recognized by [`OastClient::initialize`](crate::OastClient::initialize).
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Auth token. A fresh one is generated when absent.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub disable_http_fallback: bool,

    #[serde(default = "default_correlation_id_length")]
    pub correlation_id_length: usize,

    #[serde(default = "default_correlation_id_nonce_length")]
    pub correlation_id_nonce_length: usize,

    /// Previously saved session to resume. Overrides `server_url` and `token`.
    #[serde(default)]
    pub session_info: Option<SessionInfo>,

    /// When set, polling starts right after registration with this interval.
    #[serde(default)]
    pub keep_alive_interval_ms: Option<u64>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            token: None,
            disable_http_fallback: false,
            correlation_id_length: default_correlation_id_length(),
            correlation_id_nonce_length: default_correlation_id_nonce_length(),
            session_info: None,
            keep_alive_interval_ms: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// Token is redacted; session_info redacts its own secrets
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("disable_http_fallback", &self.disable_http_fallback)
            .field("correlation_id_length", &self.correlation_id_length)
            .field("correlation_id_nonce_length", &self.correlation_id_nonce_length)
            .field("session_info", &self.session_info)
            .field("keep_alive_interval_ms", &self.keep_alive_interval_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}
fn default_correlation_id_length() -> usize {
    DEFAULT_CORRELATION_ID_LENGTH
}
fn default_correlation_id_nonce_length() -> usize {
    DEFAULT_CORRELATION_ID_NONCE_LENGTH
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ClientConfig {
    /// Load config from a JSON file.
    ///
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read config file {}: {}", path.display(), e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        let config: ClientConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON {}: {}", path.display(), e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// The server URL that will actually be used: the resumed session's, if any.
    pub fn effective_server_url(&self) -> &str {
        self.session_info
            .as_ref()
            .map(|s| s.server_url.as_str())
            .unwrap_or(&self.server_url)
    }

    pub fn keep_alive_interval(&self) -> Option<Duration> {
        self.keep_alive_interval_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse and check the effective server URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] unless the URL is absolute
    /// http(s) with a host.
    pub fn parsed_server_url(&self) -> Result<Url, ConfigError> {
        let raw = self.effective_server_url();

        let url = Url::parse(raw).map_err(|e| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: format!("Invalid server URL '{raw}': {e}"),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Unsupported server URL scheme: {}", url.scheme()),
            });
        }

        if url.host_str().is_none() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Server URL has no host: {raw}"),
            });
        }

        Ok(url)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_server_url()?;

        if self.correlation_id_length == 0 || self.correlation_id_nonce_length == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Identifier lengths must be at least 1 (correlation: {}, nonce: {})",
                    self.correlation_id_length, self.correlation_id_nonce_length
                ),
            });
        }

        let label_length = self.correlation_id_length + self.correlation_id_nonce_length;
        if label_length > MAX_DNS_LABEL_LENGTH {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Correlation ID plus nonce is {label_length} characters (must be at most {MAX_DNS_LABEL_LENGTH})"
                ),
            });
        }

        if self.keep_alive_interval_ms == Some(0) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "keep_alive_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "request_timeout_secs must be greater than 0".to_string(),
            });
        }

        if let Some(ref info) = self.session_info {
            if info.correlation_id.is_empty() || info.secret_key.is_empty() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: "session_info must carry a correlation ID and secret key".to_string(),
                });
            }
        }

        Ok(())
    }
}
