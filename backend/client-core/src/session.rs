//! Session identity and its exportable form.

use crate::error::OastClientError;

use common::RedactedSecret;

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

const REDACTED: &str = "[REDACTED]";

/// Flat, serializable snapshot of a registered session.
///
/// Produced by [`OastClient::save_session`](crate::OastClient::save_session)
/// and consumed through [`ClientConfig::session_info`](crate::ClientConfig)
/// to resume the same identity. Private key material is never part of it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(rename = "serverURL")]
    pub server_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(rename = "correlationID")]
    pub correlation_id: String,
    #[serde(rename = "secretKey")]
    pub secret_key: String,
}

impl fmt::Debug for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionInfo")
            .field("server_url", &self.server_url)
            .field("token", &REDACTED)
            .field("correlation_id", &self.correlation_id)
            .field("secret_key", &REDACTED)
            .finish()
    }
}

/// Identity of one registered client.
///
/// Immutable once established; the client controller owns it and exposes
/// read-only accessors.
#[derive(Debug, Clone)]
pub struct Session {
    server_url: Url,
    token: Option<RedactedSecret>,
    correlation_id: String,
    secret_key: RedactedSecret,
    public_key: String,
}

impl Session {
    pub(crate) fn new(
        server_url: Url,
        token: Option<String>,
        correlation_id: String,
        secret_key: String,
        public_key: String,
    ) -> Self {
        Self {
            server_url,
            token: token.filter(|t| !t.is_empty()).map(RedactedSecret::new),
            correlation_id,
            secret_key: RedactedSecret::new(secret_key),
            public_key,
        }
    }

    /// Same identity, different base URL. Used when registration fell back to plain HTTP.
    pub(crate) fn with_server_url(self, server_url: Url) -> Self {
        Self { server_url, ..self }
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub fn token(&self) -> Option<&RedactedSecret> {
        self.token.as_ref()
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn secret_key(&self) -> &RedactedSecret {
        &self.secret_key
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Host part used for interaction subdomains.
    pub fn host(&self) -> Option<&str> {
        self.server_url.host_str()
    }

    /// Export the identity for later resumption.
    ///
    /// # Errors
    ///
    /// Returns [`OastClientError::Configuration`] if the server URL, correlation ID
    /// or secret key is empty.
    pub fn to_info(&self) -> Result<SessionInfo, OastClientError> {
        let server_url = self.server_url.as_str().trim_end_matches('/').to_string();

        if server_url.is_empty() || self.host().is_none() {
            return Err(OastClientError::configuration(
                "Cannot export session: server URL is missing",
            ));
        }
        if self.correlation_id.is_empty() {
            return Err(OastClientError::configuration(
                "Cannot export session: correlation ID is missing",
            ));
        }
        if self.secret_key.is_empty() {
            return Err(OastClientError::configuration(
                "Cannot export session: secret key is missing",
            ));
        }

        Ok(SessionInfo {
            server_url,
            token: self
                .token
                .as_ref()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            correlation_id: self.correlation_id.clone(),
            secret_key: self.secret_key.as_str().to_string(),
        })
    }
}
