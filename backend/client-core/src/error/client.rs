//! Error types for client operations.
//!
//! Transport failures are folded into the variant of the operation that
//! issued the request, so callers can tell a failed registration from a
//! failed poll without inspecting messages. HTTP status codes are stored
//! directly when a response was received.

use crate::client::ClientState;
use crate::error::ConfigError;

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum OastClientError {
    #[error("Registration Error: {message} {location}")]
    Registration {
        message: String,
        status_code: Option<HttpStatusCode>,
        location: ErrorLocation,
    },

    #[error("Authentication Error: {message} {location}")]
    Authentication {
        message: String,
        location: ErrorLocation,
    },

    #[error("Polling Error: {message} {location}")]
    Polling {
        message: String,
        status_code: Option<HttpStatusCode>,
        location: ErrorLocation,
    },

    #[error("Decode Error: interaction #{index}: {message} {location}")]
    Decode {
        index: usize,
        message: String,
        location: ErrorLocation,
    },

    #[error("Deregistration Error: {message} {location}")]
    Deregistration {
        message: String,
        status_code: Option<HttpStatusCode>,
        location: ErrorLocation,
    },

    #[error("State Error: {message} (state: {state:?}) {location}")]
    State {
        message: String,
        state: ClientState,
        location: ErrorLocation,
    },

    #[error("Configuration Error: {message} {location}")]
    Configuration {
        message: String,
        location: ErrorLocation,
    },
}

impl OastClientError {
    #[track_caller]
    pub fn registration(status_code: Option<HttpStatusCode>, message: impl Into<String>) -> Self {
        OastClientError::Registration {
            message: message.into(),
            status_code,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn authentication(message: impl Into<String>) -> Self {
        OastClientError::Authentication {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn polling(status_code: Option<HttpStatusCode>, message: impl Into<String>) -> Self {
        OastClientError::Polling {
            message: message.into(),
            status_code,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn decode(index: usize, message: impl Into<String>) -> Self {
        OastClientError::Decode {
            index,
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn deregistration(status_code: Option<HttpStatusCode>, message: impl Into<String>) -> Self {
        OastClientError::Deregistration {
            message: message.into(),
            status_code,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn state(state: ClientState, message: impl Into<String>) -> Self {
        OastClientError::State {
            message: message.into(),
            state,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn configuration(message: impl Into<String>) -> Self {
        OastClientError::Configuration {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// True for a 401 on poll. Callers may use this to re-register.
    pub fn is_authentication(&self) -> bool {
        matches!(self, OastClientError::Authentication { .. })
    }

    /// True for invalid state-machine transitions.
    pub fn is_state(&self) -> bool {
        matches!(self, OastClientError::State { .. })
    }

    /// Get HTTP status code if a response was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            OastClientError::Registration { status_code, .. }
            | OastClientError::Polling { status_code, .. }
            | OastClientError::Deregistration { status_code, .. } => status_code.map(|s| s.0),
            OastClientError::Authentication { .. } => Some(HttpStatusCode::UNAUTHORIZED.0),
            _ => None,
        }
    }

    /// Get error category for logging.
    pub fn error_category(&self) -> &'static str {
        match self {
            OastClientError::Registration { .. } => "registration",
            OastClientError::Authentication { .. } => "authentication",
            OastClientError::Polling { status_code: None, .. } => "polling_transport",
            OastClientError::Polling { .. } => "polling",
            OastClientError::Decode { .. } => "decode",
            OastClientError::Deregistration { .. } => "deregistration",
            OastClientError::State { .. } => "state",
            OastClientError::Configuration { .. } => "configuration",
        }
    }
}

impl From<ConfigError> for OastClientError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        OastClientError::Configuration {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
