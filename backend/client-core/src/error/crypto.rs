use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Errors raised by a [`CryptoProvider`](crate::crypto::CryptoProvider).
#[derive(Debug, ThisError)]
pub enum CryptoError {
    #[error("Key Encoding Error: {message} {location}")]
    KeyEncoding {
        message: String,
        location: ErrorLocation,
    },

    #[error("Decryption Error: {message} {location}")]
    Decryption {
        message: String,
        location: ErrorLocation,
    },
}

impl CryptoError {
    #[track_caller]
    pub fn key_encoding(message: impl Into<String>) -> Self {
        CryptoError::KeyEncoding {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn decryption(message: impl Into<String>) -> Self {
        CryptoError::Decryption {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
