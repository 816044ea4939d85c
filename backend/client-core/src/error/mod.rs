pub mod client;
pub mod config;
pub mod crypto;

pub use client::OastClientError;
pub use config::ConfigError;
pub use crypto::CryptoError;
