pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod id;
pub mod interaction;
pub mod protocol;
pub mod session;

mod http;
#[cfg(test)]
mod tests;

pub use client::{ClientState, InteractionHandler, OastClient, channel_handler};
pub use config::ClientConfig;
pub use crypto::CryptoProvider;
pub use error::{ConfigError, CryptoError, OastClientError};
pub use interaction::{Interaction, InteractionProtocol};
pub use session::SessionInfo;

pub const DEFAULT_SERVER_HOST: &str = "oast.site";
pub const DEFAULT_SERVER_URL: &str = const_format::concatcp!("https://", DEFAULT_SERVER_HOST);
pub const DEFAULT_CORRELATION_ID_LENGTH: usize = 20;
pub const DEFAULT_CORRELATION_ID_NONCE_LENGTH: usize = 13;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const MIN_REFRESH_SECONDS: u64 = 5;
pub const MAX_REFRESH_SECONDS: u64 = 3600;
