//! Shared building blocks for the OAST client workspace.
//!
//! This crate holds the small pieces every other crate leans on: error
//! location capture, HTTP status classification, and secret wrappers that
//! keep credentials out of logs.
//!
//! ## Architecture
//!
//! - **common** (this crate): Error plumbing and secret handling
//! - **oast-client-core**: Protocol client operating on these types

pub mod error;
pub mod http_status;
pub mod redacted_secret;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use http_status::HttpStatusCode;
pub use redacted_secret::RedactedSecret;
