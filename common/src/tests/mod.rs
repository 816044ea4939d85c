mod error_location;
mod redacted_secret;
