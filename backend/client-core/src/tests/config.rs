use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::session::SessionInfo;
use crate::{DEFAULT_CORRELATION_ID_LENGTH, DEFAULT_CORRELATION_ID_NONCE_LENGTH, DEFAULT_SERVER_URL};

use std::io::Write;
use std::time::Duration;

/// **VALUE**: Verifies the documented defaults.
///
/// **BUG THIS CATCHES**: Would catch a default drifting (e.g. nonce length 20 instead of 13),
/// which silently changes bait URL shape for every caller.
#[test]
fn given_default_config_when_inspected_then_matches_protocol_defaults() {
    let config = ClientConfig::default();

    assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    assert_eq!(config.server_url, "https://oast.site");
    assert_eq!(config.correlation_id_length, DEFAULT_CORRELATION_ID_LENGTH);
    assert_eq!(config.correlation_id_nonce_length, DEFAULT_CORRELATION_ID_NONCE_LENGTH);
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert!(config.token.is_none());
    assert!(config.keep_alive_interval().is_none());
    assert!(!config.disable_http_fallback);
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies non-URLs and non-HTTP schemes are rejected before any request.
///
/// **BUG THIS CATCHES**: Would catch registration being attempted against garbage,
/// producing confusing transport errors instead of a config error.
#[test]
fn given_bad_server_urls_when_validated_then_validation_error() {
    for bad in ["not a url", "ftp://oast.site", "oast.site", "unix:/tmp/socket"] {
        let config = ClientConfig {
            server_url: bad.to_string(),
            ..ClientConfig::default()
        };

        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "Should reject {bad}"
        );
    }
}

/// **VALUE**: Verifies the ID plus nonce label fits in one DNS label.
#[test]
fn given_label_longer_than_63_when_validated_then_validation_error() {
    let config = ClientConfig {
        correlation_id_length: 40,
        correlation_id_nonce_length: 24,
        ..ClientConfig::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn given_zero_lengths_or_intervals_when_validated_then_validation_error() {
    let zero_nonce = ClientConfig {
        correlation_id_nonce_length: 0,
        ..ClientConfig::default()
    };
    let zero_keep_alive = ClientConfig {
        keep_alive_interval_ms: Some(0),
        ..ClientConfig::default()
    };
    let zero_timeout = ClientConfig {
        request_timeout_secs: 0,
        ..ClientConfig::default()
    };

    assert!(zero_nonce.validate().is_err());
    assert!(zero_keep_alive.validate().is_err());
    assert!(zero_timeout.validate().is_err());
}

/// **VALUE**: Verifies a resumed session's server URL wins over the configured one.
///
/// **BUG THIS CATCHES**: Would catch resumption re-registering against the default server,
/// where the saved correlation ID means nothing.
#[test]
fn given_session_info_when_effective_url_requested_then_session_url_wins() {
    let config = ClientConfig {
        server_url: "https://other.example".to_string(),
        session_info: Some(SessionInfo {
            server_url: "https://saved.example".to_string(),
            token: "t".to_string(),
            correlation_id: "cid".to_string(),
            secret_key: "secret".to_string(),
        }),
        ..ClientConfig::default()
    };

    assert_eq!(config.effective_server_url(), "https://saved.example");
    assert_eq!(
        config.parsed_server_url().expect("valid").host_str(),
        Some("saved.example")
    );
}

#[test]
fn given_session_info_without_secret_when_validated_then_validation_error() {
    let config = ClientConfig {
        session_info: Some(SessionInfo {
            server_url: "https://saved.example".to_string(),
            token: String::new(),
            correlation_id: "cid".to_string(),
            secret_key: String::new(),
        }),
        ..ClientConfig::default()
    };

    assert!(config.validate().is_err());
}

/// **VALUE**: Verifies loading from disk applies serde defaults for omitted fields.
#[test]
fn given_partial_json_file_when_loaded_then_defaults_fill_gaps() {
    // GIVEN: A config file with only some fields
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{"server_url":"https://collab.internal","keep_alive_interval_ms":30000}}"#
    )
    .expect("write config");

    // WHEN: Loading
    let config = ClientConfig::load(file.path()).expect("load config");

    // THEN: Given fields used, others defaulted
    assert_eq!(config.server_url, "https://collab.internal");
    assert_eq!(config.keep_alive_interval(), Some(Duration::from_millis(30000)));
    assert_eq!(config.correlation_id_length, DEFAULT_CORRELATION_ID_LENGTH);
}

#[test]
fn given_missing_file_when_loaded_then_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");

    let config = ClientConfig::load(&dir.path().join("absent.json")).expect("defaults");

    assert_eq!(config.server_url, DEFAULT_SERVER_URL);
}

#[test]
fn given_corrupt_file_when_loaded_then_parse_error() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "{{ not json").expect("write config");

    let result = ClientConfig::load(file.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn given_config_with_secrets_when_debug_formatted_then_redacted() {
    let config = ClientConfig {
        token: Some("config-t0ken".to_string()),
        session_info: Some(SessionInfo {
            server_url: "https://saved.example".to_string(),
            token: "saved-t0ken".to_string(),
            correlation_id: "cid".to_string(),
            secret_key: "saved-s3cret".to_string(),
        }),
        ..ClientConfig::default()
    };

    let debug = format!("{config:?}");

    assert!(debug.contains("saved.example"));
    assert!(!debug.contains("config-t0ken"));
    assert!(!debug.contains("saved-t0ken"));
    assert!(!debug.contains("saved-s3cret"));
}
