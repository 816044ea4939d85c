use crate::error::OastClientError;
use crate::session::{Session, SessionInfo};

use url::Url;

fn session(server_url: &str, token: Option<&str>, correlation_id: &str, secret: &str) -> Session {
    Session::new(
        Url::parse(server_url).expect("valid url"),
        token.map(str::to_string),
        correlation_id.to_string(),
        secret.to_string(),
        "pk".to_string(),
    )
}

/// **VALUE**: Verifies the exported JSON uses the exact flat key names.
///
/// **WHY THIS MATTERS**: Saved sessions are persisted by other tools and read back later.
/// Renamed keys would make every stored session unreadable.
///
/// **BUG THIS CATCHES**: Would catch serde renames being dropped or changed.
#[test]
fn given_session_when_exported_then_json_uses_flat_keys() {
    // GIVEN: A complete session
    let info = session("https://oast.site", Some("tok"), "cid", "sec")
        .to_info()
        .expect("complete session");

    // WHEN: Serializing
    let json = serde_json::to_value(&info).expect("serialize");

    // THEN: Exactly the four documented keys, URL without trailing slash
    assert_eq!(
        json,
        serde_json::json!({
            "serverURL": "https://oast.site",
            "token": "tok",
            "correlationID": "cid",
            "secretKey": "sec",
        })
    );
}

#[test]
fn given_session_without_token_when_exported_then_token_is_empty_string() {
    let info = session("https://oast.site", None, "cid", "sec")
        .to_info()
        .expect("complete session");

    assert_eq!(info.token, "");
}

#[test]
fn given_empty_token_when_session_built_then_token_absent() {
    let session = session("https://oast.site", Some(""), "cid", "sec");

    assert!(session.token().is_none());
}

/// **VALUE**: Verifies incomplete sessions cannot be exported.
///
/// **BUG THIS CATCHES**: Would catch an export that can never be resumed being handed out.
#[test]
fn given_missing_identity_when_exported_then_configuration_error() {
    let no_correlation = session("https://oast.site", None, "", "sec").to_info();
    let no_secret = session("https://oast.site", None, "cid", "").to_info();

    assert!(matches!(no_correlation, Err(OastClientError::Configuration { .. })));
    assert!(matches!(no_secret, Err(OastClientError::Configuration { .. })));
}

#[test]
fn given_exported_json_when_parsed_then_round_trips() {
    let json = r#"{"serverURL":"https://oast.site","token":"t","correlationID":"c","secretKey":"s"}"#;

    let info: SessionInfo = serde_json::from_str(json).expect("parse");

    assert_eq!(info.server_url, "https://oast.site");
    assert_eq!(info.correlation_id, "c");
    assert_eq!(info.secret_key, "s");
}

/// **VALUE**: Verifies the secret key never appears in Debug output of a session.
#[test]
fn given_session_when_debug_formatted_then_secrets_redacted() {
    let session = session("https://oast.site", Some("tok3n-value"), "cid", "s3cret-value");

    let debug = format!("{session:?}");

    assert!(!debug.contains("s3cret-value"));
    assert!(!debug.contains("tok3n-value"));
}

/// **VALUE**: Verifies an exported session can be debug-logged without leaking credentials.
///
/// **BUG THIS CATCHES**: Would catch a derived Debug on the export type printing the
/// token and secret key in clear text.
#[test]
fn given_session_info_when_debug_formatted_then_credentials_redacted() {
    // GIVEN: An exported session
    let info = session("https://oast.site", Some("tok3n-value"), "cid", "s3cret-value")
        .to_info()
        .expect("complete session");

    // WHEN: Formatting
    let debug = format!("{info:?}");

    // THEN: Identity visible, credentials hidden
    assert!(debug.contains("cid"));
    assert!(debug.contains("https://oast.site"));
    assert!(!debug.contains("tok3n-value"));
    assert!(!debug.contains("s3cret-value"));
}
