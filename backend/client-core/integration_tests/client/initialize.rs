use crate::helpers::{
    FakeCrypto, TEST_PUBLIC_KEY, TEST_TOKEN, config_for, mount_register_ok, registered_client,
};

use oast_client_core::id::is_valid_id;
use oast_client_core::{ClientConfig, ClientState, OastClient, OastClientError, SessionInfo};

use std::sync::Arc;

use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Public API tests for session establishment
// ============================================================================

/// **VALUE**: Verifies registration sends the exact body keys and auth header.
///
/// **WHY THIS MATTERS**: The collaborator server only knows these hyphenated keys.
/// Anything else registers an empty identity and every later poll fails.
///
/// **BUG THIS CATCHES**: Would catch renamed JSON fields, a missing Authorization header,
/// or fresh IDs ignoring the configured lengths.
#[tokio::test]
async fn given_fresh_config_when_initialized_then_registers_identity_and_is_idle() {
    // GIVEN: A mock server accepting registration with our token
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .and(header("Authorization", TEST_TOKEN))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // WHEN: Initializing
    let client = OastClient::initialize(config_for(&server), FakeCrypto::shared(), None)
        .await
        .expect("registration should succeed");

    // THEN: Idle, identity generated with default lengths
    assert_eq!(client.state(), ClientState::Idle);
    assert_eq!(client.correlation_id().len(), 20);
    assert!(is_valid_id(client.correlation_id()));

    let info = client.save_session().expect("complete session");
    assert_eq!(info.secret_key.len(), 13);
    assert_eq!(info.token, TEST_TOKEN);

    // THEN: Body carries the three documented keys
    let requests = server.received_requests().await.expect("recording enabled");
    let body: Value = serde_json::from_slice(&requests[0].body).expect("json body");
    assert_eq!(body["public-key"], TEST_PUBLIC_KEY);
    assert_eq!(body["secret-key"], info.secret_key.as_str());
    assert_eq!(body["correlation-id"], client.correlation_id());
}

/// **VALUE**: Verifies a token is generated when the caller supplies none.
#[tokio::test]
async fn given_no_token_when_initialized_then_generated_token_sent() {
    let server = MockServer::start().await;
    mount_register_ok(&server).await;
    let config = ClientConfig {
        server_url: server.uri(),
        ..ClientConfig::default()
    };

    let client = OastClient::initialize(config, FakeCrypto::shared(), None)
        .await
        .expect("registration should succeed");

    let token = client.save_session().expect("complete session").token;
    assert_eq!(token.len(), 36, "UUID token expected");

    let requests = server.received_requests().await.expect("recording enabled");
    let sent = requests[0]
        .headers
        .get("authorization")
        .expect("auth header")
        .to_str()
        .expect("ascii header");
    assert_eq!(sent, token);
}

/// **VALUE**: Verifies a non-200 registration is surfaced as a Registration error.
///
/// **WHY THIS MATTERS**: A silently failed registration leaves a client that can never
/// receive interactions. Callers must see the failure.
///
/// **BUG THIS CATCHES**: Would catch initialize returning a client after a 500, or the
/// status code being lost.
#[tokio::test]
async fn given_server_rejects_registration_when_initialized_then_registration_error() {
    // GIVEN: Registration answers 500
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(ResponseTemplate::new(500).set_body_string("could not register"))
        .mount(&server)
        .await;

    // WHEN: Initializing
    let result = OastClient::initialize(config_for(&server), FakeCrypto::shared(), None).await;

    // THEN: Registration error with status and body
    match result {
        Err(OastClientError::Registration {
            status_code,
            message,
            ..
        }) => {
            assert_eq!(status_code.map(|s| s.0), Some(500));
            assert!(message.contains("could not register"));
        }
        Err(other) => panic!("Expected Registration error, got {other}"),
        Ok(_) => panic!("Expected Registration error, got a client"),
    }
}

/// **VALUE**: Verifies an exact 200 is required; other 2xx codes are failures.
#[tokio::test]
async fn given_registration_answers_201_when_initialized_then_registration_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let result = OastClient::initialize(config_for(&server), FakeCrypto::shared(), None).await;

    assert!(matches!(result, Err(OastClientError::Registration { .. })));
}

/// **VALUE**: Verifies a crypto provider failure aborts before any request.
#[tokio::test]
async fn given_key_encoding_fails_when_initialized_then_registration_error_without_request() {
    let server = MockServer::start().await;
    mount_register_ok(&server).await;
    let crypto = Arc::new(FakeCrypto {
        fail_key_encoding: true,
    });

    let result = OastClient::initialize(config_for(&server), crypto, None).await;

    assert!(matches!(result, Err(OastClientError::Registration { .. })));
    assert!(
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[tokio::test]
async fn given_invalid_config_when_initialized_then_configuration_error() {
    let config = ClientConfig {
        server_url: "not a url".to_string(),
        ..ClientConfig::default()
    };

    let result = OastClient::initialize(config, FakeCrypto::shared(), None).await;

    assert!(matches!(result, Err(OastClientError::Configuration { .. })));
}

/// **VALUE**: Verifies save → initialize(session_info) resumes the same identity.
///
/// **WHY THIS MATTERS**: Bait URLs handed out before a restart embed the old correlation ID.
/// Resumption must re-register exactly that identity or those callbacks are lost.
///
/// **BUG THIS CATCHES**: Would catch resumption generating fresh IDs, or the configured
/// server URL/token overriding the saved ones.
#[tokio::test]
async fn given_saved_session_when_reinitialized_then_same_identity_and_idle() {
    // GIVEN: A registered client and its exported session
    let server = MockServer::start().await;
    let original = registered_client(&server, None).await;
    let saved = original.save_session().expect("complete session");

    // WHEN: Resuming with conflicting server URL and token in the config
    let config = ClientConfig {
        server_url: "https://ignored.example".to_string(),
        token: Some("ignored-token".to_string()),
        session_info: Some(saved.clone()),
        ..ClientConfig::default()
    };
    let resumed = OastClient::initialize(config, FakeCrypto::shared(), None)
        .await
        .expect("re-registration should succeed");

    // THEN: Identity reproduced, state Idle
    let again = resumed.save_session().expect("complete session");
    assert_eq!(again, saved);
    assert_eq!(resumed.state(), ClientState::Idle);

    // THEN: Second registration carried the saved identity and token
    let requests = server.received_requests().await.expect("recording enabled");
    let registrations: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/register")
        .collect();
    assert_eq!(registrations.len(), 2);
    let body: Value = serde_json::from_slice(&registrations[1].body).expect("json body");
    assert_eq!(body["correlation-id"], saved.correlation_id.as_str());
    assert_eq!(body["secret-key"], saved.secret_key.as_str());
    assert_eq!(
        registrations[1]
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok()),
        Some(saved.token.as_str())
    );
}

/// **VALUE**: Verifies HTTPS transport failure falls back to plain HTTP once.
///
/// **WHY THIS MATTERS**: Self-hosted collaborator servers often run without TLS.
///
/// **BUG THIS CATCHES**: Would catch the fallback being skipped, or the session keeping
/// the unreachable https URL for polling.
#[tokio::test]
async fn given_https_unreachable_when_initialized_then_falls_back_to_http() {
    // GIVEN: A plain HTTP mock server addressed with https
    let server = MockServer::start().await;
    mount_register_ok(&server).await;
    let config = ClientConfig {
        server_url: server.uri().replacen("http://", "https://", 1),
        ..config_for(&server)
    };

    // WHEN: Initializing
    let client = OastClient::initialize(config, FakeCrypto::shared(), None)
        .await
        .expect("fallback registration should succeed");

    // THEN: Session uses http
    assert_eq!(client.server_url().scheme(), "http");
    assert_eq!(client.state(), ClientState::Idle);
}

#[tokio::test]
async fn given_fallback_disabled_when_https_unreachable_then_registration_error() {
    let server = MockServer::start().await;
    mount_register_ok(&server).await;
    let config = ClientConfig {
        server_url: server.uri().replacen("http://", "https://", 1),
        disable_http_fallback: true,
        ..config_for(&server)
    };

    let result = OastClient::initialize(config, FakeCrypto::shared(), None).await;

    match result {
        Err(e @ OastClientError::Registration { .. }) => {
            assert_eq!(e.status_code(), None, "Transport failure has no status");
        }
        Err(other) => panic!("Expected Registration error, got {other}"),
        Ok(_) => panic!("Expected Registration error, got a client"),
    }
}

/// **VALUE**: Verifies keep-alive starts polling right after registration.
#[tokio::test]
async fn given_keep_alive_when_initialized_then_polling() {
    let server = MockServer::start().await;
    mount_register_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(crate::helpers::empty_poll_body()))
        .mount(&server)
        .await;
    let config = ClientConfig {
        keep_alive_interval_ms: Some(30_000),
        ..config_for(&server)
    };

    let client = OastClient::initialize(config, FakeCrypto::shared(), None)
        .await
        .expect("registration should succeed");

    assert_eq!(client.state(), ClientState::Polling);
    assert_eq!(client.polling_interval().as_millis(), 30_000);
    client.stop_polling().expect("stop");
}

#[test]
fn given_session_info_json_when_parsed_then_usable_as_config() {
    let info: SessionInfo = serde_json::from_str(
        r#"{"serverURL":"https://oast.site","token":"t","correlationID":"abc","secretKey":"def"}"#,
    )
    .expect("parse");
    let config = ClientConfig {
        session_info: Some(info),
        ..ClientConfig::default()
    };

    assert!(config.validate().is_ok());
}
