use crate::helpers::{empty_poll_body, mount_deregister_ok, registered_client};

use oast_client_core::id::is_valid_id;
use oast_client_core::{ClientState, OastClientError};

use std::collections::HashSet;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LONG_INTERVAL: Duration = Duration::from_secs(3600);

async fn mount_empty_poll(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_poll_body()))
        .mount(server)
        .await;
}

// ============================================================================
// Lifecycle transitions
// ============================================================================

/// **VALUE**: Verifies a second start is rejected and the first loop keeps running.
///
/// **WHY THIS MATTERS**: Two loops would double every request and deliver each
/// interaction twice.
///
/// **BUG THIS CATCHES**: Would catch start_polling spawning a second task or resetting state.
#[tokio::test]
async fn given_polling_when_started_again_then_state_error() {
    // GIVEN: A polling client
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_empty_poll(&server).await;
    client
        .start_polling(LONG_INTERVAL, None)
        .expect("first start");

    // WHEN: Starting again
    let result = client.start_polling(LONG_INTERVAL, None);

    // THEN: Rejected, still polling
    match result {
        Err(OastClientError::State { state, .. }) => assert_eq!(state, ClientState::Polling),
        other => panic!("Expected State error, got {other:?}"),
    }
    assert_eq!(client.state(), ClientState::Polling);

    client.stop_polling().expect("stop");
}

#[tokio::test]
async fn given_idle_when_stop_polling_then_state_error() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;

    let result = client.stop_polling();

    assert!(result.is_err_and(|e| e.is_state()));
    assert_eq!(client.state(), ClientState::Idle);
}

#[tokio::test]
async fn given_zero_interval_when_start_polling_then_configuration_error() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;

    let result = client.start_polling(Duration::ZERO, None);

    assert!(matches!(result, Err(OastClientError::Configuration { .. })));
    assert_eq!(client.state(), ClientState::Idle);
}

#[tokio::test]
async fn given_stopped_client_when_started_again_then_polling() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_empty_poll(&server).await;

    client.start_polling(LONG_INTERVAL, None).expect("start");
    client.stop_polling().expect("stop");
    client.start_polling(LONG_INTERVAL, None).expect("restart");

    assert_eq!(client.state(), ClientState::Polling);
    client.stop_polling().expect("stop");
}

/// **VALUE**: Verifies close is refused while polling and the loop is untouched.
///
/// **WHY THIS MATTERS**: Deregistering under a live loop would turn every later
/// poll into an error against a deleted session.
///
/// **BUG THIS CATCHES**: Would catch close sending the deregister request before checking state.
#[tokio::test]
async fn given_polling_when_closed_then_state_error_without_request() {
    // GIVEN: A polling client
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_empty_poll(&server).await;
    mount_deregister_ok(&server).await;
    client.start_polling(LONG_INTERVAL, None).expect("start");

    // WHEN: Closing
    let result = client.close().await;

    // THEN: Refused, no deregistration sent
    match result {
        Err(OastClientError::State { message, state, .. }) => {
            assert_eq!(state, ClientState::Polling);
            assert!(message.contains("Must stop polling before closing"));
        }
        other => panic!("Expected State error, got {other:?}"),
    }
    assert_eq!(client.state(), ClientState::Polling);
    assert_eq!(crate::helpers::request_count(&server, "/deregister").await, 0);

    client.stop_polling().expect("stop");
}

#[tokio::test]
async fn given_closed_when_any_transition_then_state_error() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_deregister_ok(&server).await;
    client.close().await.expect("close");

    let again = client.close().await;
    let start = client.start_polling(LONG_INTERVAL, None);
    let stop = client.stop_polling();
    let poll = client.poll().await;

    match again {
        Err(OastClientError::State { message, .. }) => assert!(message.contains("Already closed")),
        other => panic!("Expected State error, got {other:?}"),
    }
    assert!(start.is_err_and(|e| e.is_state()));
    assert!(stop.is_err_and(|e| e.is_state()));
    assert!(poll.is_err_and(|e| e.is_state()));
    assert_eq!(client.state(), ClientState::Closed);
}

// ============================================================================
// Refresh interval
// ============================================================================

/// **VALUE**: Verifies the refresh bounds are inclusive at 5 and 3600 seconds.
///
/// **WHY THIS MATTERS**: Intervals below 5 s hammer the collaborator server; above an
/// hour the session can expire between polls.
///
/// **BUG THIS CATCHES**: Would catch off-by-one bounds or a rejected value still being stored.
#[tokio::test]
async fn given_refresh_values_when_set_then_bounds_enforced() {
    // GIVEN: A registered client
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    let before = client.polling_interval();

    // WHEN/THEN: Out of range values are rejected and leave the interval alone
    for seconds in [0, 4, 3601] {
        let result = client.set_refresh_time_second(seconds);
        assert!(
            matches!(result, Err(OastClientError::Configuration { .. })),
            "{seconds}s should be rejected"
        );
        assert_eq!(client.polling_interval(), before);
    }

    // WHEN/THEN: Bounds are accepted and converted to milliseconds
    client.set_refresh_time_second(5).expect("lower bound");
    assert_eq!(client.polling_interval().as_millis(), 5_000);

    client.set_refresh_time_second(3600).expect("upper bound");
    assert_eq!(client.polling_interval().as_millis(), 3_600_000);
}

#[tokio::test]
async fn given_new_client_when_not_configured_then_default_interval_is_five_seconds() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;

    assert_eq!(client.polling_interval(), Duration::from_secs(5));
}

// ============================================================================
// Bait URLs
// ============================================================================

/// **VALUE**: Verifies bait URL shape and per-call nonce freshness.
///
/// **WHY THIS MATTERS**: The collaborator server routes callbacks by the leading
/// correlation ID. A wrong prefix or length means callbacks are never attributed.
///
/// **BUG THIS CATCHES**: Would catch a reused nonce, a wrong nonce length, or the
/// server port leaking into the hostname.
#[tokio::test]
async fn given_registered_client_when_generating_urls_then_unique_and_well_formed() {
    // GIVEN: A registered client on 127.0.0.1
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    let prefix = format!("https://{}", client.correlation_id());
    let suffix = ".127.0.0.1";

    // WHEN: Generating many URLs
    let urls: Vec<String> = (0..50)
        .map(|_| client.generate_url().expect("url while idle"))
        .collect();

    // THEN: Each is https://{cid}{nonce}.{host}
    for url in &urls {
        assert!(url.starts_with(&prefix), "{url}");
        assert!(url.ends_with(suffix), "{url}");
        let nonce = &url[prefix.len()..url.len() - suffix.len()];
        assert_eq!(nonce.len(), 13);
        assert!(is_valid_id(nonce));
    }

    // THEN: All distinct
    let unique: HashSet<_> = urls.iter().collect();
    assert_eq!(unique.len(), urls.len());
}

#[tokio::test]
async fn given_closed_client_when_generating_url_then_none() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_deregister_ok(&server).await;

    client.close().await.expect("close");

    assert!(client.generate_url().is_none());
}
