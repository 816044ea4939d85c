use crate::helpers::{TEST_TOKEN, registered_client, request_count};

use oast_client_core::{ClientState, OastClientError};

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// **VALUE**: Verifies deregistration sends the session identity and closes the client.
///
/// **WHY THIS MATTERS**: The server frees the correlation ID only when it can match
/// both identifiers; otherwise stale sessions accumulate server-side.
///
/// **BUG THIS CATCHES**: Would catch renamed body keys, a missing token header, or
/// the client staying usable after close.
#[tokio::test]
async fn given_idle_client_when_closed_then_deregisters_and_is_closed() {
    // GIVEN: A registered client and a deregister mock matching its identity
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    let info = client.save_session().expect("complete session");
    Mock::given(method("POST"))
        .and(path("/deregister"))
        .and(header("Authorization", TEST_TOKEN))
        .and(body_json(json!({
            "correlationID": info.correlation_id,
            "secretKey": info.secret_key,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // WHEN: Closing
    client.close().await.expect("close should succeed");

    // THEN: Closed
    assert_eq!(client.state(), ClientState::Closed);
}

/// **VALUE**: Verifies a rejected deregistration leaves the client Idle and retryable.
///
/// **WHY THIS MATTERS**: Marking the client closed after a failed request would
/// leak the server-side session with no way to retry.
///
/// **BUG THIS CATCHES**: Would catch the state flipping to Closed before the response is checked.
#[tokio::test]
async fn given_deregister_fails_when_closed_then_idle_and_retry_succeeds() {
    // GIVEN: First deregistration answers 500, the next 200
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    Mock::given(method("POST"))
        .and(path("/deregister"))
        .respond_with(ResponseTemplate::new(500).set_body_string("busy"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/deregister"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(10)
        .mount(&server)
        .await;

    // WHEN: Closing the first time
    let first = client.close().await;

    // THEN: Deregistration error, still Idle
    match first {
        Err(OastClientError::Deregistration { status_code, .. }) => {
            assert_eq!(status_code.map(|s| s.0), Some(500));
        }
        other => panic!("Expected Deregistration error, got {other:?}"),
    }
    assert_eq!(client.state(), ClientState::Idle);
    assert!(client.generate_url().is_some());

    // WHEN: Retrying
    client.close().await.expect("retry should succeed");

    // THEN: Closed after two attempts
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(request_count(&server, "/deregister").await, 2);
}

#[tokio::test]
async fn given_closed_client_when_saving_session_then_identity_still_exported() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    crate::helpers::mount_deregister_ok(&server).await;
    let before = client.save_session().expect("complete session");

    client.close().await.expect("close");

    assert_eq!(client.save_session().expect("complete session"), before);
}

async fn mount_slow_deregister(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/deregister"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .mount(server)
        .await;
}

/// **VALUE**: Verifies only one of two overlapping closes deregisters.
///
/// **WHY THIS MATTERS**: Closing is a one-way transition. Two callers racing to shut
/// the client down must not both be told they closed it.
///
/// **BUG THIS CATCHES**: Would catch the Idle check being released before the
/// deregister request, letting both calls through.
#[tokio::test]
async fn given_close_in_flight_when_closed_again_then_state_error_and_single_request() {
    // GIVEN: A deregister endpoint that answers slowly
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_slow_deregister(&server).await;

    // WHEN: Two closes overlap
    let (first, second) = tokio::join!(client.close(), client.close());

    // THEN: First succeeds, second is rejected, one request sent
    assert!(first.is_ok(), "first close: {first:?}");
    match second {
        Err(OastClientError::State { message, state, .. }) => {
            assert_eq!(state, ClientState::Idle);
            assert!(message.contains("Close in progress"));
        }
        other => panic!("Expected State error, got {other:?}"),
    }
    assert_eq!(request_count(&server, "/deregister").await, 1);
    assert_eq!(client.state(), ClientState::Closed);
}

/// **VALUE**: Verifies polling cannot start while a close is waiting on the server.
///
/// **WHY THIS MATTERS**: Closed is only entered from Idle. A loop started mid-close
/// would either be killed silently or keep polling a deregistered session.
///
/// **BUG THIS CATCHES**: Would catch start_polling only looking at the Idle state.
#[tokio::test]
async fn given_close_in_flight_when_start_polling_then_state_error() {
    // GIVEN: A deregister endpoint that answers slowly
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_slow_deregister(&server).await;

    // WHEN: start_polling is issued partway through close
    let (closed, started) = tokio::join!(client.close(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.start_polling(Duration::from_millis(20), None)
    });

    // THEN: Close wins, polling never started
    assert!(closed.is_ok(), "close: {closed:?}");
    assert!(started.is_err_and(|e| e.is_state()));
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(request_count(&server, "/poll").await, 0);
}

#[tokio::test]
async fn given_failed_close_when_polling_started_then_allowed() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    Mock::given(method("POST"))
        .and(path("/deregister"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(crate::helpers::empty_poll_body()))
        .mount(&server)
        .await;

    let result = client.close().await;

    assert!(matches!(result, Err(OastClientError::Deregistration { .. })));
    client
        .start_polling(Duration::from_secs(3600), None)
        .expect("marker cleared after failed close");
    assert_eq!(client.state(), ClientState::Polling);
    client.stop_polling().expect("stop");
}
