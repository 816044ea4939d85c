use crate::helpers::{
    TEST_TOKEN, config_for, empty_poll_body, interaction_json, mount_register_ok, poll_body,
    recording_handler, registered_client, request_count, seen_ids, wait_for_requests, wait_until,
};

use oast_client_core::{
    ClientConfig, ClientState, InteractionProtocol, OastClient, OastClientError, channel_handler,
};

use std::time::Duration;

use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LONG_INTERVAL: Duration = Duration::from_secs(3600);

/// Poll responses served once each, in mount order, then empty batches.
async fn mount_poll_sequence(server: &MockServer, batches: Vec<serde_json::Value>) {
    for batch in batches {
        Mock::given(method("GET"))
            .and(path("/poll"))
            .respond_with(ResponseTemplate::new(200).set_body_json(batch))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_poll_body()))
        .with_priority(10)
        .mount(server)
        .await;
}

// ============================================================================
// Delivery
// ============================================================================

/// **VALUE**: Verifies the keep-alive loop delivers interactions across cycles in order.
///
/// **WHY THIS MATTERS**: This is the end-to-end path a scanner relies on: register,
/// poll on a timer, hand over every callback exactly once.
///
/// **BUG THIS CATCHES**: Would catch reordering within a batch, dropped batches,
/// or the same batch being delivered twice.
#[tokio::test]
async fn given_keep_alive_when_server_returns_batches_then_all_delivered_in_order() {
    // GIVEN: Two batches with three interactions overall
    let server = MockServer::start().await;
    mount_register_ok(&server).await;
    mount_poll_sequence(
        &server,
        vec![
            poll_body(&[interaction_json("first"), interaction_json("second")]),
            poll_body(&[interaction_json("third")]),
        ],
    )
    .await;

    let (handler, seen) = recording_handler();
    let config = ClientConfig {
        keep_alive_interval_ms: Some(50),
        ..config_for(&server)
    };

    // WHEN: Initializing with keep-alive
    let client = OastClient::initialize(config, crate::helpers::FakeCrypto::shared(), Some(handler))
        .await
        .expect("registration should succeed");
    assert_eq!(client.state(), ClientState::Polling);

    // THEN: All three arrive in server order
    assert!(wait_until(|| seen_ids(&seen).len() >= 3).await);
    assert!(wait_for_requests(&server, "/poll", 4).await);
    assert_eq!(seen_ids(&seen), vec!["first", "second", "third"]);

    let first = seen.lock().expect("lock")[0].clone();
    assert_eq!(first.protocol_kind(), InteractionProtocol::Dns);
    assert_eq!(first.q_type.as_deref(), Some("A"));

    client.stop_polling().expect("stop");
}

/// **VALUE**: Verifies poll requests carry id, secret and the token header.
#[tokio::test]
async fn given_polling_when_cycle_runs_then_query_and_auth_sent() {
    // GIVEN: A poll mock that only matches the full request
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    let info = client.save_session().expect("complete session");
    Mock::given(method("GET"))
        .and(path("/poll"))
        .and(query_param("id", info.correlation_id.as_str()))
        .and(query_param("secret", info.secret_key.as_str()))
        .and(header("Authorization", TEST_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_poll_body()))
        .mount(&server)
        .await;

    // WHEN: Polling and running a manual cycle
    client.start_polling(LONG_INTERVAL, None).expect("start");
    assert!(wait_for_requests(&server, "/poll", 1).await);
    let delivered = client.poll().await;

    // THEN: The mock matched, so the request was well formed
    assert_eq!(delivered.expect("poll should succeed"), 0);

    client.stop_polling().expect("stop");
}

#[tokio::test]
async fn given_channel_handler_when_interaction_arrives_then_received_on_channel() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_poll_sequence(&server, vec![poll_body(&[interaction_json("via-channel")])]).await;
    let (sender, mut receiver) = mpsc::channel(8);

    client
        .start_polling(LONG_INTERVAL, Some(channel_handler(sender)))
        .expect("start");

    let received = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("interaction within timeout")
        .expect("channel open");
    assert_eq!(received.unique_id, "via-channel");

    client.stop_polling().expect("stop");
}

/// **VALUE**: Verifies plaintext extras are delivered after the encrypted items.
#[tokio::test]
async fn given_extra_items_when_polled_then_delivered_after_data() {
    let server = MockServer::start().await;
    let (handler, seen) = recording_handler();
    let client = registered_client(&server, Some(handler)).await;
    mount_poll_sequence(
        &server,
        vec![serde_json::json!({
            "data": [interaction_json("encrypted")],
            "aes_key": "k",
            "extra": [interaction_json("extra")],
            "tld_data": [interaction_json("tld")],
        })],
    )
    .await;

    client.start_polling(LONG_INTERVAL, None).expect("start");

    assert!(wait_until(|| seen_ids(&seen).len() >= 3).await);
    assert_eq!(seen_ids(&seen), vec!["encrypted", "extra", "tld"]);

    client.stop_polling().expect("stop");
}

// ============================================================================
// Failure handling
// ============================================================================

/// **VALUE**: Verifies a bad item aborts the rest of its batch and the schedule carries on.
///
/// **WHY THIS MATTERS**: Callers need to know which item failed; silently skipping
/// it would hide a key mismatch. One bad batch must not end polling for good.
///
/// **BUG THIS CATCHES**: Would catch items after the bad one being delivered, items
/// before it being lost, or the polling task dying on the first decode error.
#[tokio::test]
async fn given_batch_with_invalid_item_when_scheduled_then_later_cycles_still_run() {
    // GIVEN: Every poll returns [valid, invalid, valid]
    let server = MockServer::start().await;
    let (handler, seen) = recording_handler();
    let client = registered_client(&server, Some(handler)).await;
    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(poll_body(&[
            interaction_json("good"),
            "{not json".to_string(),
            interaction_json("never"),
        ])))
        .mount(&server)
        .await;

    // WHEN: The scheduler runs on a short interval
    client
        .start_polling(Duration::from_millis(50), None)
        .expect("start");

    // THEN: Scheduled cycles keep coming after the first decode failure
    assert!(wait_for_requests(&server, "/poll", 3).await);
    assert!(wait_until(|| seen_ids(&seen).len() >= 3).await);
    client.stop_polling().expect("stop");

    // THEN: Each cycle delivered the first item only
    let ids = seen_ids(&seen);
    assert!(ids.iter().all(|id| id == "good"), "got {ids:?}");
    assert!(!ids.iter().any(|id| id == "never"));
}

#[tokio::test]
async fn given_batch_with_invalid_item_when_polled_manually_then_decode_error_with_index() {
    let server = MockServer::start().await;
    let (handler, seen) = recording_handler();
    let client = registered_client(&server, Some(handler)).await;
    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(poll_body(&[
            interaction_json("good"),
            "{not json".to_string(),
            interaction_json("never"),
        ])))
        .mount(&server)
        .await;

    client.start_polling(LONG_INTERVAL, None).expect("start");
    assert!(wait_until(|| seen_ids(&seen).len() >= 1).await);
    let result = client.poll().await;

    match result {
        Err(OastClientError::Decode { index, .. }) => assert_eq!(index, 1),
        other => panic!("Expected Decode error, got {other:?}"),
    }
    assert_eq!(seen_ids(&seen), vec!["good", "good"]);

    client.stop_polling().expect("stop");
}

/// **VALUE**: Verifies 401 is reported as Authentication and nothing is delivered.
///
/// **WHY THIS MATTERS**: An expired or evicted session needs re-registration,
/// which is a different recovery than retrying a flaky server.
///
/// **BUG THIS CATCHES**: Would catch 401 being folded into the generic polling error.
#[tokio::test]
async fn given_server_returns_401_when_polled_then_authentication_error() {
    // GIVEN: Poll answers 401
    let server = MockServer::start().await;
    let (handler, seen) = recording_handler();
    let client = registered_client(&server, Some(handler)).await;
    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    // WHEN: Running a manual cycle
    client.start_polling(LONG_INTERVAL, None).expect("start");
    let result = client.poll().await;

    // THEN: Authentication error, no delivery, still polling
    let error = result.expect_err("401 should fail");
    assert!(error.is_authentication(), "got {error}");
    assert_eq!(error.status_code(), Some(401));
    assert!(seen_ids(&seen).is_empty());
    assert_eq!(client.state(), ClientState::Polling);

    client.stop_polling().expect("stop");
}

#[tokio::test]
async fn given_server_returns_500_when_polled_then_polling_error_with_status() {
    let server = MockServer::start().await;
    let (handler, seen) = recording_handler();
    let client = registered_client(&server, Some(handler)).await;
    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    client.start_polling(LONG_INTERVAL, None).expect("start");
    let result = client.poll().await;

    match result {
        Err(OastClientError::Polling { status_code, .. }) => {
            assert_eq!(status_code.map(|s| s.0), Some(500));
        }
        other => panic!("Expected Polling error, got {other:?}"),
    }
    assert!(seen_ids(&seen).is_empty());

    client.stop_polling().expect("stop");
}

#[tokio::test]
async fn given_malformed_envelope_when_polled_then_polling_error() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    client.start_polling(LONG_INTERVAL, None).expect("start");
    let result = client.poll().await;

    assert!(matches!(result, Err(OastClientError::Polling { .. })));

    client.stop_polling().expect("stop");
}

// ============================================================================
// Scheduling
// ============================================================================

#[tokio::test]
async fn given_idle_client_when_manual_poll_then_state_error_without_request() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;

    let result = client.poll().await;

    assert!(result.is_err_and(|e| e.is_state()));
    assert_eq!(request_count(&server, "/poll").await, 0);
}

/// **VALUE**: Verifies stop_polling halts further requests.
///
/// **WHY THIS MATTERS**: A loop that outlives stop keeps hitting the server and
/// keeps calling a handler the caller believes is detached.
///
/// **BUG THIS CATCHES**: Would catch the cancellation token not reaching the sleeping loop.
#[tokio::test]
async fn given_fast_polling_when_stopped_then_no_further_requests() {
    // GIVEN: A client polling every 20ms
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_poll_sequence(&server, Vec::new()).await;
    client
        .start_polling(Duration::from_millis(20), None)
        .expect("start");
    assert!(wait_for_requests(&server, "/poll", 3).await);

    // WHEN: Stopping and letting an in-flight request settle
    client.stop_polling().expect("stop");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_stop = request_count(&server, "/poll").await;

    // THEN: No new requests
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(request_count(&server, "/poll").await, after_stop);
    assert_eq!(client.state(), ClientState::Idle);
}

#[tokio::test]
async fn given_polling_client_when_dropped_then_loop_stops() {
    let server = MockServer::start().await;
    let client = registered_client(&server, None).await;
    mount_poll_sequence(&server, Vec::new()).await;
    client
        .start_polling(Duration::from_millis(20), None)
        .expect("start");
    assert!(wait_for_requests(&server, "/poll", 2).await);

    drop(client);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_drop = request_count(&server, "/poll").await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(request_count(&server, "/poll").await, after_drop);
}
