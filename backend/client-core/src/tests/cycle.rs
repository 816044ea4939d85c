use super::{PassthroughCrypto, interaction_json};
use crate::client::InteractionHandler;
use crate::client::cycle::deliver_batch;
use crate::error::OastClientError;
use crate::interaction::Interaction;
use crate::protocol::PollResponse;

use std::sync::{Arc, Mutex};

fn recording_handler() -> (InteractionHandler, Arc<Mutex<Vec<Interaction>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: InteractionHandler = Arc::new(move |interaction| {
        sink.lock().expect("lock").push(interaction);
    });
    (handler, seen)
}

fn envelope(data: Vec<String>) -> PollResponse {
    PollResponse {
        data: Some(data),
        aes_key: "wrapped-key".to_string(),
        ..PollResponse::default()
    }
}

/// **VALUE**: Verifies interactions are delivered once each, in server order.
///
/// **BUG THIS CATCHES**: Would catch reordering or double delivery within a batch.
#[test]
fn given_batch_when_delivered_then_handler_sees_items_in_order() {
    // GIVEN: Three valid items
    let (handler, seen) = recording_handler();
    let response = envelope(vec![
        interaction_json("first"),
        interaction_json("second"),
        interaction_json("third"),
    ]);

    // WHEN: Delivering
    let delivered = deliver_batch(&PassthroughCrypto, &response, &handler).expect("valid batch");

    // THEN: Order preserved
    let ids: Vec<String> = seen.lock().expect("lock").iter().map(|i| i.unique_id.clone()).collect();
    assert_eq!(delivered, 3);
    assert_eq!(ids, vec!["first", "second", "third"]);
}

/// **VALUE**: Verifies the fail-fast policy: [A, B-bad, C] delivers only A.
///
/// **WHY THIS MATTERS**: Delivery within a batch stops at the first bad item and the
/// error says which one, so callers can reason about what they have seen.
///
/// **BUG THIS CATCHES**: Would catch C being delivered after B failed, or the error
/// losing the item index.
#[test]
fn given_undecodable_item_when_delivered_then_stops_and_reports_index() {
    // GIVEN: A valid item, an undecodable item, another valid item
    let (handler, seen) = recording_handler();
    let response = envelope(vec![
        interaction_json("a"),
        "{not json".to_string(),
        interaction_json("c"),
    ]);

    // WHEN: Delivering
    let result = deliver_batch(&PassthroughCrypto, &response, &handler);

    // THEN: Only A delivered, Decode error for index 1
    assert!(matches!(result, Err(OastClientError::Decode { index: 1, .. })));
    let seen = seen.lock().expect("lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].unique_id, "a");
}

#[test]
fn given_undecryptable_item_when_delivered_then_decode_error() {
    let (handler, seen) = recording_handler();
    let response = envelope(vec!["undecryptable-item".to_string()]);

    let result = deliver_batch(&PassthroughCrypto, &response, &handler);

    assert!(matches!(result, Err(OastClientError::Decode { index: 0, .. })));
    assert!(seen.lock().expect("lock").is_empty());
}

/// **VALUE**: Verifies an envelope with `data: null` is a quiet, successful cycle.
///
/// **BUG THIS CATCHES**: Would catch the common empty response being treated as an error.
#[test]
fn given_null_data_when_delivered_then_zero_and_ok() {
    let (handler, seen) = recording_handler();
    let response: PollResponse =
        serde_json::from_str(r#"{"data":null,"aes_key":""}"#).expect("parse envelope");

    let delivered = deliver_batch(&PassthroughCrypto, &response, &handler).expect("empty batch");

    assert_eq!(delivered, 0);
    assert!(response.is_empty());
    assert!(seen.lock().expect("lock").is_empty());
}

/// **VALUE**: Verifies plaintext `extra` and `tld_data` items follow the encrypted ones.
#[test]
fn given_plaintext_extras_when_delivered_then_after_encrypted_items() {
    let (handler, seen) = recording_handler();
    let response = PollResponse {
        data: Some(vec![interaction_json("enc")]),
        aes_key: "k".to_string(),
        extra: Some(vec![interaction_json("extra")]),
        tld_data: Some(vec![interaction_json("tld")]),
    };

    let delivered = deliver_batch(&PassthroughCrypto, &response, &handler).expect("valid batch");

    let ids: Vec<String> = seen.lock().expect("lock").iter().map(|i| i.unique_id.clone()).collect();
    assert_eq!(delivered, 3);
    assert_eq!(ids, vec!["enc", "extra", "tld"]);
}
