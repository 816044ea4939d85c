//! Test helpers for client integration tests.
//!
//! This module provides:
//! - A pass-through crypto provider (ciphertext items are plaintext JSON)
//! - Mock collaborator endpoints
//! - Recording handlers and polling waits

use oast_client_core::error::CryptoError;
use oast_client_core::{ClientConfig, CryptoProvider, Interaction, InteractionHandler, OastClient};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-token-12345";
pub const TEST_PUBLIC_KEY: &str = "dGVzdC1wdWJsaWMta2V5";
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const WAIT_STEP: Duration = Duration::from_millis(10);

/// Crypto provider whose "decryption" returns the item unchanged.
pub struct FakeCrypto {
    pub fail_key_encoding: bool,
}

impl FakeCrypto {
    pub fn shared() -> Arc<dyn CryptoProvider> {
        Arc::new(FakeCrypto {
            fail_key_encoding: false,
        })
    }
}

impl CryptoProvider for FakeCrypto {
    fn encode_public_key(&self) -> Result<String, CryptoError> {
        if self.fail_key_encoding {
            return Err(CryptoError::key_encoding("no key pair"));
        }
        Ok(TEST_PUBLIC_KEY.to_string())
    }

    fn decrypt_message(&self, _shared_key: &str, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        Ok(ciphertext.as_bytes().to_vec())
    }

    fn has_private_key(&self) -> bool {
        true
    }
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        server_url: server.uri(),
        token: Some(TEST_TOKEN.to_string()),
        ..ClientConfig::default()
    }
}

pub async fn mount_register_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "registration successful"})),
        )
        .mount(server)
        .await;
}

pub async fn mount_deregister_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/deregister"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Registered client in `Idle` state against `server`.
pub async fn registered_client(
    server: &MockServer,
    handler: Option<InteractionHandler>,
) -> OastClient {
    mount_register_ok(server).await;
    OastClient::initialize(config_for(server), FakeCrypto::shared(), handler)
        .await
        .expect("registration against mock server")
}

pub fn interaction_json(unique_id: &str) -> String {
    json!({
        "protocol": "dns",
        "unique-id": unique_id,
        "full-id": unique_id,
        "q-type": "A",
        "raw-request": "request",
        "raw-response": "response",
        "remote-address": "192.0.2.1",
        "timestamp": "2024-05-01T12:00:00Z",
    })
    .to_string()
}

pub fn poll_body(items: &[String]) -> serde_json::Value {
    json!({ "data": items, "aes_key": "wrapped-shared-key" })
}

pub fn empty_poll_body() -> serde_json::Value {
    json!({ "data": null, "aes_key": "" })
}

pub fn recording_handler() -> (InteractionHandler, Arc<Mutex<Vec<Interaction>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: InteractionHandler = Arc::new(move |interaction| {
        sink.lock().expect("lock").push(interaction);
    });
    (handler, seen)
}

pub fn seen_ids(seen: &Arc<Mutex<Vec<Interaction>>>) -> Vec<String> {
    seen.lock()
        .expect("lock")
        .iter()
        .map(|i| i.unique_id.clone())
        .collect()
}

/// Wait until `condition` holds or the timeout elapses. Returns the final outcome.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(WAIT_STEP).await;
    }
    condition()
}

/// Number of requests the mock server received on `endpoint`.
pub async fn request_count(server: &MockServer, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == endpoint)
        .count()
}

/// Wait until at least `count` requests hit `endpoint`.
pub async fn wait_for_requests(server: &MockServer, endpoint: &str, count: usize) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if request_count(server, endpoint).await >= count {
            return true;
        }
        tokio::time::sleep(WAIT_STEP).await;
    }
    false
}
