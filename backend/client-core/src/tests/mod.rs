// Unit tests for crate-private items
// Integration tests for the public client API are in integration_tests/

mod config;
mod cycle;
mod id;
mod session;
mod bait_url;

use crate::crypto::CryptoProvider;
use crate::error::CryptoError;

/// Returns ciphertext bytes unchanged; fails for items starting with `undecryptable`.
pub(crate) struct PassthroughCrypto;

impl CryptoProvider for PassthroughCrypto {
    fn encode_public_key(&self) -> Result<String, CryptoError> {
        Ok(String::from("dGVzdC1wdWJsaWMta2V5"))
    }

    fn decrypt_message(&self, _shared_key: &str, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.starts_with("undecryptable") {
            return Err(CryptoError::decryption("bad padding"));
        }
        Ok(ciphertext.as_bytes().to_vec())
    }

    fn has_private_key(&self) -> bool {
        true
    }
}

pub(crate) fn interaction_json(unique_id: &str) -> String {
    format!(
        r#"{{"protocol":"dns","unique-id":"{unique_id}","full-id":"{unique_id}","q-type":"A","raw-request":"req","raw-response":"resp","remote-address":"10.0.0.1","timestamp":"2024-05-01T12:00:00.123456789Z"}}"#
    )
}
