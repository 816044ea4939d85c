//! Injected cryptographic capability.
//!
//! The client never generates keys or decrypts payloads itself. It asks a
//! [`CryptoProvider`] for the encoded public key at registration and hands
//! each polled ciphertext item, together with the envelope's wrapped
//! shared key, back to the provider for decryption.

use crate::error::CryptoError;

/// Key-pair owner used by the client for registration and decryption.
///
/// Implementations must be usable from the background polling task, hence
/// `Send + Sync`. Calls are synchronous; providers doing heavy work should
/// keep it bounded since the poll cycle runs them inline.
pub trait CryptoProvider: Send + Sync {
    /// Encoded public key sent in the registration body.
    fn encode_public_key(&self) -> Result<String, CryptoError>;

    /// Decrypt one poll item using the envelope's wrapped shared key.
    fn decrypt_message(&self, shared_key: &str, ciphertext: &str) -> Result<Vec<u8>, CryptoError>;

    /// Whether private key material is held. Never exported.
    fn has_private_key(&self) -> bool;
}
