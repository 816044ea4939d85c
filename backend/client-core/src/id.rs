//! Random identifiers for correlation IDs, secret keys, and URL nonces.
//!
//! Identifiers end up as DNS labels, so the alphabet is restricted to
//! lowercase ASCII letters and digits.

use rand::Rng;
use rand::rngs::OsRng;
use uuid::Uuid;

pub const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random identifier of `length` characters from [`ID_ALPHABET`].
///
/// Draws from the operating system's random source.
pub fn random_id(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Generate a fresh auth token for a session that was not given one.
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

/// Returns true when every character of `id` is in [`ID_ALPHABET`].
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| ID_ALPHABET.contains(&b))
}
