use crate::id::{ID_ALPHABET, generate_token, is_valid_id, random_id};

use std::collections::HashSet;

/// **VALUE**: Verifies generated IDs have the requested length and only DNS-safe characters.
///
/// **WHY THIS MATTERS**: Correlation IDs and nonces are concatenated into a subdomain label.
/// Uppercase or punctuation would break routing on the collaborator's DNS server.
///
/// **BUG THIS CATCHES**: Would catch an alphabet change or an off-by-one in the length.
#[test]
fn given_lengths_when_random_id_generated_then_length_and_alphabet_match() {
    for length in [1, 13, 20, 50] {
        // WHEN: Generating an ID
        let id = random_id(length);

        // THEN: Exact length, alphabet only
        assert_eq!(id.len(), length);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)), "Bad char in {id}");
    }
}

/// **VALUE**: Verifies successive IDs differ.
///
/// **BUG THIS CATCHES**: Would catch a seeded or cached generator that makes every bait URL identical.
#[test]
fn given_many_calls_when_random_id_generated_then_values_are_distinct() {
    let ids: HashSet<String> = (0..100).map(|_| random_id(13)).collect();

    assert_eq!(ids.len(), 100, "Collisions indicate a broken random source");
}

#[test]
fn given_zero_length_when_random_id_generated_then_empty() {
    assert!(random_id(0).is_empty());
}

#[test]
fn given_ids_when_validated_then_rejects_foreign_characters() {
    assert!(is_valid_id("abc123"));
    assert!(!is_valid_id(""));
    assert!(!is_valid_id("ABC"));
    assert!(!is_valid_id("a-b"));
}

/// **VALUE**: Verifies default tokens are fresh UUIDs.
///
/// **BUG THIS CATCHES**: Would catch two sessions sharing one auth token.
#[test]
fn given_two_calls_when_token_generated_then_distinct_uuids() {
    let first = generate_token();
    let second = generate_token();

    assert_ne!(first, second);
    assert_eq!(first.len(), 36, "Hyphenated UUID expected");
}
