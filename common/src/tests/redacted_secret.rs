use crate::RedactedSecret;

/// **VALUE**: Verifies the secret never shows up in Debug or Display output.
///
/// **WHY THIS MATTERS**: Sessions and errors get logged. A leaked secret key lets
/// anyone read this client's interactions.
///
/// **BUG THIS CATCHES**: Would catch a derived Debug sneaking back in.
#[test]
fn given_secret_when_formatted_then_value_is_hidden() {
    // GIVEN: A secret
    let secret = RedactedSecret::new("supersecretvalue");

    // WHEN: Formatting
    let debug = format!("{secret:?}");
    let display = format!("{secret}");

    // THEN: Value does not appear
    assert!(!debug.contains("supersecretvalue"));
    assert!(!display.contains("supersecretvalue"));
    assert_eq!(secret.as_str(), "supersecretvalue");
    assert!(!secret.is_empty());
}

/// **VALUE**: Verifies accidental serde serialization fails instead of writing the value.
///
/// **BUG THIS CATCHES**: Would catch a struct holding a secret being dumped to JSON
/// without going through an explicit export.
#[test]
fn given_secret_when_serialized_then_returns_error() {
    let secret = RedactedSecret::new("token");

    let result = serde_json::to_string(&secret);

    assert!(result.is_err(), "Serialization must be refused");
}
