use crate::client::interaction_url;
use crate::id::random_id;

/// **VALUE**: Verifies the bait URL shape `https://{correlation}{nonce}.{host}`.
///
/// **WHY THIS MATTERS**: The collaborator server routes callbacks by the leading
/// correlation ID. A reordered or separated label never reaches this session.
///
/// **BUG THIS CATCHES**: Would catch a dot or dash sneaking between ID and nonce,
/// or the scheme changing.
#[test]
fn given_parts_when_interaction_url_built_then_concatenates_label() {
    // GIVEN: Fixed parts
    let url = interaction_url("c0rrelation", "n0nce", "oast.site");

    // THEN: Single label under the host
    assert_eq!(url, "https://c0rrelationn0nce.oast.site");
}

/// **VALUE**: Verifies the URL length property for a spread of ID/nonce lengths.
///
/// **BUG THIS CATCHES**: Would catch the nonce length being ignored or truncated.
#[test]
fn given_various_lengths_when_interaction_url_built_then_length_matches() {
    let host = "oast.site";

    for (id_len, nonce_len) in [(1, 1), (20, 13), (10, 5), (30, 33)] {
        let correlation_id = random_id(id_len);
        let url = interaction_url(&correlation_id, &random_id(nonce_len), host);

        assert!(url.starts_with("https://"));
        assert!(url.contains(&correlation_id));
        assert_eq!(
            url.len(),
            "https://".len() + id_len + nonce_len + ".".len() + host.len()
        );
    }
}
