//! Integration-level coverage of the response envelope contract from
//! spec.md §4.1/§8, beyond the inline unit tests in `src/envelope.rs`:
//! unicode escaping, nested structures, and the exact wire forms operators
//! and other components parse.

use eps_admission_core::ResponseEnvelope;
use serde_json::json;

#[test]
fn array_data_round_trips() {
    let env = ResponseEnvelope::new(json!([{"id": 1}, {"id": 2}]), 0, None);
    let encoded = env.to_string();
    let decoded: ResponseEnvelope = encoded.parse().unwrap();
    assert_eq!(decoded, env);
    assert!(decoded.is_valid());
}

#[test]
fn message_with_special_characters_is_escaped_and_recoverable() {
    let env = ResponseEnvelope::new(
        json!({}),
        0,
        Some("quote \" backslash \\ newline \n tab \t".to_string()),
    );
    let encoded = env.to_string();
    // The message is JSON-escaped as a standalone string value; control
    // characters must not appear literally in the document.
    assert!(!encoded.contains('\n'));
    assert!(!encoded.contains('\t'));
    let decoded: ResponseEnvelope = encoded.parse().unwrap();
    assert_eq!(decoded, env);
}

#[test]
fn nested_objects_are_preserved_exactly() {
    let payload = json!({
        "rule": {"id": 5501, "level": 3},
        "agent": {"id": "001", "name": "edge-01"},
    });
    let env = ResponseEnvelope::new(payload.clone(), 0, Some("match".to_string()));
    let decoded: ResponseEnvelope = env.to_string().parse().unwrap();
    assert_eq!(decoded.data(), &payload);
}

#[test]
fn opaque_nonzero_error_codes_pass_through() {
    // Error-code enumeration is a closed set of well-known codes, but
    // "additional codes may pass through opaquely" per spec.md §3.2.
    let env = ResponseEnvelope::new(json!({}), 9001, None);
    let decoded: ResponseEnvelope = env.to_string().parse().unwrap();
    assert_eq!(decoded.error(), 9001);
}

#[test]
fn predefined_constructors_produce_the_documented_wire_form() {
    assert_eq!(
        ResponseEnvelope::invalid_request().to_string(),
        r#"{"data":{},"error":2,"message":"Invalid request, malformed JSON"}"#
    );
    assert_eq!(
        ResponseEnvelope::invalid_size().to_string(),
        r#"{"data":{},"error":3,"message":"Invalid Size"}"#
    );
    assert_eq!(
        ResponseEnvelope::unknown_error().to_string(),
        r#"{"data":{},"error":1,"message":"Unknown error"}"#
    );
}

#[test]
fn whitespace_and_key_order_variations_still_decode() {
    // Decoding must not depend on the fixed key order the encoder happens
    // to emit: a conforming producer may order fields differently.
    let reordered = r#"{ "message": "hi", "error": 0, "data": {"a": 1} }"#;
    let decoded: ResponseEnvelope = reordered.parse().unwrap();
    assert_eq!(decoded.data(), &json!({"a": 1}));
    assert_eq!(decoded.error(), 0);
    assert_eq!(decoded.message(), Some("hi"));
}
