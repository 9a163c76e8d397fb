use super::*;
use serde_json::json;

#[test]
fn outbound_stamps_rfc3339_timestamp() {
    let env = Envelope::outbound("cart:update", json!({"items": 2})).expect("outbound envelope");
    assert_eq!(env.kind.as_deref(), Some("cart:update"));
    assert_eq!(env.data, json!({"items": 2}));

    let stamp = env.timestamp.as_ref().and_then(Value::as_str).expect("timestamp string");
    assert!(OffsetDateTime::parse(stamp, &Rfc3339).is_ok(), "not RFC 3339: {stamp}");
}

#[test]
fn outbound_json_carries_type_data_and_timestamp() {
    let env = Envelope::outbound("ping", json!(null)).expect("outbound envelope");
    let value: Value = serde_json::from_str(&env.to_json().expect("json")).expect("valid json");
    assert_eq!(value["type"], "ping");
    assert!(value.get("data").is_some());
    assert!(value["timestamp"].is_string());
}

#[test]
fn parse_reads_type_tag() {
    let env = Envelope::parse(r#"{"type":"purchase:completed","data":{"order":"o-1"}}"#).expect("parse");
    assert_eq!(env.event_name(), "purchase:completed");
    assert_eq!(env.data["order"], "o-1");
    assert!(env.timestamp.is_none());
}

#[test]
fn parse_without_type_falls_back_to_generic_event() {
    let env = Envelope::parse(r#"{"data":[1,2,3]}"#).expect("parse");
    assert_eq!(env.kind, None);
    assert_eq!(env.event_name(), GENERIC_EVENT);
}

#[test]
fn empty_type_tag_falls_back_to_generic_event() {
    let env = Envelope::parse(r#"{"type":"","data":1}"#).expect("parse");
    assert_eq!(env.kind.as_deref(), Some(""));
    assert_eq!(env.event_name(), GENERIC_EVENT);
}

#[test]
fn parse_missing_data_is_null() {
    let env = Envelope::parse(r#"{"type":"refresh"}"#).expect("parse");
    assert_eq!(env.data, Value::Null);
}

#[test]
fn parse_accepts_any_timestamp_value() {
    let env = Envelope::parse(r#"{"type":"t","data":1,"timestamp":1700000000}"#).expect("parse");
    assert_eq!(env.timestamp, Some(json!(1_700_000_000)));
}

#[test]
fn parse_rejects_non_json() {
    let err = Envelope::parse("definitely not json").unwrap_err();
    assert!(matches!(err, EnvelopeError::Json(_)));
}

#[test]
fn parse_rejects_non_object_json() {
    for text in ["42", r#""hello""#, r#"["a", null]"#, "null"] {
        assert!(matches!(Envelope::parse(text), Err(EnvelopeError::NotAnObject)), "{text} should be rejected");
    }
}

#[test]
fn parse_rejects_non_string_type_tag() {
    assert!(matches!(Envelope::parse(r#"{"type":7,"data":{}}"#), Err(EnvelopeError::Json(_))));
}
