// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn json_line_round_trip() {
    let record = Record::new(ops::SET, "color", "string", "teal");

    let line = record.to_line().unwrap();
    let parsed = Record::from_line(&line).unwrap();

    assert_eq!(parsed, record);
}

#[test]
fn json_field_names_match_wire_format() {
    let record = Record::new(ops::SADD, "tags", "set", "rust");
    let line = record.to_line().unwrap();

    assert_eq!(
        line,
        r#"{"op":"SADD","key":"tags","valueType":"set","value":"rust"}"#
    );
}

#[test]
fn delete_record_carries_empty_tag_and_value() {
    let record = Record::new(ops::DELETE, "gone", "", "");
    let line = record.to_line().unwrap();
    let parsed = Record::from_line(&line).unwrap();

    assert_eq!(parsed.op, "DELETE");
    assert_eq!(parsed.value_type, "");
    assert_eq!(parsed.value, "");
}

#[test]
fn json_record_without_payload_fields_decodes() {
    let parsed = Record::from_line(r#"{"op":"DELETE","key":"gone"}"#).unwrap();

    assert_eq!(parsed.op, "DELETE");
    assert_eq!(parsed.value_type, "");
    assert_eq!(parsed.value, "");
}

#[test]
fn json_record_missing_op_or_key_rejected() {
    let err = Record::from_line(r#"{"op":"","key":"k","valueType":"","value":""}"#);
    assert!(err.is_err());

    let err = Record::from_line(r#"{"op":"SET","key":"","valueType":"string","value":"v"}"#);
    assert!(err.is_err());
}

// Legacy whitespace encoding

#[test]
fn legacy_line_with_spaces_in_value() {
    let parsed = Record::from_line("SET greeting string hello there world").unwrap();

    assert_eq!(parsed.op, "SET");
    assert_eq!(parsed.key, "greeting");
    assert_eq!(parsed.value_type, "string");
    assert_eq!(parsed.value, "hello there world");
}

#[test]
fn legacy_delete_without_payload() {
    let parsed = Record::from_line("DELETE stale").unwrap();

    assert_eq!(parsed.op, "DELETE");
    assert_eq!(parsed.key, "stale");
    assert_eq!(parsed.value_type, "");
    assert_eq!(parsed.value, "");
}

#[test]
fn legacy_single_token_rejected() {
    assert!(Record::from_line("SET").is_err());
}

#[test]
fn legacy_set_without_value_rejected() {
    assert!(Record::from_line("SET key string").is_err());
}

// Header

#[test]
fn header_detected_on_header_line() {
    let line = Header::new().to_line().unwrap();
    let header = Header::detect(&line).unwrap();

    assert_eq!(header.format, Header::FORMAT);
    assert_eq!(header.encoding, Header::ENCODING);
}

#[test]
fn header_not_detected_on_record_line() {
    let line = Record::new(ops::SET, "k", "string", "v").to_line().unwrap();
    assert!(Header::detect(&line).is_none());
}

#[test]
fn header_not_detected_on_legacy_line() {
    assert!(Header::detect("SET k string v").is_none());
}

// HSET payload

#[test]
fn hash_field_payload_round_trip() {
    let pair = HashField::new("name", "otter");
    let payload = pair.to_payload().unwrap();

    assert_eq!(payload, r#"{"f":"name","v":"otter"}"#);
    assert_eq!(HashField::from_payload(&payload).unwrap(), pair);
}

#[test]
fn hash_field_payload_survives_record_round_trip() {
    let payload = HashField::new("k ey", "va lue").to_payload().unwrap();
    let record = Record::new(ops::HSET, "h", "hashmap", &payload);

    let line = record.to_line().unwrap();
    let parsed = Record::from_line(&line).unwrap();
    let pair = HashField::from_payload(&parsed.value).unwrap();

    assert_eq!(pair.f, "k ey");
    assert_eq!(pair.v, "va lue");
}
