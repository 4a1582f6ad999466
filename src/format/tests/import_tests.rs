//! Tests for import parsing.

use crate::format::{FormatError, parse_import};

#[test]
fn test_import_keeps_only_custom_kinds() {
    let records = parse_import(
        r##"[
            {"id": "b", "type": "bench", "lat": 0, "lng": 0},
            {"id": "c", "type": "circle", "color": "#00f", "lat": 1, "lng": 1},
            {"id": "s", "type": "sprite", "sprite": "dog.png", "lat": 2, "lng": 2},
            {"id": "e", "type": "elevator", "lat": 3, "lng": 3}
        ]"##,
    )
    .unwrap();
    let ids: Vec<String> = records.markers.iter().filter_map(|m| m.id_string()).collect();
    assert_eq!(ids, vec!["c", "s"]);
}

#[test]
fn test_import_untyped_records_are_benches_and_dropped() {
    let records = parse_import(r#"{"markers": [{"lat": 1, "lng": 2}]}"#).unwrap();
    assert!(records.markers.is_empty());
}

#[test]
fn test_import_wrong_markers_type_is_rejected() {
    let err = parse_import(r#"{"markers": "nope"}"#).unwrap_err();
    assert!(matches!(err, FormatError::InvalidStructure { .. }));
}

#[test]
fn test_import_malformed_json_is_rejected() {
    let err = parse_import("{\"markers\": [").unwrap_err();
    assert!(matches!(err, FormatError::Json(_)));
}

#[test]
fn test_import_string_document_is_rejected() {
    let err = parse_import("\"markers\"").unwrap_err();
    assert!(matches!(err, FormatError::InvalidStructure { .. }));
}
