use parlor_db::{DatabaseItem, Document};
use pretty_assertions::assert_eq;
use uuid::Uuid;

// ── Document ──────────────────────────────────────────────────────

#[test]
fn empty_document() {
    let doc = Document::new();
    assert!(doc.is_empty());
    assert_eq!(doc.len(), 0);
    assert_eq!(doc.get("missing"), None);
}

#[test]
fn typed_field_access() {
    let mut doc = Document::new();
    doc.set("content_raw", "hello world");
    doc.set("type", 0x56f8_fa98u32);
    doc.set("pinned", true);
    doc.set("score", -3i64);

    assert_eq!(doc.get_str("content_raw"), Some("hello world"));
    assert_eq!(doc.get_u32("type"), Some(0x56f8_fa98));
    assert_eq!(doc.get_i64("score"), Some(-3));
    assert!(doc.contains("pinned"));
}

#[test]
fn set_replaces_previous_value() {
    let mut doc = Document::new();
    doc.set("content_raw", "first");
    doc.set("content_raw", "second");
    assert_eq!(doc.get_str("content_raw"), Some("second"));
    assert_eq!(doc.len(), 1);
}

#[test]
fn uuid_fields_round_trip_as_strings() {
    let uuid = Uuid::now_v7();
    let mut doc = Document::new();
    doc.set("uuid", uuid.to_string());
    assert_eq!(doc.get_uuid("uuid"), Some(uuid));
}

#[test]
fn get_uuid_rejects_garbage() {
    let mut doc = Document::new();
    doc.set("uuid", "not-a-uuid");
    assert_eq!(doc.get_uuid("uuid"), None);
}

#[test]
fn wrong_typed_access_is_none_not_panic() {
    let mut doc = Document::new();
    doc.set("n", 42i64);
    assert_eq!(doc.get_str("n"), None);
    assert_eq!(doc.get_uuid("n"), None);
}

#[test]
fn matches_is_subset_equality() {
    let mut row = Document::new();
    row.set("uuid", "a");
    row.set("type", 7i64);
    row.set("content_raw", "hi");

    let mut filter = Document::new();
    filter.set("uuid", "a");
    filter.set("type", 7i64);
    assert!(row.matches(&filter));

    filter.set("type", 8i64);
    assert!(!row.matches(&filter));

    let empty = Document::new();
    assert!(row.matches(&empty));
}

#[test]
fn json_round_trip() {
    let mut doc = Document::new();
    doc.set("uuid", "11111111-1111-1111-1111-111111111111");
    doc.set("type", 99i64);
    let json = doc.to_json().unwrap();
    let parsed = Document::from_json(&json).unwrap();
    assert_eq!(doc, parsed);
}

// ── DatabaseItem ──────────────────────────────────────────────────

#[test]
fn item_delegates_to_document() {
    let mut doc = Document::new();
    doc.set("uuid", "22222222-2222-2222-2222-222222222222");
    let mut item = DatabaseItem::new("parlor_resources", "uuid", doc);

    assert_eq!(item.collection(), "parlor_resources");
    assert_eq!(item.key_field(), "uuid");
    assert_eq!(
        item.get_uuid("uuid"),
        Some("22222222-2222-2222-2222-222222222222".parse().unwrap())
    );

    item.set("content_raw", "hi");
    assert_eq!(item.get_str("content_raw"), Some("hi"));
    assert_eq!(item.doc().get_str("content_raw"), Some("hi"));
}
