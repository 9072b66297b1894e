use super::*;
use proptest::prelude::*;

#[test]
fn test_encode_starts_with_marker() {
    let encoded = encode_hidden_id("17841400000000000");
    assert!(encoded.starts_with(MARKER));
    assert_eq!(encoded.chars().count(), 3 + 17);
}

#[test]
fn test_encode_uses_table() {
    assert_eq!(encode_digits("0123456789"), DIGITS.iter().collect::<String>());
}

#[test]
fn test_marker_disjoint_from_digit_table() {
    assert!(MARKER.chars().all(|c| !DIGITS.contains(&c)));
}

#[test]
fn test_encode_drops_non_digits() {
    assert_eq!(encode_hidden_id("a1-2b3"), encode_hidden_id("123"));
    assert_eq!(encode_hidden_id("abc"), MARKER);
}

#[test]
fn test_decode_after_visible_text() {
    let text = format!("**From**: someone{}", encode_hidden_id("98765"));
    assert_eq!(decode_hidden_id(&text).as_deref(), Some("98765"));
}

#[test]
fn test_decode_stops_at_first_visible_char() {
    let text = format!("> **From**: a{}\n> **Message**: 42", encode_hidden_id("123"));
    assert_eq!(decode_hidden_id(&text).as_deref(), Some("123"));
}

#[test]
fn test_decode_missing_marker() {
    assert_eq!(decode_hidden_id("plain text"), None);
    assert_eq!(decode_hidden_id(&encode_digits("123")), None);
}

#[test]
fn test_decode_marker_without_payload() {
    assert_eq!(decode_hidden_id(&format!("name{}", MARKER)), None);
    assert_eq!(decode_hidden_id(&format!("name{}x", MARKER)), None);
}

#[test]
fn test_decode_legacy_marker() {
    let text = format!("**From**: old{}{}", LEGACY_MARKER, encode_digits("4711"));
    assert_eq!(decode_hidden_id(&text).as_deref(), Some("4711"));
}

#[test]
fn test_decode_legacy_marker_leading_zeros() {
    let text = format!("x{}{}", LEGACY_MARKER, encode_digits("007"));
    assert_eq!(decode_hidden_id(&text).as_deref(), Some("007"));
}

#[test]
fn test_strip_hidden_id() {
    let text = format!("**From**: bob{}\n> next", encode_hidden_id("55"));
    assert_eq!(strip_hidden_id(&text), "**From**: bob\n> next");
    assert_eq!(strip_hidden_id("untouched"), "untouched");
}

proptest! {
    #[test]
    fn prop_numeric_ids_round_trip(id in "[0-9]{1,24}") {
        let text = format!("visible {} tail", encode_hidden_id(&id));
        prop_assert_eq!(decode_hidden_id(&text), Some(id));
    }

    #[test]
    fn prop_encoding_ignores_non_digits(raw in "\\PC{0,32}") {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        prop_assert_eq!(encode_hidden_id(&raw), encode_hidden_id(&digits));
    }
}
