use super::*;

fn users() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("alice".to_string(), "111".to_string());
    m.insert("bob".to_string(), "222".to_string());
    m
}

fn reel(url: &str) -> MediaAttachment {
    MediaAttachment {
        url: url.to_string(),
        kind: MediaKind::Reel,
    }
}

#[test]
fn test_media_kind_from_attachment_type() {
    assert_eq!(MediaKind::from_attachment_type("ig_reel"), Some(MediaKind::Reel));
    assert_eq!(MediaKind::from_attachment_type("share"), Some(MediaKind::Post));
    assert_eq!(MediaKind::from_attachment_type("image"), None);
    assert_eq!(MediaKind::from_attachment_type(""), None);
}

#[test]
fn test_media_kind_display() {
    assert_eq!(MediaKind::Reel.to_string(), "reel");
    assert_eq!(MediaKind::Post.to_string(), "post");
}

#[test]
fn test_inbound_text_empty_is_none() {
    let event = InboundEvent {
        sender_id: "1".into(),
        text: Some(String::new()),
        media: None,
        timestamp: Utc::now(),
    };
    assert_eq!(event.text(), None);
}

#[test]
fn test_resolve_plain_text_goes_to_channel() {
    let (dest, body) = Destination::resolve(Some("nice one"), &users());
    assert_eq!(dest, Destination::Channel);
    assert_eq!(body.as_deref(), Some("nice one"));
}

#[test]
fn test_resolve_leading_name_routes_to_dm() {
    let (dest, body) = Destination::resolve(Some("alice look at this"), &users());
    assert_eq!(
        dest,
        Destination::DirectMessage {
            user_id: "111".into()
        }
    );
    assert_eq!(body.as_deref(), Some("look at this"));
}

#[test]
fn test_resolve_name_only_has_no_body() {
    let (dest, body) = Destination::resolve(Some("  bob  "), &users());
    assert_eq!(
        dest,
        Destination::DirectMessage {
            user_id: "222".into()
        }
    );
    assert_eq!(body, None);
}

#[test]
fn test_resolve_name_is_case_sensitive() {
    let (dest, _) = Destination::resolve(Some("Alice hi"), &users());
    assert_eq!(dest, Destination::Channel);
}

#[test]
fn test_resolve_name_not_leading_stays_in_channel() {
    let (dest, body) = Destination::resolve(Some("hi alice"), &users());
    assert_eq!(dest, Destination::Channel);
    assert_eq!(body.as_deref(), Some("hi alice"));
}

#[test]
fn test_resolve_no_text() {
    let (dest, body) = Destination::resolve(None, &users());
    assert_eq!(dest, Destination::Channel);
    assert_eq!(body, None);
}

#[test]
fn test_compose_sets_destination() {
    let msg = OutboundMessage::compose(
        "insta_user".into(),
        "42".into(),
        Some("alice wow"),
        Some(reel("https://cdn/r.mp4")),
        &users(),
    );
    assert_eq!(msg.text.as_deref(), Some("wow"));
    assert_eq!(msg.shape(), "reel+text");
    assert!(matches!(msg.destination, Destination::DirectMessage { .. }));
}

#[test]
fn test_shape_labels() {
    let text_only = OutboundMessage::compose("u".into(), "1".into(), Some("hi"), None, &users());
    assert_eq!(text_only.shape(), "text");
    let reel_only =
        OutboundMessage::compose("u".into(), "1".into(), None, Some(reel("x")), &users());
    assert_eq!(reel_only.shape(), "reel");
}
