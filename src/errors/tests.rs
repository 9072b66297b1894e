use super::*;

#[test]
fn config_error_display() {
    let err = RelayError::Config("bad value".into());
    assert_eq!(err.to_string(), "Configuration error: bad value");
    assert!(!err.is_discardable());
}

#[test]
fn malformed_event_is_discardable() {
    let err = RelayError::MalformedEvent("missing sender".into());
    assert_eq!(err.to_string(), "Malformed event: missing sender");
    assert!(err.is_discardable());
}

#[test]
fn downstream_display_names_service() {
    let err = RelayError::downstream("instagram", "HTTP 500");
    assert_eq!(err.to_string(), "instagram unavailable: HTTP 500");
    assert!(err.is_discardable());
}

#[test]
fn concurrency_violation_not_discardable() {
    let err = RelayError::ConcurrencyViolation {
        sender_id: "42".into(),
    };
    assert!(err.to_string().contains("42"));
    assert!(!err.is_discardable());
}

#[test]
fn internal_from_anyhow() {
    let anyhow_err = anyhow::anyhow!("something broke");
    let err: RelayError = anyhow_err.into();
    assert!(matches!(err, RelayError::Internal(_)));
    assert_eq!(err.to_string(), "something broke");
}
