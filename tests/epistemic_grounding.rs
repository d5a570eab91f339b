//! Epistemic Grounding Tests
//!
//! - Given / Meant / Derived-Value grounding rules
//! - Strict decoding of the structural form
//! - Supersession leaves the original untouched

use chrono::{DateTime, Utc};
use noema::epistemic::{
    Derivation, EpistemicErrorCode, EpistemicType, Event, EventValidator, Frame, Grounding,
    GroundingRef, SupersessionType, ViolationCode,
};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn ts() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn codes(event: &Event) -> Vec<ViolationCode> {
    EventValidator::validate(event).into_iter().map(|v| v.code).collect()
}

// =============================================================================
// Grounding Rules
// =============================================================================

#[test]
fn test_given_with_external_reference_is_clean() {
    let g = Event::given("g1", ts(), "crawler")
        .unwrap()
        .with_reference(GroundingRef::external("https://registry.example/123"));
    assert!(codes(&g).is_empty());
}

#[test]
fn test_meant_requires_frame_and_grounding() {
    let bare = Event::new("m1", EpistemicType::Meant, ts(), "alice").unwrap();
    let found = codes(&bare);
    assert!(found.contains(&ViolationCode::MissingFrame));
    assert!(found.contains(&ViolationCode::EmptyMeantGrounding));

    let grounded = Event::meant("m2", ts(), "alice", Frame::new("acme is a supplier"))
        .unwrap()
        .with_reference(GroundingRef::semantic("g1"));
    assert!(codes(&grounded).is_empty());
}

#[test]
fn test_only_given_may_hold_external_references() {
    let m = Event::meant("m1", ts(), "alice", Frame::new("claim"))
        .unwrap()
        .with_reference(GroundingRef::external("ext:1"));
    assert_eq!(codes(&m), vec![ViolationCode::ExternalRefOnNonGiven]);
}

#[test]
fn test_derived_value_requires_computational_reference() {
    let d = Event::derived("d1", ts(), "engine")
        .unwrap()
        .with_reference(GroundingRef::structural("g1"));
    assert_eq!(codes(&d), vec![ViolationCode::MissingComputationalRef]);

    let ok = Event::derived("d2", ts(), "engine").unwrap().with_grounding(
        Grounding::new()
            .with_reference(GroundingRef::computational("g1"))
            .with_derivation(Derivation::new(vec!["aggregate".into()]).with_input("rows", "g1")),
    );
    assert!(codes(&ok).is_empty());
}

#[test]
fn test_strict_path_fails_on_first_violation() {
    let d = Event::derived("d1", ts(), "engine").unwrap();
    let err = EventValidator::assert_valid(&d).unwrap_err();
    assert_eq!(err.code(), EpistemicErrorCode::EventInvalid);
}

// =============================================================================
// Strict Decoding
// =============================================================================

#[test]
fn test_decode_round_trip() {
    let m = Event::meant("m1", ts(), "alice", Frame::new("claim").with_purpose("audit"))
        .unwrap()
        .with_workspace("w1")
        .with_tag("q1")
        .with_reference(GroundingRef::semantic("g1"));
    let decoded = Event::from_value(&m.to_value()).unwrap();
    assert_eq!(decoded, m);
}

#[test]
fn test_decode_rejects_unknown_type_and_kind() {
    let err = Event::from_value(&json!({
        "id": "x", "epistemic_type": "rumour", "timestamp": "2024-03-01T12:00:00Z", "actor": "a"
    }))
    .unwrap_err();
    assert_eq!(err.code(), EpistemicErrorCode::UnknownEpistemicType);

    let err = Event::from_value(&json!({
        "id": "x", "epistemic_type": "given", "timestamp": "2024-03-01T12:00:00Z", "actor": "a",
        "grounding": {"references": [{"event_id": "y", "kind": "hearsay"}]}
    }))
    .unwrap_err();
    assert_eq!(err.code(), EpistemicErrorCode::UnknownGroundingKind);
}

#[test]
fn test_decode_rejects_missing_id() {
    let err = Event::from_value(&json!({
        "epistemic_type": "given", "timestamp": "2024-03-01T12:00:00Z", "actor": "a"
    }))
    .unwrap_err();
    assert_eq!(err.code(), EpistemicErrorCode::MissingEventId);
    assert!(err.is_fatal());
}

#[test]
fn test_decode_rejects_malformed_tags_and_workspace() {
    let err = Event::from_value(&json!({
        "id": "x", "epistemic_type": "given", "timestamp": "2024-03-01T12:00:00Z", "actor": "a",
        "tags": ["q1", 7]
    }))
    .unwrap_err();
    assert_eq!(err.code(), EpistemicErrorCode::EventInvalid);
    assert_eq!(err.context().get("event_id").map(String::as_str), Some("x"));
    assert!(err.message().contains("tags[1]"));

    let err = Event::from_value(&json!({
        "id": "x", "epistemic_type": "given", "timestamp": "2024-03-01T12:00:00Z", "actor": "a",
        "tags": "q1"
    }))
    .unwrap_err();
    assert_eq!(err.code(), EpistemicErrorCode::EventInvalid);

    let err = Event::from_value(&json!({
        "id": "x", "epistemic_type": "given", "timestamp": "2024-03-01T12:00:00Z", "actor": "a",
        "workspace": 3
    }))
    .unwrap_err();
    assert_eq!(err.code(), EpistemicErrorCode::EventInvalid);

    let ok = Event::from_value(&json!({
        "id": "x", "epistemic_type": "given", "timestamp": "2024-03-01T12:00:00Z", "actor": "a",
        "workspace": null, "tags": ["q1"]
    }))
    .unwrap();
    assert!(ok.tags().contains("q1"));
    assert_eq!(ok.workspace(), None);
}

// =============================================================================
// Supersession
// =============================================================================

#[test]
fn test_supersede_creates_new_event_and_keeps_old() {
    let m1 = Event::meant("m1", ts(), "alice", Frame::new("claim"))
        .unwrap()
        .with_reference(GroundingRef::semantic("g1"));
    let m2 = m1
        .supersede("m2", SupersessionType::Correction, "wrong supplier", "bob", ts())
        .unwrap();

    assert!(m1.supersession().is_none());
    assert_eq!(m2.supersession().unwrap().supersedes_id(), Some("m1"));
    assert_eq!(m2.actor(), "bob");
    assert!(codes(&m2).is_empty());
}

#[test]
fn test_given_events_are_never_superseded() {
    let g = Event::given("g1", ts(), "crawler").unwrap();
    let err = g
        .supersede("g2", SupersessionType::Correction, "typo", "bob", ts())
        .unwrap_err();
    assert_eq!(err.code(), EpistemicErrorCode::SupersessionInvalid);
}
