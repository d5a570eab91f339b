//! Event validation
//!
//! Two paths:
//! - Audit: `validate_structure` / `validate_grounding` / `validate` return
//!   every violation found so callers can batch-audit without aborting.
//! - Strict: `assert_valid` fails on the first violation with a typed error.
//!
//! Grounding rules:
//! - Only Given events may hold an `external` reference
//! - A Meant event's grounding must be non-empty
//! - A Derived-Value event's grounding must contain a `computational` reference
//!
//! All functions are pure. No event is mutated.

use std::fmt;

use serde::Serialize;

use super::errors::{EpistemicError, EpistemicResult};
use super::event::Event;
use super::types::{EpistemicType, GroundingKind};

/// Kind of rule an event broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    MissingId,
    MissingActor,
    MissingFrame,
    EmptyClaim,
    FrameOnNonMeant,
    EmptyReferenceId,
    SelfReference,
    ExternalRefOnNonGiven,
    EmptyMeantGrounding,
    MissingComputationalRef,
    SupersessionOnGiven,
    SupersessionWithoutTarget,
    SupersedesOwnEvidence,
}

impl ViolationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCode::MissingId => "missing_id",
            ViolationCode::MissingActor => "missing_actor",
            ViolationCode::MissingFrame => "missing_frame",
            ViolationCode::EmptyClaim => "empty_claim",
            ViolationCode::FrameOnNonMeant => "frame_on_non_meant",
            ViolationCode::EmptyReferenceId => "empty_reference_id",
            ViolationCode::SelfReference => "self_reference",
            ViolationCode::ExternalRefOnNonGiven => "external_ref_on_non_given",
            ViolationCode::EmptyMeantGrounding => "empty_meant_grounding",
            ViolationCode::MissingComputationalRef => "missing_computational_ref",
            ViolationCode::SupersessionOnGiven => "supersession_on_given",
            ViolationCode::SupersessionWithoutTarget => "supersession_without_target",
            ViolationCode::SupersedesOwnEvidence => "supersedes_own_evidence",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One rule violation found on an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub code: ViolationCode,
    pub event_id: String,
    pub message: String,
}

impl Violation {
    fn new(code: ViolationCode, event: &Event, message: impl Into<String>) -> Self {
        Self {
            code,
            event_id: event.id().to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.event_id, self.code, self.message)
    }
}

/// Stateless event validator
pub struct EventValidator;

impl EventValidator {
    /// Structural completeness: id, actor, and a frame on Meant events
    pub fn validate_structure(event: &Event) -> Vec<Violation> {
        let mut violations = Vec::new();

        if event.id().trim().is_empty() {
            violations.push(Violation::new(ViolationCode::MissingId, event, "event id is empty"));
        }
        if event.actor().trim().is_empty() {
            violations.push(Violation::new(ViolationCode::MissingActor, event, "actor is empty"));
        }

        match (event.epistemic_type(), event.frame()) {
            (EpistemicType::Meant, None) => violations.push(Violation::new(
                ViolationCode::MissingFrame,
                event,
                "meant events must carry a frame",
            )),
            (EpistemicType::Meant, Some(frame)) if frame.claim().trim().is_empty() => {
                violations.push(Violation::new(
                    ViolationCode::EmptyClaim,
                    event,
                    "frame claim is empty",
                ))
            }
            (EpistemicType::Meant, Some(_)) => {}
            (other, Some(_)) => violations.push(Violation::new(
                ViolationCode::FrameOnNonMeant,
                event,
                format!("frames apply to meant events only, found on {}", other),
            )),
            (_, None) => {}
        }

        violations
    }

    /// Grounding and supersession rules
    pub fn validate_grounding(event: &Event) -> Vec<Violation> {
        let mut violations = Vec::new();
        let grounding = event.grounding();

        for r in grounding.references() {
            if r.event_id().trim().is_empty() {
                violations.push(Violation::new(
                    ViolationCode::EmptyReferenceId,
                    event,
                    format!("{} reference has an empty event id", r.kind()),
                ));
            } else if r.event_id() == event.id() {
                violations.push(Violation::new(
                    ViolationCode::SelfReference,
                    event,
                    "event cannot ground itself",
                ));
            }
        }

        if !event.is_given() && grounding.has_kind(GroundingKind::External) {
            violations.push(Violation::new(
                ViolationCode::ExternalRefOnNonGiven,
                event,
                format!(
                    "only given events may hold external references, found on {}",
                    event.epistemic_type()
                ),
            ));
        }

        match event.epistemic_type() {
            EpistemicType::Meant if grounding.is_empty() => violations.push(Violation::new(
                ViolationCode::EmptyMeantGrounding,
                event,
                "meant events require a non-empty grounding",
            )),
            EpistemicType::DerivedValue if !grounding.has_kind(GroundingKind::Computational) => {
                violations.push(Violation::new(
                    ViolationCode::MissingComputationalRef,
                    event,
                    "derived values require a computational reference",
                ))
            }
            _ => {}
        }

        if let Some(sup) = event.supersession() {
            if event.is_given() {
                violations.push(Violation::new(
                    ViolationCode::SupersessionOnGiven,
                    event,
                    "given events cannot take part in supersession",
                ));
            }
            if sup.supersedes_id().is_none() && sup.superseded_by_id().is_none() {
                violations.push(Violation::new(
                    ViolationCode::SupersessionWithoutTarget,
                    event,
                    "supersession names neither a predecessor nor a successor",
                ));
            }
            if let Some(target) = sup.supersedes_id() {
                if grounding.references().iter().any(|r| r.event_id() == target) {
                    violations.push(Violation::new(
                        ViolationCode::SupersedesOwnEvidence,
                        event,
                        format!("'{}' is evidence for this event and cannot be superseded by it", target),
                    ));
                }
            }
        }

        violations
    }

    /// Structure and grounding together
    pub fn validate(event: &Event) -> Vec<Violation> {
        let mut violations = Self::validate_structure(event);
        violations.extend(Self::validate_grounding(event));
        violations
    }

    /// Strict path: fails on the first violation
    pub fn assert_valid(event: &Event) -> EpistemicResult<()> {
        match Self::validate(event).into_iter().next() {
            None => Ok(()),
            Some(v) => Err(EpistemicError::event_invalid(&v.event_id, v.message)
                .with_context("violation", v.code.as_str())),
        }
    }
}
