//! Epistemic model
//!
//! Every unit of data is one of:
//! - Given: a raw observation
//! - Meant: an interpretation, framed and grounded
//! - Derived-Value: a computed artifact, grounded computationally
//!
//! Events are immutable and append-only; supersession creates a new event.

mod errors;
mod event;
mod types;
mod validator;

pub use errors::{EpistemicError, EpistemicErrorCode, EpistemicResult, Severity};
pub use event::Event;
pub use types::{
    Derivation, EpistemicStatus, EpistemicType, Frame, Grounding, GroundingKind, GroundingRef,
    Supersession, SupersessionType,
};
pub use validator::{EventValidator, Violation, ViolationCode};
