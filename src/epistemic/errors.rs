//! Epistemic model error types
//!
//! Error codes:
//! - NOEMA_UNKNOWN_EPISTEMIC_TYPE (FATAL)
//! - NOEMA_UNKNOWN_GROUNDING_KIND (FATAL)
//! - NOEMA_MISSING_EVENT_ID (FATAL)
//! - NOEMA_MISSING_FIELD (FATAL)
//! - NOEMA_EVENT_INVALID (REJECT)
//! - NOEMA_SUPERSESSION_INVALID (REJECT)
//! - NOEMA_DUPLICATE_EVENT (REJECT)

use std::collections::BTreeMap;
use std::fmt;

/// Severity levels for epistemic errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request refused, store unchanged
    Reject,
    /// Malformed construction, caller must not continue
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Epistemic error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpistemicErrorCode {
    /// Epistemic type outside {given, meant, derived_value}
    UnknownEpistemicType,
    /// Grounding kind outside the closed set
    UnknownGroundingKind,
    /// Event constructed without an id
    MissingEventId,
    /// Required field absent from a structural form
    MissingField,
    /// Event failed strict validation
    EventInvalid,
    /// Supersession requested where it cannot apply
    SupersessionInvalid,
    /// Event id already present in an append-only store
    DuplicateEvent,
}

impl EpistemicErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            EpistemicErrorCode::UnknownEpistemicType => "NOEMA_UNKNOWN_EPISTEMIC_TYPE",
            EpistemicErrorCode::UnknownGroundingKind => "NOEMA_UNKNOWN_GROUNDING_KIND",
            EpistemicErrorCode::MissingEventId => "NOEMA_MISSING_EVENT_ID",
            EpistemicErrorCode::MissingField => "NOEMA_MISSING_FIELD",
            EpistemicErrorCode::EventInvalid => "NOEMA_EVENT_INVALID",
            EpistemicErrorCode::SupersessionInvalid => "NOEMA_SUPERSESSION_INVALID",
            EpistemicErrorCode::DuplicateEvent => "NOEMA_DUPLICATE_EVENT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            EpistemicErrorCode::UnknownEpistemicType
            | EpistemicErrorCode::UnknownGroundingKind
            | EpistemicErrorCode::MissingEventId
            | EpistemicErrorCode::MissingField => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for EpistemicErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Epistemic error with code, message and structured context
#[derive(Debug, Clone)]
pub struct EpistemicError {
    code: EpistemicErrorCode,
    message: String,
    context: BTreeMap<String, String>,
}

impl EpistemicError {
    fn new(code: EpistemicErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attach a context entry
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn unknown_epistemic_type(value: &str) -> Self {
        Self::new(
            EpistemicErrorCode::UnknownEpistemicType,
            format!("Unknown epistemic type '{}'", value),
        )
        .with_context("value", value)
    }

    pub fn unknown_grounding_kind(value: &str) -> Self {
        Self::new(
            EpistemicErrorCode::UnknownGroundingKind,
            format!("Unknown grounding kind '{}'", value),
        )
        .with_context("value", value)
    }

    pub fn missing_event_id() -> Self {
        Self::new(EpistemicErrorCode::MissingEventId, "Event id is required")
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            EpistemicErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
        .with_context("field", field)
    }

    pub fn event_invalid(event_id: &str, reason: impl Into<String>) -> Self {
        Self::new(EpistemicErrorCode::EventInvalid, reason).with_context("event_id", event_id)
    }

    pub fn supersession_invalid(event_id: &str, reason: impl Into<String>) -> Self {
        Self::new(EpistemicErrorCode::SupersessionInvalid, reason)
            .with_context("event_id", event_id)
    }

    pub fn duplicate_event(event_id: &str) -> Self {
        Self::new(
            EpistemicErrorCode::DuplicateEvent,
            format!("Event '{}' already exists; events are append-only", event_id),
        )
        .with_context("event_id", event_id)
    }

    /// Returns the error code
    pub fn code(&self) -> EpistemicErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the structured context
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for EpistemicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if !self.context.is_empty() {
            let ctx: Vec<String> = self
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " ({})", ctx.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for EpistemicError {}

/// Result type for epistemic operations
pub type EpistemicResult<T> = Result<T, EpistemicError>;
