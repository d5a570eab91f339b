//! Store error types
//!
//! Error codes:
//! - NOEMA_STORE_READ_FAILED (ERROR)
//! - NOEMA_STORE_DECODE_FAILED (ERROR)
//! - NOEMA_STORE_EVENT_REJECTED (ERROR)

use std::fmt;
use std::io;

use crate::epistemic::EpistemicError;

/// Severity levels for store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Load aborted, nothing appended
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// File could not be read
    ReadFailed,
    /// File content is not the expected JSON shape
    DecodeFailed,
    /// An event in the input was refused by the store
    EventRejected,
}

impl StoreErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::ReadFailed => "NOEMA_STORE_READ_FAILED",
            StoreErrorCode::DecodeFailed => "NOEMA_STORE_DECODE_FAILED",
            StoreErrorCode::EventRejected => "NOEMA_STORE_EVENT_REJECTED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    /// Offending event id or source id, when known
    details: Option<String>,
    source: Option<io::Error>,
}

impl StoreError {
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StoreErrorCode::ReadFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::DecodeFailed,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Decode failure located at one source id
    pub fn decode_failed_for(source_id: &str, message: impl Into<String>) -> Self {
        Self {
            details: Some(format!("source_id: {}", source_id)),
            ..Self::decode_failed(message)
        }
    }

    /// Wraps the epistemic error that refused an event
    pub fn event_rejected(index: usize, cause: &EpistemicError) -> Self {
        Self {
            code: StoreErrorCode::EventRejected,
            message: cause.to_string(),
            details: Some(format!("event_index: {}", index)),
            source: None,
        }
    }

    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
