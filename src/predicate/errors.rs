//! Predicate error types
//!
//! Error codes:
//! - NOEMA_PREDICATE_INVALID (REJECT)

use std::fmt;

/// Predicate error with the offending path inside the tree
#[derive(Debug, Clone)]
pub struct PredicateError {
    message: String,
    path: String,
}

impl PredicateError {
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            message: reason.into(),
            path: path.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        "NOEMA_PREDICATE_INVALID"
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Location in the tree, e.g. `$.predicates[1].value`
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for PredicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {} at {}", self.code(), self.message, self.path)
    }
}

impl std::error::Error for PredicateError {}

/// Result type for predicate operations
pub type PredicateResult<T> = Result<T, PredicateError>;
