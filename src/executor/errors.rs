//! Executor error types
//!
//! Error codes:
//! - NOEMA_SOURCE_NOT_FOUND (FATAL)
//! - NOEMA_EXECUTION_FAILED (ERROR)
//! - NOEMA_EXECUTION_LIMIT (ERROR)

use std::fmt;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Execution failed, inputs untouched
    Error,
    /// Execution cannot proceed and must not be retried
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// Entry or join references a source the provider does not have
    SourceNotFound,
    /// General execution failure
    ExecutionFailed,
    /// Row limit exceeded during execution
    ExecutionLimit,
}

impl ExecutorErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::SourceNotFound => "NOEMA_SOURCE_NOT_FOUND",
            ExecutorErrorCode::ExecutionFailed => "NOEMA_EXECUTION_FAILED",
            ExecutorErrorCode::ExecutionLimit => "NOEMA_EXECUTION_LIMIT",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::SourceNotFound => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error with the step it happened at, when known
#[derive(Debug)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
    step: Option<usize>,
}

impl ExecutorError {
    pub fn source_not_found(source_id: &str) -> Self {
        Self {
            code: ExecutorErrorCode::SourceNotFound,
            message: format!("Source '{}' not found", source_id),
            step: None,
        }
    }

    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::ExecutionFailed,
            message: reason.into(),
            step: None,
        }
    }

    pub fn execution_limit(rows: usize, max_rows: usize) -> Self {
        Self {
            code: ExecutorErrorCode::ExecutionLimit,
            message: format!("{} rows exceeds the limit of {}", rows, max_rows),
            step: None,
        }
    }

    /// Pin the error to a chain step
    pub fn at_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn step(&self) -> Option<usize> {
        self.step
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(step) = self.step {
            write!(f, " [step {}]", step)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutorError {}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_is_fatal() {
        let err = ExecutorError::source_not_found("people");
        assert!(err.is_fatal());
        assert_eq!(err.code().code(), "NOEMA_SOURCE_NOT_FOUND");
    }

    #[test]
    fn test_limit_not_fatal() {
        let err = ExecutorError::execution_limit(11, 10);
        assert!(!err.is_fatal());
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn test_display_includes_step() {
        let err = ExecutorError::execution_failed("boom").at_step(3);
        let display = err.to_string();
        assert!(display.contains("NOEMA_EXECUTION_FAILED"));
        assert!(display.contains("[step 3]"));
    }
}
