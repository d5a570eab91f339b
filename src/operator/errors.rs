//! Operator algebra error types
//!
//! Error codes:
//! - NOEMA_CHAIN_INVALID (REJECT)
//! - NOEMA_JOIN_POLICY_REQUIRED (REJECT)
//! - NOEMA_EVIDENCE_REQUIRED (REJECT)
//! - NOEMA_ABSENCE_BASIS_REQUIRED (REJECT)
//! - NOEMA_TEMPORAL_INVALID (REJECT)
//! - NOEMA_CHAIN_DECODE (FATAL)

use std::fmt;

use super::validator::ChainIssue;

/// Severity levels for operator errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Construction refused, nothing built
    Reject,
    /// Structural form unreadable
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorErrorCode {
    /// Chain failed validation
    ChainInvalid,
    /// Join configured without a conflict policy
    JoinPolicyRequired,
    /// Synthesis configured without evidence
    EvidenceRequired,
    /// Absence assertion configured without a basis
    AbsenceBasisRequired,
    /// Temporal context is inconsistent
    TemporalInvalid,
    /// Structural form of a chain could not be read
    ChainDecode,
}

impl OperatorErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            OperatorErrorCode::ChainInvalid => "NOEMA_CHAIN_INVALID",
            OperatorErrorCode::JoinPolicyRequired => "NOEMA_JOIN_POLICY_REQUIRED",
            OperatorErrorCode::EvidenceRequired => "NOEMA_EVIDENCE_REQUIRED",
            OperatorErrorCode::AbsenceBasisRequired => "NOEMA_ABSENCE_BASIS_REQUIRED",
            OperatorErrorCode::TemporalInvalid => "NOEMA_TEMPORAL_INVALID",
            OperatorErrorCode::ChainDecode => "NOEMA_CHAIN_DECODE",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            OperatorErrorCode::ChainDecode => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for OperatorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Operator error; chain rejections carry every issue found
#[derive(Debug, Clone)]
pub struct OperatorError {
    code: OperatorErrorCode,
    message: String,
    issues: Vec<ChainIssue>,
}

impl OperatorError {
    fn new(code: OperatorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            issues: Vec::new(),
        }
    }

    pub fn chain_invalid(issues: Vec<ChainIssue>) -> Self {
        let summary: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        Self {
            code: OperatorErrorCode::ChainInvalid,
            message: format!("Chain rejected: {}", summary.join("; ")),
            issues,
        }
    }

    pub fn join_policy_required(right_source: &str) -> Self {
        Self::new(
            OperatorErrorCode::JoinPolicyRequired,
            format!(
                "Join with '{}' has no conflict policy; multiple matches must be resolved explicitly",
                right_source
            ),
        )
    }

    pub fn evidence_required(left_ref: &str, right_ref: &str) -> Self {
        Self::new(
            OperatorErrorCode::EvidenceRequired,
            format!(
                "Synthesis of '{}' and '{}' requires at least one evidence event",
                left_ref, right_ref
            ),
        )
    }

    pub fn absence_basis_required(expectation: &str) -> Self {
        Self::new(
            OperatorErrorCode::AbsenceBasisRequired,
            format!("Absence assertion '{}' requires a basis", expectation),
        )
    }

    pub fn temporal_invalid(reason: impl Into<String>) -> Self {
        Self::new(OperatorErrorCode::TemporalInvalid, reason)
    }

    pub fn chain_decode(reason: impl Into<String>) -> Self {
        Self::new(OperatorErrorCode::ChainDecode, reason)
    }

    pub fn code(&self) -> OperatorErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Validation issues behind a chain rejection
    pub fn issues(&self) -> &[ChainIssue] {
        &self.issues
    }
}

impl fmt::Display for OperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for OperatorError {}

pub type OperatorResult<T> = Result<T, OperatorError>;
