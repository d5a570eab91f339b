//! Chain validation
//!
//! Returns every issue found instead of failing on the first. Errors block
//! construction, warnings are advisory, dangerous operators are flagged for
//! audit and never blocked.

use std::fmt;

use serde::Serialize;

use crate::epistemic::EpistemicType;

use super::catalog::OperatorKind;
use super::chain::OperatorChain;
use super::params::{OperatorParams, RestrictMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    EmptyChain,
    MissingEntry,
    MissingDesignate,
    MissingTemporal,
    JoinWithoutPolicy,
    SynthesisNotMeant,
    SynthesisWithoutEvidence,
    AbsenceWithoutBasis,
    TemporalInvalid,
    AggregateNotDerived,
    MissingGrounding,
    MultipleNames,
    EmptySelection,
    DangerousOperator,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::EmptyChain => "empty_chain",
            IssueCode::MissingEntry => "missing_entry",
            IssueCode::MissingDesignate => "missing_designate",
            IssueCode::MissingTemporal => "missing_temporal",
            IssueCode::JoinWithoutPolicy => "join_without_policy",
            IssueCode::SynthesisNotMeant => "synthesis_not_meant",
            IssueCode::SynthesisWithoutEvidence => "synthesis_without_evidence",
            IssueCode::AbsenceWithoutBasis => "absence_without_basis",
            IssueCode::TemporalInvalid => "temporal_invalid",
            IssueCode::AggregateNotDerived => "aggregate_not_derived",
            IssueCode::MissingGrounding => "missing_grounding",
            IssueCode::MultipleNames => "multiple_names",
            IssueCode::EmptySelection => "empty_selection",
            IssueCode::DangerousOperator => "dangerous_operator",
        }
    }
}

/// One finding, optionally pinned to a step index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
}

impl ChainIssue {
    fn chain(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            step: None,
        }
    }

    fn at(step: usize, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            step: Some(step),
        }
    }
}

impl fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "step {}: {} ({})", step, self.message, self.code.as_str()),
            None => write!(f, "{} ({})", self.message, self.code.as_str()),
        }
    }
}

/// Outcome of validating a chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainValidation {
    pub errors: Vec<ChainIssue>,
    pub warnings: Vec<ChainIssue>,
    pub flagged: Vec<ChainIssue>,
}

impl ChainValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct ChainValidator;

impl ChainValidator {
    pub fn validate(chain: &OperatorChain) -> ChainValidation {
        let mut out = ChainValidation::default();
        let steps = chain.invocations();

        let (first, last) = match (steps.first(), steps.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                out.errors
                    .push(ChainIssue::chain(IssueCode::EmptyChain, "chain has no operators"));
                return out;
            }
        };

        if first.operator() != OperatorKind::Entry {
            out.errors.push(ChainIssue::at(
                0,
                IssueCode::MissingEntry,
                format!("chain must begin with entry, found {}", first.operator()),
            ));
        }
        if last.operator() != OperatorKind::Designate {
            out.errors.push(ChainIssue::at(
                steps.len() - 1,
                IssueCode::MissingDesignate,
                format!("chain must end with designate, found {}", last.operator()),
            ));
        }
        if !chain.contains(OperatorKind::Project) {
            out.errors.push(ChainIssue::chain(
                IssueCode::MissingTemporal,
                "chain has no temporal projection; temporal context is never implicit",
            ));
        }

        let mut names = 0usize;
        for (i, step) in steps.iter().enumerate() {
            match step.params() {
                OperatorParams::Connect(join) if join.conflict_policy.is_none() => {
                    out.errors.push(ChainIssue::at(
                        i,
                        IssueCode::JoinWithoutPolicy,
                        format!("join with '{}' has no conflict policy", join.right_source),
                    ));
                }
                OperatorParams::Synthesize(synth) => {
                    if step.produces() != EpistemicType::Meant {
                        out.errors.push(ChainIssue::at(
                            i,
                            IssueCode::SynthesisNotMeant,
                            format!(
                                "entity synthesis must produce meant, declared {}",
                                step.produces().as_str()
                            ),
                        ));
                    }
                    if synth.evidence.iter().all(|e| e.trim().is_empty()) {
                        out.errors.push(ChainIssue::at(
                            i,
                            IssueCode::SynthesisWithoutEvidence,
                            format!(
                                "synthesis of '{}' and '{}' carries no evidence",
                                synth.left_ref, synth.right_ref
                            ),
                        ));
                    }
                }
                OperatorParams::AssertAbsence(absence) if !absence.has_basis() => {
                    out.errors.push(ChainIssue::at(
                        i,
                        IssueCode::AbsenceWithoutBasis,
                        format!("absence assertion '{}' has no basis", absence.expectation),
                    ));
                }
                OperatorParams::Project(temporal) => {
                    if let Err(e) = temporal.check() {
                        out.errors
                            .push(ChainIssue::at(i, IssueCode::TemporalInvalid, e.message()));
                    }
                }
                OperatorParams::Aggregate(_) if step.produces() != EpistemicType::DerivedValue => {
                    out.errors.push(ChainIssue::at(
                        i,
                        IssueCode::AggregateNotDerived,
                        format!(
                            "aggregation must produce derived_value, declared {}",
                            step.produces().as_str()
                        ),
                    ));
                }
                OperatorParams::Restrict(restrict) => {
                    if let RestrictMode::Select { columns } = &restrict.mode {
                        if columns.is_empty() {
                            out.warnings.push(ChainIssue::at(
                                i,
                                IssueCode::EmptySelection,
                                "selection keeps no columns",
                            ));
                        }
                    }
                }
                OperatorParams::Designate(_) => names += 1,
                _ => {}
            }

            if step.operator().is_dangerous() {
                out.flagged.push(ChainIssue::at(
                    i,
                    IssueCode::DangerousOperator,
                    format!("{} is flagged for audit", step.operator()),
                ));
            }
        }

        if names > 1 {
            out.warnings.push(ChainIssue::chain(
                IssueCode::MultipleNames,
                "chain is named more than once; the last name wins",
            ));
        }
        if chain.grounding().map_or(true, |g| g.is_empty()) {
            out.warnings.push(ChainIssue::chain(
                IssueCode::MissingGrounding,
                "chain carries no grounding",
            ));
        }

        out
    }
}
