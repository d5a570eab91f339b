//! Chain executor subsystem
//!
//! Interprets a validated operator chain against a row-oriented source
//! provider and materializes the result.
//!
//! # Execution Flow
//!
//! 1. Validate the chain (raw chains only; SetDefinitions are pre-validated)
//! 2. Thread rows, columns and context through each step in order
//! 3. Record per-step input/output row counts
//! 4. Return rows, columns, hidden rows and step statistics
//!
//! # Guarantees
//!
//! - Deterministic: same chain + same sources = same output
//! - Missing entry/join sources fail loudly and are not retried
//! - Joins never guess: every multi-match is resolved by the declared policy

mod aggregate;
mod errors;
mod executor;
mod join;
mod result;
mod sorter;
mod source;

pub use aggregate::{aggregate, aggregate_columns};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use executor::{
    ChainExecutor, ABSENCE_BASIS_COLUMN, ABSENCE_EXPECTATION_COLUMN, ABSENCE_TARGET_COLUMN,
    AS_OF_COLUMN, EVALUATION_COLUMN, SEMANTICS_COLUMN, SUPERPOSED_COLUMN,
    SYNTHESIS_EVIDENCE_COLUMN, SYNTHESIZED_ENTITY_COLUMN, VERSION_COLUMN, WINDOW_END_COLUMN,
    WINDOW_START_COLUMN,
};
pub use join::{hash_join, Joined, MATCHES_COLUMN, MATCH_COUNT_COLUMN, MULTIPLE_COLUMN};
pub use result::{ExecutionResult, StepStats};
pub use sorter::RowSorter;
pub use source::{ExecutionContext, SourceData, SourceProvider};
