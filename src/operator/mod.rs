//! Operator algebra
//!
//! - Closed catalog of ten classified operators
//! - Typed per-operator parameters
//! - Builder that fails fast on missing epistemic parameters
//! - Validator returning every error, warning and audit flag
//! - SetDefinition as the built, named result
//!
//! A compute-class operator anywhere in a chain makes the whole chain
//! derived_value.

mod builder;
mod catalog;
mod chain;
mod errors;
mod params;
mod set_definition;
mod validator;

pub use builder::{build_chain, BuildOptions, ChainBuilder};
pub use catalog::{OperatorClass, OperatorKind, OperatorSpec, ProducedType};
pub use chain::{OperatorChain, OperatorInvocation};
pub use errors::{OperatorError, OperatorErrorCode, OperatorResult, Severity};
pub use params::{
    AbsenceParams, AggregateFn, AggregateParams, Aggregation, ConflictPolicy, DesignateParams,
    EntryParams, Evaluation, Interpretation, JoinKind, JoinParams, OperatorParams, PickOrder,
    RestrictMode, RestrictParams, SupersedeParams, SuperpositionParams, SynthesisParams,
    TemporalMode, TemporalParams, TemporalSemantics, TimePoint, Visibility,
};
pub use set_definition::{SetDefinition, SetStrategy};
pub use validator::{ChainIssue, ChainValidation, ChainValidator, IssueCode};
