//! Predicate subsystem
//!
//! A recursive AND / OR / NOT / COMPARISON tree over row fields with lenient,
//! case-insensitive coercion and an exact structural (JSON) round trip.

mod ast;
mod errors;
mod eval;

pub use ast::{CompareOp, Predicate};
pub use errors::{PredicateError, PredicateResult};
pub use eval::{coerce_number, coerce_string, is_nullish, lookup, CompiledPredicate, Row};
