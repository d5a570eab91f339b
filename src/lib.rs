//! noema - an epistemic data transformation engine
//!
//! Every event is Given, Meant or Derived-Value. Operator chains transform
//! row sources into named sets; horizons decide which events a reader may
//! see.

pub mod cli;
pub mod epistemic;
pub mod executor;
pub mod horizon;
pub mod observability;
pub mod operator;
pub mod predicate;
pub mod store;
