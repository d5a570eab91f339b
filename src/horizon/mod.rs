//! Horizon subsystem
//!
//! Perspectival access control over events.
//!
//! # Rules
//!
//! - Perspectivality: there is no global view, only the synthetic top
//! - Restrictivity: refining a horizon only removes visible events
//! - Coherence: a derivation valid under a horizon stays valid under any
//!   of its refinements
//!
//! `HorizonGate::is_available` is the only visibility predicate. Nothing
//! else reads through a horizon.

mod errors;
mod gate;
#[allow(clippy::module_inception)]
mod horizon;
mod lattice;
mod types;

pub use errors::{HorizonError, HorizonResult};
pub use gate::{DenialReason, DerivationCheck, DerivationFailure, EventProvider, HorizonGate};
pub use horizon::{Horizon, HorizonDescriptor, RefinementRequest, TOP_HORIZON_ID};
pub use lattice::{HorizonLattice, RestrictivityCheck};
pub use types::{HorizonType, Scope, TimeRange};
