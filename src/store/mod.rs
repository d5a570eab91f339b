//! In-memory stores
//!
//! Reference implementations of the two provider seams:
//! - `MemoryEventStore` implements `EventProvider` for the horizon gate
//! - `MemorySourceStore` implements `SourceProvider` for the chain executor
//!
//! Both load from plain JSON files. Stores are single-writer; readers hold a
//! stable snapshot for the duration of one execution or gate call.

mod errors;
mod events;
mod sources;

pub use errors::{Severity, StoreError, StoreErrorCode, StoreResult};
pub use events::MemoryEventStore;
pub use sources::MemorySourceStore;
