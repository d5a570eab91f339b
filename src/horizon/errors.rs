//! # Horizon Errors
//!
//! Lookups against an unknown horizon are fatal to the call. Restrictivity
//! verification does not use these; it returns a structured outcome.

use thiserror::Error;

/// Result type for horizon and lattice operations
pub type HorizonResult<T> = Result<T, HorizonError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HorizonError {
    /// No horizon registered under this id
    #[error("Unknown horizon '{0}'")]
    UnknownHorizon(String),

    /// Horizon ids are unique within a lattice
    #[error("Horizon '{0}' is already registered")]
    DuplicateHorizon(String),

    /// Parent must be registered before its children
    #[error("Horizon '{horizon}' names unknown parent '{parent}'")]
    UnknownParent { horizon: String, parent: String },

    /// A child must be narrower-or-equal to its parent in every dimension
    #[error("Horizon '{horizon}' is not a refinement of '{parent}'")]
    NotARefinement { horizon: String, parent: String },

    /// Imported descriptors whose parent links never reach the top
    #[error("Horizon import contains a cycle through: {}", .0.join(", "))]
    ImportCycle(Vec<String>),

    /// The top element is synthesized, never imported or registered
    #[error("The top horizon cannot be imported or registered")]
    TopElementImport,
}

impl HorizonError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            HorizonError::UnknownHorizon(_) => "NOEMA_UNKNOWN_HORIZON",
            HorizonError::DuplicateHorizon(_) => "NOEMA_DUPLICATE_HORIZON",
            HorizonError::UnknownParent { .. } => "NOEMA_UNKNOWN_PARENT",
            HorizonError::NotARefinement { .. } => "NOEMA_NOT_A_REFINEMENT",
            HorizonError::ImportCycle(_) => "NOEMA_IMPORT_CYCLE",
            HorizonError::TopElementImport => "NOEMA_TOP_IMPORT",
        }
    }
}
