//! Observable lifecycle events
//!
//! Events are explicit and typed; the string form is what appears in the
//! `event` key of a log line.

use std::fmt;

/// Observable events in noema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Event store
    /// Event appended to the store
    EventAppended,
    /// Event refused by the store
    EventRejected,

    // Chains
    /// Chain validated and built into a set definition
    ChainBuilt,
    /// Chain construction refused
    ChainRejected,
    /// Advisory chain finding
    ChainWarning,
    /// Dangerous operator present in a chain (audit only)
    ChainFlagged,

    // Execution
    /// Execution begins
    ExecutionBegin,
    /// One operator step executed
    StepExecuted,
    /// Execution complete
    ExecutionComplete,
    /// Execution failed
    ExecutionFailed,

    // Horizons
    /// Horizon refined from a parent
    HorizonRefined,
    /// Gate refused an event
    GateDenied,
    /// Derivation rejected under a horizon
    DerivationRejected,
    /// Restrictivity verification found a leak
    RestrictivityViolation,
}

impl LogEvent {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEvent::ConfigLoaded => "CONFIG_LOADED",
            LogEvent::EventAppended => "EVENT_APPENDED",
            LogEvent::EventRejected => "EVENT_REJECTED",
            LogEvent::ChainBuilt => "CHAIN_BUILT",
            LogEvent::ChainRejected => "CHAIN_REJECTED",
            LogEvent::ChainWarning => "CHAIN_WARNING",
            LogEvent::ChainFlagged => "CHAIN_FLAGGED",
            LogEvent::ExecutionBegin => "EXECUTION_BEGIN",
            LogEvent::StepExecuted => "STEP_EXECUTED",
            LogEvent::ExecutionComplete => "EXECUTION_COMPLETE",
            LogEvent::ExecutionFailed => "EXECUTION_FAILED",
            LogEvent::HorizonRefined => "HORIZON_REFINED",
            LogEvent::GateDenied => "GATE_DENIED",
            LogEvent::DerivationRejected => "DERIVATION_REJECTED",
            LogEvent::RestrictivityViolation => "RESTRICTIVITY_VIOLATION",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            LogEvent::EventRejected
                | LogEvent::ChainRejected
                | LogEvent::ExecutionFailed
                | LogEvent::RestrictivityViolation
        )
    }

    /// Returns true if this event is advisory (logged at WARN)
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            LogEvent::ChainWarning | LogEvent::ChainFlagged | LogEvent::DerivationRejected
        )
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
