//! Observability subsystem
//!
//! - Structured JSON logging
//! - Typed lifecycle events
//! - Scope-based begin/complete logging
//! - Counters-only metrics
//!
//! Observability is read-only: it never changes the outcome of validation,
//! execution or gating.

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::LogEvent;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log a lifecycle event with fields, picking severity from the event kind
pub fn log_event(event: LogEvent, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Error
    } else if event.is_advisory() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_does_not_panic() {
        log_event(LogEvent::ChainBuilt, &[("name", "people")]);
        log_event(LogEvent::ChainRejected, &[("issues", "2")]);
        log_event(LogEvent::ChainWarning, &[]);
    }
}
