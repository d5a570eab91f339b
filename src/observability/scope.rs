//! ObservationScope for automatic begin/complete logging
//!
//! - Logs the begin event on creation
//! - Logs the complete event on `complete()`
//! - Logs the failed event on `fail()`
//! - Logs `SCOPE_INCOMPLETE` at WARN if dropped without either

use std::cell::Cell;
use std::time::Instant;

use super::events::LogEvent;
use super::logger::Logger;

/// A scope that logs start and completion of a unit of work
pub struct ObservationScope<'a> {
    begin: LogEvent,
    complete: LogEvent,
    failed: LogEvent,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    started: Instant,
}

impl<'a> ObservationScope<'a> {
    /// Open a scope, logging `begin` with fields repeated on every line it logs
    pub fn open(
        begin: LogEvent,
        complete: LogEvent,
        failed: LogEvent,
        fields: &[(&'a str, &str)],
    ) -> Self {
        Logger::info(begin.as_str(), fields);
        Self {
            begin,
            complete,
            failed,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        }
    }

    /// Scope around one chain execution
    pub fn execution(fields: &[(&'a str, &str)]) -> Self {
        Self::open(
            LogEvent::ExecutionBegin,
            LogEvent::ExecutionComplete,
            LogEvent::ExecutionFailed,
            fields,
        )
    }

    /// Mark the scope as completed with additional fields
    pub fn complete_with_fields(self, extra: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.started.elapsed().as_micros().to_string();
        let mut all: Vec<(&str, &str)> = self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all.extend(extra.iter().copied());
        all.push(("elapsed_us", elapsed.as_str()));
        Logger::info(self.complete.as_str(), &all);
    }

    /// Mark the scope as completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as failed
    pub fn fail(self, code: &str, reason: &str) {
        self.completed.set(true);
        let mut all: Vec<(&str, &str)> = self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all.push(("code", code));
        all.push(("reason", reason));
        Logger::error(self.failed.as_str(), &all);
    }

    /// Check if the scope has been closed
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            Logger::warn(
                "SCOPE_INCOMPLETE",
                &[
                    ("reason", "scope dropped without completion"),
                    ("scope", self.begin.as_str()),
                ],
            );
        }
    }
}
