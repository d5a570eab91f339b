//! Counters-only metrics registry
//!
//! - Monotonic counters, no gauges or histograms
//! - Exact values
//! - Injected where needed, never global

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters for chain building, execution and gating
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    chains_built: AtomicU64,
    chains_rejected: AtomicU64,
    executions: AtomicU64,
    execution_failures: AtomicU64,
    rows_emitted: AtomicU64,
    gate_checks: AtomicU64,
    gate_denials: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_chains_built(&self) {
        self.chains_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chains_rejected(&self) {
        self.chains_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished execution and the rows it produced
    pub fn record_execution(&self, rows: usize) {
        self.executions.fetch_add(1, Ordering::Relaxed);
        self.rows_emitted.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn increment_execution_failures(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one gate decision
    pub fn record_gate_check(&self, allowed: bool) {
        self.gate_checks.fetch_add(1, Ordering::Relaxed);
        if !allowed {
            self.gate_denials.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chains_built: self.chains_built.load(Ordering::Relaxed),
            chains_rejected: self.chains_rejected.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            rows_emitted: self.rows_emitted.load(Ordering::Relaxed),
            gate_checks: self.gate_checks.load(Ordering::Relaxed),
            gate_denials: self.gate_denials.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub chains_built: u64,
    pub chains_rejected: u64,
    pub executions: u64,
    pub execution_failures: u64,
    pub rows_emitted: u64,
    pub gate_checks: u64,
    pub gate_denials: u64,
}
