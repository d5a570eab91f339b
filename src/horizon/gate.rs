//! The gate: the single visibility predicate under a horizon
//!
//! Every read through a horizon goes via `HorizonGate`. An event is available
//! only if all of the following hold:
//! - its workspace is allowed
//! - its actor is allowed
//! - for Meant events carrying a frame, the frame purpose is allowed
//! - its timestamp lies in the time range
//! - the horizon's required tags are a subset of the event's tags

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::epistemic::Event;
use crate::observability::{log_event, LogEvent, Logger, MetricsRegistry};

use super::horizon::Horizon;

/// Supplies events to a gate
pub trait EventProvider {
    fn events(&self) -> Vec<&Event>;

    fn given_events(&self) -> Vec<&Event> {
        self.events().into_iter().filter(|e| e.is_given()).collect()
    }

    fn meant_events(&self) -> Vec<&Event> {
        self.events().into_iter().filter(|e| e.is_meant()).collect()
    }

    /// A single event, or `None` if absent
    fn event(&self, id: &str) -> Option<&Event>;
}

/// Which gate dimension refused an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    Workspace,
    Actor,
    Frame,
    Time,
    Tags,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::Workspace => "workspace",
            DenialReason::Actor => "actor",
            DenialReason::Frame => "frame",
            DenialReason::Time => "time",
            DenialReason::Tags => "tags",
        }
    }
}

/// Why a derivation was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "event_id", rename_all = "snake_case")]
pub enum DerivationFailure {
    /// A premise is not visible under this horizon
    PremiseUnavailable(String),
    /// A provenance reference does not resolve to any event
    ProvenanceUnresolved(String),
    /// A provenance reference resolves but is not visible
    ProvenanceUnavailable(String),
}

impl DerivationFailure {
    pub fn event_id(&self) -> &str {
        match self {
            DerivationFailure::PremiseUnavailable(id)
            | DerivationFailure::ProvenanceUnresolved(id)
            | DerivationFailure::ProvenanceUnavailable(id) => id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DerivationFailure::PremiseUnavailable(_) => "premise_unavailable",
            DerivationFailure::ProvenanceUnresolved(_) => "provenance_unresolved",
            DerivationFailure::ProvenanceUnavailable(_) => "provenance_unavailable",
        }
    }
}

impl fmt::Display for DerivationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.event_id())
    }
}

/// Outcome of a coherence check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DerivationCheck {
    Valid,
    Rejected { failure: DerivationFailure },
}

impl DerivationCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, DerivationCheck::Valid)
    }

    pub fn failure(&self) -> Option<&DerivationFailure> {
        match self {
            DerivationCheck::Valid => None,
            DerivationCheck::Rejected { failure } => Some(failure),
        }
    }
}

pub struct HorizonGate<'a, P: EventProvider> {
    horizon: &'a Horizon,
    provider: &'a P,
    metrics: Option<&'a MetricsRegistry>,
}

impl<'a, P: EventProvider> HorizonGate<'a, P> {
    pub fn new(horizon: &'a Horizon, provider: &'a P) -> Self {
        Self {
            horizon,
            provider,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: &'a MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn horizon(&self) -> &Horizon {
        self.horizon
    }

    /// Explains a refusal: the first gate dimension that rejects the event.
    ///
    /// Never use this to decide visibility; that is `is_available`.
    pub fn denial_reason(&self, event: &Event) -> Option<DenialReason> {
        let h = self.horizon;
        if !h.workspaces().allows_opt(event.workspace()) {
            return Some(DenialReason::Workspace);
        }
        if !h.actors().allows(event.actor()) {
            return Some(DenialReason::Actor);
        }
        if event.is_meant() {
            if let Some(frame) = event.frame() {
                if !h.frames().allows_opt(frame.purpose()) {
                    return Some(DenialReason::Frame);
                }
            }
        }
        if let Some(range) = h.time_range() {
            if !range.contains(event.timestamp()) {
                return Some(DenialReason::Time);
            }
        }
        if !h.tags().is_subset(event.tags()) {
            return Some(DenialReason::Tags);
        }
        None
    }

    pub fn is_available(&self, event: &Event) -> bool {
        let denial = self.denial_reason(event);
        if let Some(metrics) = self.metrics {
            metrics.record_gate_check(denial.is_none());
        }
        if let Some(reason) = denial {
            Logger::trace(
                LogEvent::GateDenied.as_str(),
                &[
                    ("event_id", event.id()),
                    ("horizon", self.horizon.id()),
                    ("reason", reason.as_str()),
                ],
            );
        }
        denial.is_none()
    }

    pub fn available_events(&self) -> Vec<&'a Event> {
        self.provider
            .events()
            .into_iter()
            .filter(|e| self.is_available(e))
            .collect()
    }

    pub fn given(&self) -> Vec<&'a Event> {
        self.provider
            .given_events()
            .into_iter()
            .filter(|e| self.is_available(e))
            .collect()
    }

    pub fn meant(&self) -> Vec<&'a Event> {
        self.provider
            .meant_events()
            .into_iter()
            .filter(|e| self.is_available(e))
            .collect()
    }

    /// An event by id, or `None` if absent or not visible
    pub fn get(&self, id: &str) -> Option<&'a Event> {
        self.provider.event(id).filter(|e| self.is_available(e))
    }

    pub fn available_ids(&self) -> HashSet<&'a str> {
        self.available_events().into_iter().map(|e| e.id()).collect()
    }

    /// Coherence: every premise must be available, and every provenance
    /// reference of the conclusion that is not a premise must resolve and be
    /// available on its own.
    pub fn is_valid_derivation(&self, premises: &[&Event], conclusion: &Event) -> DerivationCheck {
        let check = self.check_derivation(premises, conclusion);
        if let DerivationCheck::Rejected { failure } = &check {
            log_event(
                LogEvent::DerivationRejected,
                &[
                    ("conclusion", conclusion.id()),
                    ("event_id", failure.event_id()),
                    ("horizon", self.horizon.id()),
                    ("reason", failure.as_str()),
                ],
            );
        }
        check
    }

    fn check_derivation(&self, premises: &[&Event], conclusion: &Event) -> DerivationCheck {
        for premise in premises {
            if !self.is_available(premise) {
                return DerivationCheck::Rejected {
                    failure: DerivationFailure::PremiseUnavailable(premise.id().to_string()),
                };
            }
        }

        let premise_ids: HashSet<&str> = premises.iter().map(|p| p.id()).collect();
        let grounding = conclusion.grounding();
        let mut provenance: Vec<&str> = grounding.event_ids();
        if let Some(derivation) = grounding.derivation() {
            for input in derivation.inputs().values() {
                if !provenance.contains(&input.as_str()) {
                    provenance.push(input);
                }
            }
        }

        for id in provenance {
            if premise_ids.contains(id) {
                continue;
            }
            match self.provider.event(id) {
                None => {
                    return DerivationCheck::Rejected {
                        failure: DerivationFailure::ProvenanceUnresolved(id.to_string()),
                    }
                }
                Some(event) if !self.is_available(event) => {
                    return DerivationCheck::Rejected {
                        failure: DerivationFailure::ProvenanceUnavailable(id.to_string()),
                    }
                }
                Some(_) => {}
            }
        }
        DerivationCheck::Valid
    }
}
