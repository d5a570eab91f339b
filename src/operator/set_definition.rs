//! Built, named result of a validated chain
//!
//! A SetDefinition is the only thing that leaves the builder. It can emit a
//! single Meant "set defined" event whose derivation mirrors the chain.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::epistemic::{
    Derivation, EpistemicResult, EpistemicType, Event, Frame, Grounding, GroundingRef,
};

use super::catalog::OperatorKind;
use super::chain::OperatorChain;
use super::params::{OperatorParams, TemporalParams};
use super::validator::ChainIssue;

/// Classification of what a chain does, by its operator mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetStrategy {
    Direct,
    Filtered,
    Joined,
    Synthesized,
    Absence,
    Aggregated,
}

impl SetStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetStrategy::Direct => "direct",
            SetStrategy::Filtered => "filtered",
            SetStrategy::Joined => "joined",
            SetStrategy::Synthesized => "synthesized",
            SetStrategy::Absence => "absence",
            SetStrategy::Aggregated => "aggregated",
        }
    }

    /// Most significant operator wins
    pub fn classify(chain: &OperatorChain) -> Self {
        if chain.contains(OperatorKind::Aggregate) {
            SetStrategy::Aggregated
        } else if chain.contains(OperatorKind::AssertAbsence) {
            SetStrategy::Absence
        } else if chain.contains(OperatorKind::Connect) {
            SetStrategy::Joined
        } else if chain.contains(OperatorKind::Synthesize) {
            SetStrategy::Synthesized
        } else if chain.contains(OperatorKind::Restrict) {
            SetStrategy::Filtered
        } else {
            SetStrategy::Direct
        }
    }
}

impl fmt::Display for SetStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetDefinition {
    id: String,
    name: String,
    chain: OperatorChain,
    source_refs: Vec<String>,
    strategy: SetStrategy,
    temporal: Vec<TemporalParams>,
    produced_type: EpistemicType,
    fingerprint: String,
    created_at: DateTime<Utc>,
    warnings: Vec<ChainIssue>,
}

impl SetDefinition {
    /// Wraps a chain that has already passed validation
    pub(crate) fn from_chain(chain: OperatorChain, warnings: Vec<ChainIssue>) -> Self {
        let created_at = Utc::now();
        let chain = chain.freeze_temporal(created_at);
        let name = chain
            .invocations()
            .iter()
            .rev()
            .find_map(|i| match i.params() {
                OperatorParams::Designate(d) => Some(d.name.clone()),
                _ => None,
            })
            .unwrap_or_default();

        let mut source_refs: Vec<String> = Vec::new();
        for invocation in chain.invocations() {
            let source = match invocation.params() {
                OperatorParams::Entry(e) => &e.source_id,
                OperatorParams::Connect(j) => &j.right_source,
                OperatorParams::AssertAbsence(a) => &a.target_source,
                _ => continue,
            };
            if !source_refs.contains(source) {
                source_refs.push(source.clone());
            }
        }

        Self {
            id: format!("set-{}", Uuid::new_v4()),
            name,
            strategy: SetStrategy::classify(&chain),
            temporal: chain.temporal_contexts().into_iter().cloned().collect(),
            produced_type: chain.produced_type(),
            fingerprint: fingerprint(&chain),
            source_refs,
            created_at,
            warnings,
            chain,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain(&self) -> &OperatorChain {
        &self.chain
    }

    /// Every source the chain reads, in first-use order
    pub fn source_refs(&self) -> &[String] {
        &self.source_refs
    }

    /// Sources asserted by entry operators
    pub fn entry_sources(&self) -> Vec<(&str, Option<&str>)> {
        self.chain
            .invocations()
            .iter()
            .filter_map(|i| match i.params() {
                OperatorParams::Entry(e) => Some((e.source_id.as_str(), e.alias.as_deref())),
                _ => None,
            })
            .collect()
    }

    pub fn strategy(&self) -> SetStrategy {
        self.strategy
    }

    pub fn temporal_context(&self) -> &[TemporalParams] {
        &self.temporal
    }

    pub fn produced_type(&self) -> EpistemicType {
        self.produced_type
    }

    /// Hex SHA-256 of the chain's structural form
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Advisory issues found while building
    pub fn warnings(&self) -> &[ChainIssue] {
        &self.warnings
    }

    /// The "set defined" event for this definition.
    ///
    /// References are structural references to every entry source; the
    /// derivation lists the chain's operators and freezes its parameters.
    pub fn to_event(&self, actor: &str, timestamp: DateTime<Utc>) -> EpistemicResult<Event> {
        let operators = self
            .chain
            .kinds()
            .iter()
            .map(|k| k.as_str().to_string())
            .collect();
        let mut derivation = Derivation::new(operators)
            .with_parameter("fingerprint", Value::String(self.fingerprint.clone()))
            .with_parameter("chain", self.chain.to_value())
            .with_parameter("strategy", Value::String(self.strategy.as_str().to_string()))
            .with_parameter(
                "produced_type",
                Value::String(self.produced_type.as_str().to_string()),
            );

        let mut grounding = Grounding::new();
        for (source, alias) in self.entry_sources() {
            derivation = derivation.with_input(alias.unwrap_or(source), source);
            grounding = grounding.with_reference(GroundingRef::structural(source));
        }

        let frame = self
            .chain
            .frame()
            .cloned()
            .unwrap_or_else(|| Frame::new(format!("set '{}' is defined by its chain", self.name)));

        Ok(Event::meant(format!("evt-{}", Uuid::new_v4()), timestamp, actor, frame)?
            .with_tag("set_defined")
            .with_grounding(grounding.with_derivation(derivation))
            .with_payload(json!({
                "set_id": self.id,
                "name": self.name,
                "strategy": self.strategy.as_str(),
                "source_refs": self.source_refs,
            })))
    }
}

fn fingerprint(chain: &OperatorChain) -> String {
    let canonical = serde_json::to_vec(&chain.to_value()).unwrap_or_default();
    format!("{:x}", Sha256::digest(&canonical))
}
