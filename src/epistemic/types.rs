//! Epistemic value types
//!
//! Every value here is immutable once built. Builders take `self` and return
//! a new value; nothing hands out `&mut` to internals.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{EpistemicError, EpistemicResult};

/// The epistemic classification of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpistemicType {
    /// Raw external observation
    Given,
    /// Interpretation or claim
    Meant,
    /// Computed artifact
    DerivedValue,
}

impl EpistemicType {
    pub const ALL: [EpistemicType; 3] = [
        EpistemicType::Given,
        EpistemicType::Meant,
        EpistemicType::DerivedValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EpistemicType::Given => "given",
            EpistemicType::Meant => "meant",
            EpistemicType::DerivedValue => "derived_value",
        }
    }

    /// Strict parse; unknown names are a fatal construction error
    pub fn parse(value: &str) -> EpistemicResult<Self> {
        match value {
            "given" => Ok(EpistemicType::Given),
            "meant" => Ok(EpistemicType::Meant),
            "derived_value" => Ok(EpistemicType::DerivedValue),
            other => Err(EpistemicError::unknown_epistemic_type(other)),
        }
    }
}

impl fmt::Display for EpistemicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of a grounding reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingKind {
    /// Points outside the system; Given events only
    External,
    /// Points at the source/container a value came from
    Structural,
    /// Points at an interpretation the claim relies on
    Semantic,
    /// Points at the inputs of a computation
    Computational,
    /// Points at an assessment of confidence or status
    Epistemic,
}

impl GroundingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroundingKind::External => "external",
            GroundingKind::Structural => "structural",
            GroundingKind::Semantic => "semantic",
            GroundingKind::Computational => "computational",
            GroundingKind::Epistemic => "epistemic",
        }
    }

    /// Strict parse; unknown kinds are a fatal construction error
    pub fn parse(value: &str) -> EpistemicResult<Self> {
        match value {
            "external" => Ok(GroundingKind::External),
            "structural" => Ok(GroundingKind::Structural),
            "semantic" => Ok(GroundingKind::Semantic),
            "computational" => Ok(GroundingKind::Computational),
            "epistemic" => Ok(GroundingKind::Epistemic),
            other => Err(EpistemicError::unknown_grounding_kind(other)),
        }
    }
}

impl fmt::Display for GroundingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed pointer from one event to another
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroundingRef {
    event_id: String,
    kind: GroundingKind,
}

impl GroundingRef {
    pub fn new(event_id: impl Into<String>, kind: GroundingKind) -> Self {
        Self {
            event_id: event_id.into(),
            kind,
        }
    }

    pub fn external(event_id: impl Into<String>) -> Self {
        Self::new(event_id, GroundingKind::External)
    }

    pub fn structural(event_id: impl Into<String>) -> Self {
        Self::new(event_id, GroundingKind::Structural)
    }

    pub fn semantic(event_id: impl Into<String>) -> Self {
        Self::new(event_id, GroundingKind::Semantic)
    }

    pub fn computational(event_id: impl Into<String>) -> Self {
        Self::new(event_id, GroundingKind::Computational)
    }

    pub fn epistemic(event_id: impl Into<String>) -> Self {
        Self::new(event_id, GroundingKind::Epistemic)
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn kind(&self) -> GroundingKind {
        self.kind
    }
}

/// How a value was computed: operators applied, named inputs, frozen parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Derivation {
    operators: Vec<String>,
    inputs: BTreeMap<String, String>,
    #[serde(default)]
    parameters: BTreeMap<String, Value>,
}

impl Derivation {
    pub fn new(operators: Vec<String>) -> Self {
        Self {
            operators,
            inputs: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, event_id: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), event_id.into());
        self
    }

    /// Freeze a parameter value into the derivation record
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn operators(&self) -> &[String] {
        &self.operators
    }

    pub fn inputs(&self) -> &BTreeMap<String, String> {
        &self.inputs
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }
}

/// Ordered set of typed references plus an optional derivation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Grounding {
    #[serde(default)]
    references: Vec<GroundingRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    derivation: Option<Derivation>,
}

impl Grounding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference; a duplicate (same id and kind) keeps its first position
    pub fn with_reference(mut self, reference: GroundingRef) -> Self {
        if !self.references.contains(&reference) {
            self.references.push(reference);
        }
        self
    }

    pub fn with_references(self, references: impl IntoIterator<Item = GroundingRef>) -> Self {
        references
            .into_iter()
            .fold(self, |grounding, r| grounding.with_reference(r))
    }

    pub fn with_derivation(mut self, derivation: Derivation) -> Self {
        self.derivation = Some(derivation);
        self
    }

    pub fn references(&self) -> &[GroundingRef] {
        &self.references
    }

    pub fn derivation(&self) -> Option<&Derivation> {
        self.derivation.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn has_kind(&self, kind: GroundingKind) -> bool {
        self.references.iter().any(|r| r.kind == kind)
    }

    /// Referenced event ids in order, without duplicates
    pub fn event_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::with_capacity(self.references.len());
        for r in &self.references {
            if !ids.contains(&r.event_id.as_str()) {
                ids.push(&r.event_id);
            }
        }
        ids
    }
}

/// Status of a Meant claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpistemicStatus {
    #[default]
    Preliminary,
    Confirmed,
    Disputed,
}

impl EpistemicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpistemicStatus::Preliminary => "preliminary",
            EpistemicStatus::Confirmed => "confirmed",
            EpistemicStatus::Disputed => "disputed",
        }
    }
}

/// Framing of a Meant event.
///
/// Confidence is never inlined: `confidence_ref` points at the event holding
/// the assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    claim: String,
    #[serde(default)]
    status: EpistemicStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence_ref: Option<String>,
    #[serde(default)]
    caveats: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
}

impl Frame {
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            status: EpistemicStatus::Preliminary,
            confidence_ref: None,
            caveats: Vec::new(),
            purpose: None,
        }
    }

    pub fn with_status(mut self, status: EpistemicStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_confidence_ref(mut self, event_id: impl Into<String>) -> Self {
        self.confidence_ref = Some(event_id.into());
        self
    }

    pub fn with_caveat(mut self, caveat: impl Into<String>) -> Self {
        self.caveats.push(caveat.into());
        self
    }

    /// The purpose this frame serves; horizons filter Meant events on it
    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn claim(&self) -> &str {
        &self.claim
    }

    pub fn status(&self) -> EpistemicStatus {
        self.status
    }

    pub fn confidence_ref(&self) -> Option<&str> {
        self.confidence_ref.as_deref()
    }

    pub fn caveats(&self) -> &[String] {
        &self.caveats
    }

    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }
}

/// Why one event replaces another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupersessionType {
    Correction,
    Refinement,
    Retraction,
}

impl SupersessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupersessionType::Correction => "correction",
            SupersessionType::Refinement => "refinement",
            SupersessionType::Retraction => "retraction",
        }
    }
}

/// Supersession link carried by the newer event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supersession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supersedes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    superseded_by: Option<String>,
    #[serde(rename = "type")]
    kind: SupersessionType,
    reason: String,
}

impl Supersession {
    /// Link pointing back at the event being replaced
    pub fn supersedes(
        event_id: impl Into<String>,
        kind: SupersessionType,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            supersedes: Some(event_id.into()),
            superseded_by: None,
            kind,
            reason: reason.into(),
        }
    }

    /// Link pointing forward at the replacing event (used on imported records)
    pub fn superseded_by(
        event_id: impl Into<String>,
        kind: SupersessionType,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            supersedes: None,
            superseded_by: Some(event_id.into()),
            kind,
            reason: reason.into(),
        }
    }

    pub fn supersedes_id(&self) -> Option<&str> {
        self.supersedes.as_deref()
    }

    pub fn superseded_by_id(&self) -> Option<&str> {
        self.superseded_by.as_deref()
    }

    pub fn kind(&self) -> SupersessionType {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epistemic_type_parse_round_trip() {
        for t in EpistemicType::ALL {
            assert_eq!(EpistemicType::parse(t.as_str()).unwrap(), t);
        }
        assert!(EpistemicType::parse("opinion").is_err());
    }

    #[test]
    fn test_grounding_kind_unknown_is_fatal() {
        let err = GroundingKind::parse("vibes").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_grounding_is_ordered_set() {
        let g = Grounding::new()
            .with_reference(GroundingRef::structural("a"))
            .with_reference(GroundingRef::semantic("b"))
            .with_reference(GroundingRef::structural("a"));
        assert_eq!(g.references().len(), 2);
        assert_eq!(g.references()[0].event_id(), "a");
        assert!(g.has_kind(GroundingKind::Semantic));
        assert!(!g.has_kind(GroundingKind::External));
    }

    #[test]
    fn test_event_ids_dedupe_across_kinds() {
        let g = Grounding::new()
            .with_reference(GroundingRef::structural("a"))
            .with_reference(GroundingRef::semantic("a"));
        assert_eq!(g.event_ids(), vec!["a"]);
    }

    #[test]
    fn test_supersession_serializes_type_key() {
        let s = Supersession::supersedes("e1", SupersessionType::Correction, "typo");
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["type"], "correction");
        assert_eq!(v["supersedes"], "e1");
    }
}
