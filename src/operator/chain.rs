//! Operator invocations and chains
//!
//! A chain is an ordered list of invocations plus chain-level grounding and
//! frame. Its structural form is plain JSON and round-trips exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::epistemic::{EpistemicType, Frame, Grounding};

use super::catalog::OperatorKind;
use super::errors::{OperatorError, OperatorResult};
use super::params::{OperatorParams, TemporalParams};

/// One configured step in a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorInvocation {
    id: String,
    params: OperatorParams,
    produces: EpistemicType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grounding: Option<Grounding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

impl OperatorInvocation {
    pub fn new(id: impl Into<String>, params: OperatorParams, produces: EpistemicType) -> Self {
        Self {
            id: id.into(),
            params,
            produces,
            grounding: None,
            output: None,
        }
    }

    pub fn with_grounding(mut self, grounding: Grounding) -> Self {
        self.grounding = Some(grounding);
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operator(&self) -> OperatorKind {
        self.params.kind()
    }

    pub fn params(&self) -> &OperatorParams {
        &self.params
    }

    pub fn produces(&self) -> EpistemicType {
        self.produces
    }

    pub fn grounding(&self) -> Option<&Grounding> {
        self.grounding.as_ref()
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}

/// Ordered operator invocations with chain-level grounding and frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperatorChain {
    #[serde(default)]
    invocations: Vec<OperatorInvocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grounding: Option<Grounding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    frame: Option<Frame>,
}

impl OperatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an invocation, returning the extended chain
    pub fn push(mut self, invocation: OperatorInvocation) -> Self {
        self.invocations.push(invocation);
        self
    }

    pub fn with_grounding(mut self, grounding: Grounding) -> Self {
        self.grounding = Some(grounding);
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn invocations(&self) -> &[OperatorInvocation] {
        &self.invocations
    }

    pub fn grounding(&self) -> Option<&Grounding> {
        self.grounding.as_ref()
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }

    pub fn kinds(&self) -> Vec<OperatorKind> {
        self.invocations.iter().map(|i| i.operator()).collect()
    }

    pub fn contains(&self, kind: OperatorKind) -> bool {
        self.invocations.iter().any(|i| i.operator() == kind)
    }

    /// Overall produced type; any compute step forces derived_value
    pub fn produced_type(&self) -> EpistemicType {
        OperatorKind::chain_produced_type(&self.kinds())
    }

    /// Temporal contexts in chain order
    pub fn temporal_contexts(&self) -> Vec<&TemporalParams> {
        self.invocations
            .iter()
            .filter_map(|i| match i.params() {
                OperatorParams::Project(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Replaces every static "now" projection with `instant`; dynamic ones
    /// keep resolving per execution
    pub fn freeze_temporal(mut self, instant: DateTime<Utc>) -> Self {
        for invocation in &mut self.invocations {
            if let OperatorParams::Project(temporal) = &mut invocation.params {
                *temporal = temporal.clone().freeze(instant);
            }
        }
        self
    }

    /// Plain structural form
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Reads a chain from its structural form.
    ///
    /// Only decoding is checked here; rule validation is the validator's job.
    pub fn from_value(value: &Value) -> OperatorResult<Self> {
        serde_json::from_value(value.clone()).map_err(|e| OperatorError::chain_decode(e.to_string()))
    }
}
