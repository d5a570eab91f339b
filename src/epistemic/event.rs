//! The immutable, append-only event record
//!
//! Events are never mutated. Supersession produces a new event that points
//! back at the old one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{EpistemicError, EpistemicResult};
use super::types::{
    Derivation, EpistemicType, Frame, Grounding, GroundingKind, GroundingRef, Supersession,
    SupersessionType,
};

/// A single epistemic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: String,
    epistemic_type: EpistemicType,
    timestamp: DateTime<Utc>,
    actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    workspace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<String>,
    #[serde(default)]
    grounding: Grounding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    frame: Option<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supersession: Option<Supersession>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    payload: Value,
}

impl Event {
    /// Creates an event with empty grounding.
    ///
    /// # Errors
    ///
    /// `NOEMA_MISSING_EVENT_ID` if `id` is empty.
    pub fn new(
        id: impl Into<String>,
        epistemic_type: EpistemicType,
        timestamp: DateTime<Utc>,
        actor: impl Into<String>,
    ) -> EpistemicResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EpistemicError::missing_event_id());
        }
        Ok(Self {
            id,
            epistemic_type,
            timestamp,
            actor: actor.into(),
            workspace: None,
            tags: BTreeSet::new(),
            grounding: Grounding::new(),
            frame: None,
            supersession: None,
            payload: Value::Null,
        })
    }

    pub fn given(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        actor: impl Into<String>,
    ) -> EpistemicResult<Self> {
        Self::new(id, EpistemicType::Given, timestamp, actor)
    }

    pub fn meant(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        actor: impl Into<String>,
        frame: Frame,
    ) -> EpistemicResult<Self> {
        Ok(Self::new(id, EpistemicType::Meant, timestamp, actor)?.with_frame(frame))
    }

    pub fn derived(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        actor: impl Into<String>,
    ) -> EpistemicResult<Self> {
        Self::new(id, EpistemicType::DerivedValue, timestamp, actor)
    }

    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_grounding(mut self, grounding: Grounding) -> Self {
        self.grounding = grounding;
        self
    }

    pub fn with_reference(mut self, reference: GroundingRef) -> Self {
        self.grounding = self.grounding.with_reference(reference);
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_supersession(mut self, supersession: Supersession) -> Self {
        self.supersession = Some(supersession);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn epistemic_type(&self) -> EpistemicType {
        self.epistemic_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn grounding(&self) -> &Grounding {
        &self.grounding
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn supersession(&self) -> Option<&Supersession> {
        self.supersession.as_ref()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn is_given(&self) -> bool {
        self.epistemic_type == EpistemicType::Given
    }

    pub fn is_meant(&self) -> bool {
        self.epistemic_type == EpistemicType::Meant
    }

    /// Builds the event that supersedes this one. `self` is left untouched.
    ///
    /// # Errors
    ///
    /// `NOEMA_SUPERSESSION_INVALID` if this is a Given event; observations
    /// are never superseded.
    pub fn supersede(
        &self,
        new_id: impl Into<String>,
        kind: SupersessionType,
        reason: impl Into<String>,
        actor: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> EpistemicResult<Event> {
        if self.is_given() {
            return Err(EpistemicError::supersession_invalid(
                &self.id,
                "Given events cannot be superseded",
            ));
        }
        let mut next = self.clone();
        next.id = new_id.into();
        if next.id.trim().is_empty() {
            return Err(EpistemicError::missing_event_id());
        }
        next.actor = actor.into();
        next.timestamp = timestamp;
        next.supersession = Some(Supersession::supersedes(&self.id, kind, reason));
        Ok(next)
    }

    /// Plain structural form
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Strict decoding from a plain structural form.
    ///
    /// Unknown epistemic types, unknown grounding kinds and a missing id fail
    /// immediately with their own codes rather than being dropped.
    pub fn from_value(value: &Value) -> EpistemicResult<Event> {
        let obj = value
            .as_object()
            .ok_or_else(|| EpistemicError::event_invalid("", "event must be a JSON object"))?;

        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(EpistemicError::missing_event_id)?;

        let type_name = required_str(obj, "epistemic_type")?;
        let epistemic_type = EpistemicType::parse(type_name)?;

        let raw_ts = required_str(obj, "timestamp")?;
        let timestamp = DateTime::parse_from_rfc3339(raw_ts)
            .map_err(|e| {
                EpistemicError::event_invalid(id, format!("invalid timestamp '{}': {}", raw_ts, e))
            })?
            .with_timezone(&Utc);

        let actor = required_str(obj, "actor")?;

        let mut event = Event::new(id, epistemic_type, timestamp, actor)?;

        match obj.get("workspace") {
            None | Some(Value::Null) => {}
            Some(Value::String(ws)) => event = event.with_workspace(ws),
            Some(_) => return Err(EpistemicError::event_invalid(id, "workspace must be a string")),
        }

        match obj.get("tags") {
            None | Some(Value::Null) => {}
            Some(Value::Array(tags)) => {
                for (i, tag) in tags.iter().enumerate() {
                    let tag = tag.as_str().ok_or_else(|| {
                        EpistemicError::event_invalid(id, format!("tags[{}] must be a string", i))
                    })?;
                    event = event.with_tag(tag);
                }
            }
            Some(_) => return Err(EpistemicError::event_invalid(id, "tags must be an array")),
        }

        if let Some(grounding) = obj.get("grounding") {
            event = event.with_grounding(decode_grounding(id, grounding)?);
        }

        if let Some(frame) = obj.get("frame").filter(|v| !v.is_null()) {
            let frame: Frame = serde_json::from_value(frame.clone())
                .map_err(|e| EpistemicError::event_invalid(id, format!("invalid frame: {}", e)))?;
            event = event.with_frame(frame);
        }

        if let Some(sup) = obj.get("supersession").filter(|v| !v.is_null()) {
            let sup: Supersession = serde_json::from_value(sup.clone()).map_err(|e| {
                EpistemicError::event_invalid(id, format!("invalid supersession: {}", e))
            })?;
            event = event.with_supersession(sup);
        }

        if let Some(payload) = obj.get("payload") {
            event = event.with_payload(payload.clone());
        }

        Ok(event)
    }
}

fn required_str<'v>(obj: &'v Map<String, Value>, field: &str) -> EpistemicResult<&'v str> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| EpistemicError::missing_field(field))
}

fn decode_grounding(event_id: &str, value: &Value) -> EpistemicResult<Grounding> {
    let mut grounding = Grounding::new();
    if value.is_null() {
        return Ok(grounding);
    }

    let refs = value
        .get("references")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for (i, r) in refs.iter().enumerate() {
        let ref_id = r
            .get("event_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                EpistemicError::missing_field(&format!("grounding.references[{}].event_id", i))
            })?;
        let kind_name = r.get("kind").and_then(Value::as_str).ok_or_else(|| {
            EpistemicError::missing_field(&format!("grounding.references[{}].kind", i))
        })?;
        let kind = GroundingKind::parse(kind_name)?;
        grounding = grounding.with_reference(GroundingRef::new(ref_id, kind));
    }

    if let Some(derivation) = value.get("derivation").filter(|v| !v.is_null()) {
        let derivation: Derivation = serde_json::from_value(derivation.clone()).map_err(|e| {
            EpistemicError::event_invalid(event_id, format!("invalid derivation: {}", e))
        })?;
        grounding = grounding.with_derivation(derivation);
    }

    Ok(grounding)
}
