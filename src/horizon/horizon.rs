//! Immutable perspectival scopes
//!
//! A Horizon is never mutated. `refine` returns a new Horizon that is
//! narrower-or-equal to its parent in every dimension:
//! - allow-lists are intersected
//! - the time range is the interval intersection
//! - required tags are unioned
//! - the granularity may only move down the ladder; broader requests clamp

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::types::{HorizonType, Scope, TimeRange};

pub const TOP_HORIZON_ID: &str = "horizon:top";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Horizon {
    id: String,
    horizon_type: HorizonType,
    name: String,
    workspaces: Scope,
    actors: Scope,
    frames: Scope,
    time_range: Option<TimeRange>,
    tags: BTreeSet<String>,
    parent: Option<String>,
}

/// What a refinement asks for; unset dimensions are inherited
#[derive(Debug, Clone, Default)]
pub struct RefinementRequest {
    id: String,
    name: String,
    horizon_type: Option<HorizonType>,
    workspaces: Scope,
    actors: Scope,
    frames: Scope,
    time_range: Option<TimeRange>,
    tags: BTreeSet<String>,
}

impl RefinementRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn horizon_type(mut self, horizon_type: HorizonType) -> Self {
        self.horizon_type = Some(horizon_type);
        self
    }

    pub fn workspaces<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.workspaces = Scope::only(values);
        self
    }

    pub fn actors<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.actors = Scope::only(values);
        self
    }

    pub fn frames<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.frames = Scope::only(values);
        self
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

impl Horizon {
    /// The synthetic unrestricted root of every lattice
    pub fn top() -> Self {
        Self {
            id: TOP_HORIZON_ID.to_string(),
            horizon_type: HorizonType::Global,
            name: "top".to_string(),
            workspaces: Scope::Unrestricted,
            actors: Scope::Unrestricted,
            frames: Scope::Unrestricted,
            time_range: None,
            tags: BTreeSet::new(),
            parent: None,
        }
    }

    pub fn is_top(&self) -> bool {
        self.id == TOP_HORIZON_ID
    }

    /// Derive a narrower-or-equal child
    pub fn refine(&self, request: RefinementRequest) -> Horizon {
        let time_range = match (self.time_range, request.time_range) {
            (Some(a), Some(b)) => Some(a.intersect(&b)),
            (a, b) => a.or(b),
        };
        Horizon {
            id: request.id,
            horizon_type: request
                .horizon_type
                .map_or(self.horizon_type, |t| t.clamp_to(self.horizon_type)),
            name: request.name,
            workspaces: self.workspaces.intersect(&request.workspaces),
            actors: self.actors.intersect(&request.actors),
            frames: self.frames.intersect(&request.frames),
            time_range,
            tags: self.tags.union(&request.tags).cloned().collect(),
            parent: Some(self.id.clone()),
        }
    }

    /// Structural ⊑ check, independent of how either horizon was built
    pub fn is_refinement_of(&self, other: &Horizon) -> bool {
        let time_ok = match (&self.time_range, &other.time_range) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(mine), Some(theirs)) => mine.within(theirs),
        };
        self.horizon_type.is_narrower_or_equal(other.horizon_type)
            && self.workspaces.is_subset_of(&other.workspaces)
            && self.actors.is_subset_of(&other.actors)
            && self.frames.is_subset_of(&other.frames)
            && time_ok
            && other.tags.is_subset(&self.tags)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn horizon_type(&self) -> HorizonType {
        self.horizon_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workspaces(&self) -> &Scope {
        &self.workspaces
    }

    pub fn actors(&self) -> &Scope {
        &self.actors
    }

    pub fn frames(&self) -> &Scope {
        &self.frames
    }

    pub fn time_range(&self) -> Option<&TimeRange> {
        self.time_range.as_ref()
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn to_descriptor(&self) -> HorizonDescriptor {
        HorizonDescriptor {
            id: self.id.clone(),
            horizon_type: self.horizon_type,
            name: self.name.clone(),
            workspaces: self.workspaces.to_list(),
            actors: self.actors.to_list(),
            frames: self.frames.to_list(),
            time_range: self.time_range,
            tags: self.tags.iter().cloned().collect(),
            parent: self.parent.clone(),
        }
    }

    /// Rebuild from a descriptor; a missing parent means the top element
    pub fn from_descriptor(descriptor: HorizonDescriptor) -> Horizon {
        Horizon {
            id: descriptor.id,
            horizon_type: descriptor.horizon_type,
            name: descriptor.name,
            workspaces: Scope::from_list(descriptor.workspaces),
            actors: Scope::from_list(descriptor.actors),
            frames: Scope::from_list(descriptor.frames),
            time_range: descriptor.time_range,
            tags: descriptor.tags.into_iter().collect(),
            parent: Some(descriptor.parent.unwrap_or_else(|| TOP_HORIZON_ID.to_string())),
        }
    }
}

/// Plain persisted form of a horizon. Allow-lists are `null` when unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub horizon_type: HorizonType,
    pub name: String,
    #[serde(default)]
    pub workspaces: Option<Vec<String>>,
    #[serde(default)]
    pub actors: Option<Vec<String>>,
    #[serde(default)]
    pub frames: Option<Vec<String>>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parent: Option<String>,
}
