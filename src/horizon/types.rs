//! Horizon dimensions: granularity ladder, allow-list scopes, time range

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Granularity rungs, broadest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HorizonType {
    Global,
    Workspace,
    Project,
    Session,
    View,
    Moment,
}

impl HorizonType {
    pub const LADDER: [HorizonType; 6] = [
        HorizonType::Global,
        HorizonType::Workspace,
        HorizonType::Project,
        HorizonType::Session,
        HorizonType::View,
        HorizonType::Moment,
    ];

    /// Position on the ladder; higher is narrower
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn is_narrower_or_equal(&self, other: HorizonType) -> bool {
        self.rank() >= other.rank()
    }

    /// The narrower of the two rungs
    pub fn clamp_to(&self, parent: HorizonType) -> HorizonType {
        if self.is_narrower_or_equal(parent) {
            *self
        } else {
            parent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HorizonType::Global => "GLOBAL",
            HorizonType::Workspace => "WORKSPACE",
            HorizonType::Project => "PROJECT",
            HorizonType::Session => "SESSION",
            HorizonType::View => "VIEW",
            HorizonType::Moment => "MOMENT",
        }
    }
}

impl fmt::Display for HorizonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An allow-list dimension
///
/// `Unrestricted` admits everything. `Only` admits its members; an empty
/// `Only` admits nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Unrestricted,
    Only(BTreeSet<String>),
}

impl Scope {
    pub fn only<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Scope::Only(values.into_iter().map(Into::into).collect())
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Scope::Unrestricted)
    }

    pub fn allows(&self, value: &str) -> bool {
        match self {
            Scope::Unrestricted => true,
            Scope::Only(set) => set.contains(value),
        }
    }

    /// Membership for an optional value; a missing value only passes an
    /// unrestricted scope
    pub fn allows_opt(&self, value: Option<&str>) -> bool {
        match value {
            Some(v) => self.allows(v),
            None => self.is_unrestricted(),
        }
    }

    /// Narrowing; an unrestricted side adopts the other side's list
    pub fn intersect(&self, other: &Scope) -> Scope {
        match (self, other) {
            (Scope::Unrestricted, x) | (x, Scope::Unrestricted) => x.clone(),
            (Scope::Only(a), Scope::Only(b)) => Scope::Only(a.intersection(b).cloned().collect()),
        }
    }

    pub fn is_subset_of(&self, other: &Scope) -> bool {
        match (self, other) {
            (_, Scope::Unrestricted) => true,
            (Scope::Unrestricted, Scope::Only(_)) => false,
            (Scope::Only(a), Scope::Only(b)) => a.is_subset(b),
        }
    }

    /// Plain form: `None` for unrestricted
    pub fn to_list(&self) -> Option<Vec<String>> {
        match self {
            Scope::Unrestricted => None,
            Scope::Only(set) => Some(set.iter().cloned().collect()),
        }
    }

    pub fn from_list(list: Option<Vec<String>>) -> Self {
        match list {
            None => Scope::Unrestricted,
            Some(values) => Scope::Only(values.into_iter().collect()),
        }
    }
}

/// Closed time interval; an open end is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn from(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }

    /// Max of starts, min of ends. May be empty (start after end).
    pub fn intersect(&self, other: &TimeRange) -> TimeRange {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        TimeRange { start, end }
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }

    /// True if this range lies inside `outer`
    pub fn within(&self, outer: &TimeRange) -> bool {
        if self.is_empty() {
            return true;
        }
        let start_ok = match (self.start, outer.start) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(s), Some(o)) => s >= o,
        };
        let end_ok = match (self.end, outer.end) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(e), Some(o)) => e <= o,
        };
        start_ok && end_ok
    }
}
