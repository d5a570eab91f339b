//! Typed per-operator configuration
//!
//! Each operator kind has its own record with explicit required and optional
//! fields. Required fields that carry epistemic weight (join conflict policy,
//! synthesis evidence, absence basis) are checked at construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::epistemic::SupersessionType;
use crate::predicate::Predicate;

use super::catalog::OperatorKind;
use super::errors::{OperatorError, OperatorResult};

/// Configuration of one chain step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum OperatorParams {
    Entry(EntryParams),
    Restrict(RestrictParams),
    Connect(JoinParams),
    Project(TemporalParams),
    Designate(DesignateParams),
    Synthesize(SynthesisParams),
    Superpose(SuperpositionParams),
    AssertAbsence(AbsenceParams),
    Aggregate(AggregateParams),
    Supersede(SupersedeParams),
}

impl OperatorParams {
    pub fn kind(&self) -> OperatorKind {
        match self {
            OperatorParams::Entry(_) => OperatorKind::Entry,
            OperatorParams::Restrict(_) => OperatorKind::Restrict,
            OperatorParams::Connect(_) => OperatorKind::Connect,
            OperatorParams::Project(_) => OperatorKind::Project,
            OperatorParams::Designate(_) => OperatorKind::Designate,
            OperatorParams::Synthesize(_) => OperatorKind::Synthesize,
            OperatorParams::Superpose(_) => OperatorKind::Superpose,
            OperatorParams::AssertAbsence(_) => OperatorKind::AssertAbsence,
            OperatorParams::Aggregate(_) => OperatorKind::Aggregate,
            OperatorParams::Supersede(_) => OperatorKind::Supersede,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryParams {
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

// ---------------------------------------------------------------------------
// Restrict
// ---------------------------------------------------------------------------

/// What a restriction does to rows that fail it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Still exists, set aside from the working set
    Hidden,
    /// Not part of this world at all
    #[default]
    Excluded,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Hidden => "hidden",
            Visibility::Excluded => "excluded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestrictMode {
    /// Project to a named subset of columns
    Select { columns: Vec<String> },
    /// Retain rows for which the predicate holds
    Filter { predicate: Predicate },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictParams {
    pub mode: RestrictMode,
    #[serde(default)]
    pub visibility: Visibility,
}

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Full => "full",
        }
    }

    /// Emits left rows without a match
    pub fn keeps_unmatched_left(&self) -> bool {
        matches!(self, JoinKind::Left | JoinKind::Full)
    }

    /// Emits right rows never matched
    pub fn keeps_unmatched_right(&self) -> bool {
        matches!(self, JoinKind::Right | JoinKind::Full)
    }
}

/// How multiple right-side matches for one left row are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// One output row per match
    ExposeAll,
    /// Exactly one match, the first under the pick order
    PickFirst,
    /// Exactly one match, the last under the pick order
    PickLast,
    /// One row carrying all matches unflattened and a multiplicity count
    Cluster,
    /// One row, each right column merged across matches
    Aggregate,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::ExposeAll => "expose_all",
            ConflictPolicy::PickFirst => "pick_first",
            ConflictPolicy::PickLast => "pick_last",
            ConflictPolicy::Cluster => "cluster",
            ConflictPolicy::Aggregate => "aggregate",
        }
    }
}

/// Ordering applied to matches before a pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickOrder {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinParams {
    pub right_source: String,
    pub left_field: String,
    pub right_field: String,
    #[serde(default)]
    pub kind: JoinKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_policy: Option<ConflictPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<PickOrder>,
}

impl JoinParams {
    /// Join on `left_field = right_field`; a conflict policy must still be set
    pub fn on(
        right_source: impl Into<String>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        Self {
            right_source: right_source.into(),
            left_field: left_field.into(),
            right_field: right_field.into(),
            kind: JoinKind::Inner,
            conflict_policy: None,
            order_by: None,
        }
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = Some(policy);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(PickOrder {
            field: field.into(),
            descending,
        });
        self
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A point in time, possibly the moving present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePoint {
    Now,
    At(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalMode {
    /// World as of a point in time
    AsOf { at: TimePoint },
    /// Events whose time falls inside a window
    EventWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// A specific recorded version
    VersionPin { version: String },
}

impl TemporalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalMode::AsOf { .. } => "as_of",
            TemporalMode::EventWindow { .. } => "event_window",
            TemporalMode::VersionPin { .. } => "version_pin",
        }
    }
}

/// Which timeline the projection refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalSemantics {
    /// When things were true in the world
    #[default]
    ValidTime,
    /// When things were recorded
    TransactionTime,
}

impl TemporalSemantics {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalSemantics::ValidTime => "valid_time",
            TemporalSemantics::TransactionTime => "transaction_time",
        }
    }
}

/// Whether a temporal context is frozen or recomputed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    /// Computed once and frozen
    #[default]
    Static,
    /// Recomputed per query; only meaningful for "now"
    Dynamic,
}

impl Evaluation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Evaluation::Static => "static",
            Evaluation::Dynamic => "dynamic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalParams {
    pub mode: TemporalMode,
    #[serde(default)]
    pub semantics: TemporalSemantics,
    #[serde(default)]
    pub evaluation: Evaluation,
}

impl TemporalParams {
    /// Builds a temporal context, freezing a static "now" to the current instant.
    ///
    /// # Errors
    ///
    /// `NOEMA_TEMPORAL_INVALID` if dynamic evaluation is requested for
    /// anything but "now", or if a window ends before it starts.
    pub fn new(
        mode: TemporalMode,
        semantics: TemporalSemantics,
        evaluation: Evaluation,
    ) -> OperatorResult<Self> {
        let params = Self {
            mode,
            semantics,
            evaluation,
        };
        params.check()?;
        Ok(params.freeze(Utc::now()))
    }

    /// Replace a static "now" with `instant`
    pub fn freeze(mut self, instant: DateTime<Utc>) -> Self {
        if self.evaluation == Evaluation::Static {
            if let TemporalMode::AsOf { at: TimePoint::Now } = self.mode {
                self.mode = TemporalMode::AsOf {
                    at: TimePoint::At(instant),
                };
            }
        }
        self
    }

    pub fn check(&self) -> OperatorResult<()> {
        if self.evaluation == Evaluation::Dynamic
            && !matches!(self.mode, TemporalMode::AsOf { at: TimePoint::Now })
        {
            return Err(OperatorError::temporal_invalid(
                "dynamic evaluation is only allowed for an as-of 'now' projection",
            ));
        }
        if let TemporalMode::EventWindow { start, end } = &self.mode {
            if start > end {
                return Err(OperatorError::temporal_invalid(format!(
                    "event window ends ({}) before it starts ({})",
                    end, start
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Designate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignateParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Synthesize / Superpose
// ---------------------------------------------------------------------------

fn default_match_field() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisParams {
    pub left_ref: String,
    pub right_ref: String,
    #[serde(default = "default_match_field")]
    pub match_field: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl SynthesisParams {
    pub fn new(left_ref: impl Into<String>, right_ref: impl Into<String>) -> Self {
        Self {
            left_ref: left_ref.into(),
            right_ref: right_ref.into(),
            match_field: default_match_field(),
            evidence: Vec::new(),
        }
    }

    pub fn match_field(mut self, field: impl Into<String>) -> Self {
        self.match_field = field.into();
        self
    }

    pub fn evidence(mut self, event_id: impl Into<String>) -> Self {
        self.evidence.push(event_id.into());
        self
    }

    /// Entity id assigned to rows tagged by this synthesis
    pub fn entity_id(&self) -> String {
        format!("{}≡{}", self.left_ref, self.right_ref)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretation {
    pub label: String,
    pub source_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperpositionParams {
    pub field: String,
    pub interpretations: Vec<Interpretation>,
}

impl SuperpositionParams {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            interpretations: Vec::new(),
        }
    }

    pub fn interpretation(mut self, label: impl Into<String>, source_field: impl Into<String>) -> Self {
        self.interpretations.push(Interpretation {
            label: label.into(),
            source_field: source_field.into(),
        });
        self
    }
}

// ---------------------------------------------------------------------------
// AssertAbsence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceParams {
    /// What is expected to exist
    pub expectation: String,
    /// Why it is expected; mandatory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis: Option<String>,
    pub target_source: String,
    pub key_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_key_field: Option<String>,
}

impl AbsenceParams {
    pub fn new(
        expectation: impl Into<String>,
        target_source: impl Into<String>,
        key_field: impl Into<String>,
    ) -> Self {
        Self {
            expectation: expectation.into(),
            basis: None,
            target_source: target_source.into(),
            key_field: key_field.into(),
            target_key_field: None,
        }
    }

    pub fn basis(mut self, basis: impl Into<String>) -> Self {
        self.basis = Some(basis.into());
        self
    }

    pub fn target_key_field(mut self, field: impl Into<String>) -> Self {
        self.target_key_field = Some(field.into());
        self
    }

    pub fn has_basis(&self) -> bool {
        self.basis.as_deref().map_or(false, |b| !b.trim().is_empty())
    }

    /// Key field in the target source, defaulting to `key_field`
    pub fn resolved_target_key(&self) -> &str {
        self.target_key_field.as_deref().unwrap_or(&self.key_field)
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
}

impl AggregateFn {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::First => "first",
            AggregateFn::Last => "last",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: AggregateFn,
    /// `None` only for COUNT(*)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub alias: String,
}

impl Aggregation {
    pub fn count_all(alias: impl Into<String>) -> Self {
        Self {
            function: AggregateFn::Count,
            field: None,
            alias: alias.into(),
        }
    }

    pub fn of(function: AggregateFn, field: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            function,
            field: Some(field.into()),
            alias: alias.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateParams {
    #[serde(default)]
    pub group_by: Vec<String>,
    pub aggregations: Vec<Aggregation>,
}

impl AggregateParams {
    pub fn group_by<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            group_by: fields.into_iter().map(Into::into).collect(),
            aggregations: Vec::new(),
        }
    }

    pub fn with(mut self, aggregation: Aggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }
}

// ---------------------------------------------------------------------------
// Supersede
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersedeParams {
    /// Id of the set definition being replaced
    pub supersedes: String,
    pub kind: SupersessionType,
    pub reason: String,
}
