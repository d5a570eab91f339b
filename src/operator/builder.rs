//! Chain builder
//!
//! Operators whose required parameters carry epistemic weight fail at the
//! call that adds them, not later at build time:
//! - join without a conflict policy
//! - synthesis without evidence
//! - absence assertion without a basis
//! - inconsistent temporal context

use chrono::{DateTime, Utc};

use crate::epistemic::{EpistemicType, Frame, Grounding};
use crate::observability::{log_event, LogEvent, MetricsRegistry};
use crate::predicate::Predicate;

use super::chain::{OperatorChain, OperatorInvocation};
use super::errors::{OperatorError, OperatorResult};
use super::params::{
    AbsenceParams, AggregateParams, DesignateParams, EntryParams, Evaluation, JoinParams,
    OperatorParams, RestrictMode, RestrictParams, SupersedeParams, SuperpositionParams,
    SynthesisParams, TemporalMode, TemporalParams, TemporalSemantics, TimePoint, Visibility,
};
use super::set_definition::SetDefinition;
use super::validator::ChainValidator;

/// Knobs applied when turning a chain into a SetDefinition
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions<'a> {
    /// Promote advisory warnings to blocking errors
    pub treat_warnings_as_errors: bool,
    pub metrics: Option<&'a MetricsRegistry>,
}

#[derive(Debug, Clone, Default)]
pub struct ChainBuilder {
    chain: OperatorChain,
    running: Option<EpistemicType>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, params: OperatorParams) -> Self {
        let kind = params.kind();
        let incoming = self.running.unwrap_or(EpistemicType::Given);
        let produces = kind.spec().produces.resolve(incoming);
        self.running = Some(incoming.max(produces));
        let id = format!("{}-{}", kind.as_str(), self.chain.len());
        self.chain = self.chain.push(OperatorInvocation::new(id, params, produces));
        self
    }

    pub fn entry(self, source_id: impl Into<String>) -> Self {
        self.push(OperatorParams::Entry(EntryParams {
            source_id: source_id.into(),
            alias: None,
        }))
    }

    pub fn entry_as(self, source_id: impl Into<String>, alias: impl Into<String>) -> Self {
        self.push(OperatorParams::Entry(EntryParams {
            source_id: source_id.into(),
            alias: Some(alias.into()),
        }))
    }

    /// Retain matching rows; the rest are excluded from this world
    pub fn filter(self, predicate: Predicate) -> Self {
        self.filter_with(predicate, Visibility::Excluded)
    }

    /// Retain matching rows; the rest are set aside but still exist
    pub fn hide(self, predicate: Predicate) -> Self {
        self.filter_with(predicate, Visibility::Hidden)
    }

    pub fn filter_with(self, predicate: Predicate, visibility: Visibility) -> Self {
        self.push(OperatorParams::Restrict(RestrictParams {
            mode: RestrictMode::Filter { predicate },
            visibility,
        }))
    }

    pub fn select<S: Into<String>>(self, columns: impl IntoIterator<Item = S>) -> Self {
        self.push(OperatorParams::Restrict(RestrictParams {
            mode: RestrictMode::Select {
                columns: columns.into_iter().map(Into::into).collect(),
            },
            visibility: Visibility::Excluded,
        }))
    }

    pub fn join(self, params: JoinParams) -> OperatorResult<Self> {
        if params.conflict_policy.is_none() {
            return Err(OperatorError::join_policy_required(&params.right_source));
        }
        Ok(self.push(OperatorParams::Connect(params)))
    }

    pub fn project(self, params: TemporalParams) -> OperatorResult<Self> {
        params.check()?;
        Ok(self.push(OperatorParams::Project(params.freeze(Utc::now()))))
    }

    pub fn as_of(
        self,
        at: TimePoint,
        semantics: TemporalSemantics,
        evaluation: Evaluation,
    ) -> OperatorResult<Self> {
        let params = TemporalParams::new(TemporalMode::AsOf { at }, semantics, evaluation)?;
        Ok(self.push(OperatorParams::Project(params)))
    }

    pub fn window(
        self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        semantics: TemporalSemantics,
    ) -> OperatorResult<Self> {
        let params = TemporalParams::new(
            TemporalMode::EventWindow { start, end },
            semantics,
            Evaluation::Static,
        )?;
        Ok(self.push(OperatorParams::Project(params)))
    }

    pub fn pin_version(
        self,
        version: impl Into<String>,
        semantics: TemporalSemantics,
    ) -> OperatorResult<Self> {
        let params = TemporalParams::new(
            TemporalMode::VersionPin {
                version: version.into(),
            },
            semantics,
            Evaluation::Static,
        )?;
        Ok(self.push(OperatorParams::Project(params)))
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.push(OperatorParams::Designate(DesignateParams {
            name: name.into(),
            description: None,
        }))
    }

    pub fn name_with_description(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.push(OperatorParams::Designate(DesignateParams {
            name: name.into(),
            description: Some(description.into()),
        }))
    }

    pub fn synthesize(self, params: SynthesisParams) -> OperatorResult<Self> {
        if params.evidence.iter().all(|e| e.trim().is_empty()) {
            return Err(OperatorError::evidence_required(
                &params.left_ref,
                &params.right_ref,
            ));
        }
        Ok(self.push(OperatorParams::Synthesize(params)))
    }

    pub fn superpose(self, params: SuperpositionParams) -> Self {
        self.push(OperatorParams::Superpose(params))
    }

    pub fn assert_absence(self, params: AbsenceParams) -> OperatorResult<Self> {
        if !params.has_basis() {
            return Err(OperatorError::absence_basis_required(&params.expectation));
        }
        Ok(self.push(OperatorParams::AssertAbsence(params)))
    }

    pub fn aggregate(self, params: AggregateParams) -> Self {
        self.push(OperatorParams::Aggregate(params))
    }

    pub fn supersede(self, params: SupersedeParams) -> Self {
        self.push(OperatorParams::Supersede(params))
    }

    pub fn with_grounding(mut self, grounding: Grounding) -> Self {
        self.chain = self.chain.with_grounding(grounding);
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.chain = self.chain.with_frame(frame);
        self
    }

    /// The chain as built so far
    pub fn chain(&self) -> &OperatorChain {
        &self.chain
    }

    pub fn into_chain(self) -> OperatorChain {
        self.chain
    }

    pub fn build(self) -> OperatorResult<SetDefinition> {
        build_chain(self.chain, BuildOptions::default())
    }

    pub fn build_with(self, options: BuildOptions<'_>) -> OperatorResult<SetDefinition> {
        build_chain(self.chain, options)
    }
}

/// Validates a chain and wraps it in a SetDefinition.
///
/// Warnings and flagged operators are logged. Blocking errors, and warnings
/// when promoted, reject the chain with `NOEMA_CHAIN_INVALID`.
pub fn build_chain(chain: OperatorChain, options: BuildOptions<'_>) -> OperatorResult<SetDefinition> {
    let validation = ChainValidator::validate(&chain);

    for warning in &validation.warnings {
        let step = warning.step.map(|s| s.to_string()).unwrap_or_default();
        log_event(
            LogEvent::ChainWarning,
            &[
                ("issue", warning.code.as_str()),
                ("message", warning.message.as_str()),
                ("step", step.as_str()),
            ],
        );
    }
    for flag in &validation.flagged {
        let step = flag.step.map(|s| s.to_string()).unwrap_or_default();
        log_event(
            LogEvent::ChainFlagged,
            &[("message", flag.message.as_str()), ("step", step.as_str())],
        );
    }

    let mut blocking = validation.errors;
    if options.treat_warnings_as_errors {
        blocking.extend(validation.warnings.iter().cloned());
    }
    if !blocking.is_empty() {
        let count = blocking.len().to_string();
        let first = blocking[0].code.as_str();
        log_event(
            LogEvent::ChainRejected,
            &[("first_issue", first), ("issues", count.as_str())],
        );
        if let Some(metrics) = options.metrics {
            metrics.increment_chains_rejected();
        }
        return Err(OperatorError::chain_invalid(blocking));
    }

    let set = SetDefinition::from_chain(chain, validation.warnings);
    let steps = set.chain().len().to_string();
    log_event(
        LogEvent::ChainBuilt,
        &[
            ("name", set.name()),
            ("produced_type", set.produced_type().as_str()),
            ("set_id", set.id()),
            ("steps", steps.as_str()),
            ("strategy", set.strategy().as_str()),
        ],
    );
    if let Some(metrics) = options.metrics {
        metrics.increment_chains_built();
    }
    Ok(set)
}
