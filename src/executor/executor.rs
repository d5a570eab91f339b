//! Chain executor
//!
//! A straight left-to-right interpreter. Each step takes the working rows and
//! columns plus the execution context and returns new rows and columns.
//!
//! Execution contract:
//! 1. The chain is validated before any row is read
//! 2. Entry and join sources must exist; a missing one is fatal
//! 3. An absence target that does not exist yields an empty result
//! 4. Temporal projection annotates rows, it does not replay history
//! 5. Row counts are recorded per step
//! 6. Same chain + same sources = same rows in the same order

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::epistemic::EpistemicType;
use crate::observability::{log_event, LogEvent, MetricsRegistry, ObservationScope};
use crate::operator::{
    AbsenceParams, ChainValidator, Evaluation, JoinParams, OperatorChain, OperatorParams, RestrictMode,
    RestrictParams, SetDefinition, SuperpositionParams, SynthesisParams, TemporalMode,
    TemporalParams, TimePoint, Visibility,
};
use crate::predicate::{coerce_string, is_nullish, lookup, Row};

use super::aggregate::{aggregate, aggregate_columns};
use super::errors::{ExecutorError, ExecutorResult};
use super::join::hash_join;
use super::result::{ExecutionResult, StepStats};
use super::source::{ExecutionContext, SourceData, SourceProvider};

pub const AS_OF_COLUMN: &str = "_as_of";
pub const WINDOW_START_COLUMN: &str = "_window_start";
pub const WINDOW_END_COLUMN: &str = "_window_end";
pub const VERSION_COLUMN: &str = "_version";
pub const SEMANTICS_COLUMN: &str = "_temporal_semantics";
pub const EVALUATION_COLUMN: &str = "_evaluation";
pub const SYNTHESIZED_ENTITY_COLUMN: &str = "_synthesized_entity";
pub const SYNTHESIS_EVIDENCE_COLUMN: &str = "_synthesis_evidence";
pub const SUPERPOSED_COLUMN: &str = "_superposed";
pub const ABSENCE_EXPECTATION_COLUMN: &str = "_absence_expectation";
pub const ABSENCE_BASIS_COLUMN: &str = "_absence_basis";
pub const ABSENCE_TARGET_COLUMN: &str = "_absence_target";

/// Working set threaded between steps
struct Working {
    rows: Vec<Row>,
    columns: Vec<String>,
}

impl Working {
    fn add_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }
}

/// Executes chains against a source provider
pub struct ChainExecutor<'a, P: SourceProvider> {
    provider: &'a P,
    max_rows: Option<usize>,
    metrics: Option<&'a MetricsRegistry>,
}

impl<'a, P: SourceProvider> ChainExecutor<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            max_rows: None,
            metrics: None,
        }
    }

    /// Fail with `NOEMA_EXECUTION_LIMIT` when any step holds more rows
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_metrics(mut self, metrics: &'a MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Executes a built SetDefinition
    pub fn execute(&self, set: &SetDefinition) -> ExecutorResult<ExecutionResult> {
        self.run(set.chain(), set.id(), Utc::now())
    }

    /// Validates then executes a raw chain
    pub fn execute_chain(&self, chain: &OperatorChain) -> ExecutorResult<ExecutionResult> {
        let validation = ChainValidator::validate(chain);
        if !validation.is_valid() {
            let issues: Vec<String> = validation.errors.iter().map(|i| i.to_string()).collect();
            return Err(ExecutorError::execution_failed(format!(
                "chain is invalid: {}",
                issues.join("; ")
            )));
        }
        let now = Utc::now();
        let chain = chain.clone().freeze_temporal(now);
        self.run(&chain, "unbuilt", now)
    }

    /// Executes with an explicit instant for dynamic "now" projections.
    ///
    /// Static projections were frozen when the set was built and ignore `now`.
    pub fn execute_at(
        &self,
        set: &SetDefinition,
        now: DateTime<Utc>,
    ) -> ExecutorResult<ExecutionResult> {
        self.run(set.chain(), set.id(), now)
    }

    fn run(
        &self,
        chain: &OperatorChain,
        set_id: &str,
        now: DateTime<Utc>,
    ) -> ExecutorResult<ExecutionResult> {
        let step_count = chain.len().to_string();
        let scope =
            ObservationScope::execution(&[("set_id", set_id), ("steps", step_count.as_str())]);

        match self.run_steps(chain, now) {
            Ok(result) => {
                let rows = result.rows.len().to_string();
                let hidden = result.hidden_rows.len().to_string();
                scope.complete_with_fields(&[("hidden", hidden.as_str()), ("rows", rows.as_str())]);
                if let Some(metrics) = self.metrics {
                    metrics.record_execution(result.rows.len());
                }
                Ok(result)
            }
            Err(e) => {
                scope.fail(e.code().code(), e.message());
                if let Some(metrics) = self.metrics {
                    metrics.increment_execution_failures();
                }
                Err(e)
            }
        }
    }

    fn run_steps(&self, chain: &OperatorChain, now: DateTime<Utc>) -> ExecutorResult<ExecutionResult> {
        let mut ctx = ExecutionContext::new(now);
        let mut working = Working {
            rows: Vec::new(),
            columns: Vec::new(),
        };
        let mut steps = Vec::with_capacity(chain.len());

        for (index, invocation) in chain.invocations().iter().enumerate() {
            let input_rows = working.rows.len();
            working = self
                .apply(invocation.params(), working, &mut ctx)
                .map_err(|e| e.at_step(index))?;

            let output_rows = working.rows.len();
            let (index_s, input_s, output_s) = (
                index.to_string(),
                input_rows.to_string(),
                output_rows.to_string(),
            );
            log_event(
                LogEvent::StepExecuted,
                &[
                    ("input_rows", input_s.as_str()),
                    ("operator", invocation.operator().as_str()),
                    ("output_rows", output_s.as_str()),
                    ("step", index_s.as_str()),
                ],
            );
            steps.push(StepStats {
                index,
                operator: invocation.operator(),
                input_rows,
                output_rows,
            });

            if let Some(max) = self.max_rows {
                if output_rows > max {
                    return Err(ExecutorError::execution_limit(output_rows, max).at_step(index));
                }
            }
        }

        let produced_type: EpistemicType = chain.produced_type();
        let (hidden_rows, name) = ctx.into_parts();
        Ok(ExecutionResult {
            rows: working.rows,
            columns: working.columns,
            steps,
            hidden_rows,
            name,
            produced_type,
        })
    }

    fn apply(
        &self,
        params: &OperatorParams,
        working: Working,
        ctx: &mut ExecutionContext,
    ) -> ExecutorResult<Working> {
        match params {
            OperatorParams::Entry(entry) => {
                let data = self
                    .provider
                    .source(&entry.source_id)
                    .ok_or_else(|| ExecutorError::source_not_found(&entry.source_id))?;
                let columns = data.columns();
                let rows = data.rows.clone();
                ctx.register(&entry.source_id, entry.alias.as_deref(), data);
                Ok(Working { rows, columns })
            }
            OperatorParams::Restrict(restrict) => Ok(restrict_rows(restrict, working, ctx)),
            OperatorParams::Connect(join) => self.join(join, working, ctx),
            OperatorParams::Project(temporal) => annotate_temporal(temporal, working, ctx.now()),
            OperatorParams::Designate(designate) => {
                ctx.set_name(&designate.name);
                Ok(working)
            }
            OperatorParams::Synthesize(synthesis) => Ok(synthesize(synthesis, working)),
            OperatorParams::Superpose(superposition) => Ok(superpose(superposition, working)),
            OperatorParams::AssertAbsence(absence) => Ok(self.assert_absence(absence, working, ctx)),
            OperatorParams::Aggregate(agg) => Ok(Working {
                rows: aggregate(&working.rows, agg),
                columns: aggregate_columns(agg),
            }),
            OperatorParams::Supersede(_) => Ok(working),
        }
    }

    /// Registered sources win over the provider so aliases resolve
    fn resolve_source(&self, key: &str, ctx: &ExecutionContext) -> Option<SourceData> {
        ctx.registered(key)
            .cloned()
            .or_else(|| self.provider.source(key))
    }

    fn join(
        &self,
        params: &JoinParams,
        working: Working,
        ctx: &mut ExecutionContext,
    ) -> ExecutorResult<Working> {
        let policy = params.conflict_policy.ok_or_else(|| {
            ExecutorError::execution_failed(format!(
                "join with '{}' has no conflict policy",
                params.right_source
            ))
        })?;
        let right = self
            .resolve_source(&params.right_source, ctx)
            .ok_or_else(|| ExecutorError::source_not_found(&params.right_source))?;
        if ctx.registered(&params.right_source).is_none() {
            ctx.register(&params.right_source, None, right.clone());
        }

        let joined = hash_join(
            &working.rows,
            &working.columns,
            &right.rows,
            &right.columns(),
            params,
            policy,
        );
        Ok(Working {
            rows: joined.rows,
            columns: joined.columns,
        })
    }

    fn assert_absence(
        &self,
        params: &AbsenceParams,
        working: Working,
        ctx: &ExecutionContext,
    ) -> Working {
        let target = match self.resolve_source(&params.target_source, ctx) {
            Some(target) => target,
            None => {
                log_event(
                    LogEvent::ChainWarning,
                    &[
                        ("reason", "absence target missing; result is empty"),
                        ("target", params.target_source.as_str()),
                    ],
                );
                return Working {
                    rows: Vec::new(),
                    columns: working.columns,
                };
            }
        };

        let target_key = params.resolved_target_key();
        let present: std::collections::HashSet<String> = target
            .rows
            .iter()
            .map(|r| lookup(r, target_key))
            .filter(|v| !is_nullish(*v))
            .map(coerce_string)
            .collect();

        let basis = params.basis.clone().map_or(Value::Null, Value::String);
        let mut out = Working {
            rows: Vec::new(),
            columns: working.columns,
        };
        for column in [
            ABSENCE_EXPECTATION_COLUMN,
            ABSENCE_BASIS_COLUMN,
            ABSENCE_TARGET_COLUMN,
        ] {
            out.add_column(column);
        }

        for mut row in working.rows {
            let key = lookup(&row, &params.key_field);
            let absent = is_nullish(key) || !present.contains(&coerce_string(key));
            if absent {
                row.insert(
                    ABSENCE_EXPECTATION_COLUMN.to_string(),
                    Value::String(params.expectation.clone()),
                );
                row.insert(ABSENCE_BASIS_COLUMN.to_string(), basis.clone());
                row.insert(
                    ABSENCE_TARGET_COLUMN.to_string(),
                    Value::String(params.target_source.clone()),
                );
                out.rows.push(row);
            }
        }
        out
    }
}

fn restrict_rows(params: &RestrictParams, working: Working, ctx: &mut ExecutionContext) -> Working {
    match &params.mode {
        RestrictMode::Select { columns } => {
            let rows = working
                .rows
                .into_iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                        .collect::<Row>()
                })
                .collect();
            Working {
                rows,
                columns: columns.clone(),
            }
        }
        RestrictMode::Filter { predicate } => {
            let compiled = predicate.compile();
            let (kept, rejected): (Vec<Row>, Vec<Row>) =
                working.rows.into_iter().partition(|r| compiled.evaluate(r));
            if params.visibility == Visibility::Hidden {
                ctx.hide(rejected);
            }
            Working {
                rows: kept,
                columns: working.columns,
            }
        }
    }
}

fn annotate_temporal(
    params: &TemporalParams,
    mut working: Working,
    now: DateTime<Utc>,
) -> ExecutorResult<Working> {
    let mut annotations: Vec<(&str, Value)> = match &params.mode {
        TemporalMode::AsOf { at } => {
            let instant = match (at, params.evaluation) {
                (TimePoint::At(t), _) => *t,
                (TimePoint::Now, Evaluation::Dynamic) => now,
                (TimePoint::Now, Evaluation::Static) => {
                    return Err(ExecutorError::execution_failed(
                        "static 'now' projection was not frozen before execution",
                    ))
                }
            };
            vec![(AS_OF_COLUMN, Value::String(instant.to_rfc3339()))]
        }
        TemporalMode::EventWindow { start, end } => vec![
            (WINDOW_START_COLUMN, Value::String(start.to_rfc3339())),
            (WINDOW_END_COLUMN, Value::String(end.to_rfc3339())),
        ],
        TemporalMode::VersionPin { version } => vec![(VERSION_COLUMN, Value::String(version.clone()))],
    };
    annotations.push((SEMANTICS_COLUMN, json!(params.semantics.as_str())));
    annotations.push((EVALUATION_COLUMN, json!(params.evaluation.as_str())));

    for (column, _) in &annotations {
        working.add_column(column);
    }
    for row in &mut working.rows {
        for (column, value) in &annotations {
            row.insert(column.to_string(), value.clone());
        }
    }
    Ok(working)
}

/// Tags rows whose match field names either reference
fn synthesize(params: &SynthesisParams, mut working: Working) -> Working {
    let left = params.left_ref.to_lowercase();
    let right = params.right_ref.to_lowercase();
    let entity = Value::String(params.entity_id());
    let evidence = json!(params.evidence);

    working.add_column(SYNTHESIZED_ENTITY_COLUMN);
    working.add_column(SYNTHESIS_EVIDENCE_COLUMN);
    for row in &mut working.rows {
        let key = coerce_string(lookup(row, &params.match_field));
        let matched = key == left || key == right;
        row.insert(
            SYNTHESIZED_ENTITY_COLUMN.to_string(),
            if matched { entity.clone() } else { Value::Null },
        );
        row.insert(
            SYNTHESIS_EVIDENCE_COLUMN.to_string(),
            if matched { evidence.clone() } else { Value::Null },
        );
    }
    working
}

/// Keeps every interpretation side by side and flags disagreement
fn superpose(params: &SuperpositionParams, mut working: Working) -> Working {
    let column = format!("{}__interpretations", params.field);
    working.add_column(&column);
    working.add_column(SUPERPOSED_COLUMN);

    for row in &mut working.rows {
        let mut interpretations = Row::new();
        let mut distinct: Vec<String> = Vec::new();
        for interpretation in &params.interpretations {
            let value = lookup(row, &interpretation.source_field)
                .cloned()
                .unwrap_or(Value::Null);
            if !is_nullish(Some(&value)) {
                let normalized = coerce_string(Some(&value));
                if !distinct.contains(&normalized) {
                    distinct.push(normalized);
                }
            }
            interpretations.insert(interpretation.label.clone(), value);
        }
        row.insert(column.clone(), Value::Object(interpretations));
        row.insert(SUPERPOSED_COLUMN.to_string(), Value::Bool(distinct.len() > 1));
    }
    working
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::operator::{ChainBuilder, Evaluation, TemporalSemantics};
    use crate::predicate::Predicate;

    struct Sources(HashMap<String, SourceData>);

    impl SourceProvider for Sources {
        fn source(&self, source_id: &str) -> Option<SourceData> {
            self.0.get(source_id).cloned()
        }
    }

    fn sources() -> Sources {
        let rows = json!([
            {"id": "1", "status": "active"},
            {"id": "2", "status": "closed"},
            {"id": "3", "status": "active"}
        ]);
        let rows = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect();
        let mut map = HashMap::new();
        map.insert("items".to_string(), SourceData::new(rows));
        Sources(map)
    }

    fn base() -> ChainBuilder {
        ChainBuilder::new()
            .entry("items")
            .as_of(TimePoint::Now, TemporalSemantics::ValidTime, Evaluation::Dynamic)
            .unwrap()
    }

    #[test]
    fn test_hidden_rows_are_kept_aside() {
        let set = base()
            .hide(Predicate::eq("status", "active"))
            .name("active")
            .build()
            .unwrap();
        let provider = sources();
        let result = ChainExecutor::new(&provider).execute(&set).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.hidden_rows.len(), 1);
        assert_eq!(result.name.as_deref(), Some("active"));
    }

    #[test]
    fn test_excluded_rows_are_gone() {
        let set = base()
            .filter(Predicate::eq("status", "active"))
            .name("active")
            .build()
            .unwrap();
        let provider = sources();
        let result = ChainExecutor::new(&provider).execute(&set).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.hidden_rows.is_empty());
    }

    #[test]
    fn test_dynamic_now_resolves_per_execution() {
        let set = base().name("all").build().unwrap();
        let provider = sources();
        let at = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let result = ChainExecutor::new(&provider).execute_at(&set, at).unwrap();
        assert_eq!(result.rows[0][AS_OF_COLUMN], json!(at.to_rfc3339()));
        assert_eq!(result.rows[0][EVALUATION_COLUMN], json!("dynamic"));
        assert!(result.columns.contains(&SEMANTICS_COLUMN.to_string()));
    }

    #[test]
    fn test_row_limit_enforced() {
        let set = base().name("all").build().unwrap();
        let provider = sources();
        let metrics = MetricsRegistry::new();
        let err = ChainExecutor::new(&provider)
            .with_max_rows(Some(2))
            .with_metrics(&metrics)
            .execute(&set)
            .unwrap_err();
        assert_eq!(err.code().code(), "NOEMA_EXECUTION_LIMIT");
        assert_eq!(err.step(), Some(0));
        assert_eq!(metrics.snapshot().execution_failures, 1);
    }

    #[test]
    fn test_missing_entry_source_is_fatal() {
        let set = ChainBuilder::new()
            .entry("nowhere")
            .as_of(TimePoint::Now, TemporalSemantics::ValidTime, Evaluation::Static)
            .unwrap()
            .name("x")
            .build()
            .unwrap();
        let provider = sources();
        let err = ChainExecutor::new(&provider).execute(&set).unwrap_err();
        assert!(err.is_fatal());
    }
}
