//! Chain Executor Semantics Tests
//!
//! - Join conflict policies: expose-all, cluster, pick with ordering
//! - Outer joins keep unmatched rows on the declared sides
//! - Grouping with COUNT(*)
//! - Absence assertion as an anti-join
//! - Missing sources
//! - Column projection
//! - Temporal annotation, and static "now" frozen at build time
//! - Entity synthesis tagging and superposition

use chrono::{DateTime, Duration, Utc};
use noema::executor::{
    ChainExecutor, ExecutorErrorCode, AS_OF_COLUMN, EVALUATION_COLUMN, MATCHES_COLUMN,
    MATCH_COUNT_COLUMN, MULTIPLE_COLUMN, SEMANTICS_COLUMN, SUPERPOSED_COLUMN,
    SYNTHESIS_EVIDENCE_COLUMN, SYNTHESIZED_ENTITY_COLUMN, VERSION_COLUMN, WINDOW_END_COLUMN,
    WINDOW_START_COLUMN,
};
use noema::observability::MetricsRegistry;
use noema::operator::{
    build_chain, AbsenceParams, AggregateParams, Aggregation, BuildOptions, ChainBuilder,
    ConflictPolicy, Evaluation, JoinKind, JoinParams, OperatorChain, OperatorKind, SetDefinition,
    SuperpositionParams, SynthesisParams, TemporalMode, TemporalSemantics, TimePoint,
};
use noema::predicate::Predicate;
use noema::store::MemorySourceStore;
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn ts() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn sources() -> MemorySourceStore {
    MemorySourceStore::from_value(&json!({
        "sources": {
            "people": [
                {"id": 1, "name": "Ada"},
                {"id": 2, "name": "Grace"},
                {"id": 3, "name": "Edsger"}
            ],
            "orders": [
                {"order_id": "o1", "person_id": 1, "total": 30},
                {"order_id": "o2", "person_id": 1, "total": 10},
                {"order_id": "o3", "person_id": 1, "total": 20},
                {"order_id": "o4", "person_id": 2, "total": 5},
                {"order_id": "o5", "person_id": 9, "total": 7}
            ],
            "entities": [
                {"id": "a", "type": "person"},
                {"id": "b", "type": "company"},
                {"id": "c", "type": "Person"},
                {"id": "d", "type": "company"}
            ]
        }
    }))
    .unwrap()
}

fn from(source: &str) -> ChainBuilder {
    ChainBuilder::new()
        .entry(source)
        .as_of(TimePoint::At(ts()), TemporalSemantics::ValidTime, Evaluation::Static)
        .unwrap()
}

fn joined(params: JoinParams) -> SetDefinition {
    from("people")
        .join(params)
        .unwrap()
        .name("people with orders")
        .build()
        .unwrap()
}

// =============================================================================
// Join Conflict Policies
// =============================================================================

/// One person with three orders: expose-all yields three rows
#[test]
fn test_expose_all_yields_one_row_per_match() {
    let provider = sources();
    let set = joined(
        JoinParams::on("orders", "id", "person_id").policy(ConflictPolicy::ExposeAll),
    );
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    let ada: Vec<_> = result.rows.iter().filter(|r| r["name"] == json!("Ada")).collect();
    assert_eq!(ada.len(), 3);
    // inner join drops Edsger and the orphan order
    assert_eq!(result.len(), 4);
}

/// The same join under cluster yields one row with a multiplicity count
#[test]
fn test_cluster_yields_one_row_with_match_count() {
    let provider = sources();
    let set = joined(JoinParams::on("orders", "id", "person_id").policy(ConflictPolicy::Cluster));
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    let ada: Vec<_> = result.rows.iter().filter(|r| r["name"] == json!("Ada")).collect();
    assert_eq!(ada.len(), 1);
    assert_eq!(ada[0][MATCH_COUNT_COLUMN], json!(3));
    assert_eq!(ada[0][MULTIPLE_COLUMN], json!(true));
    assert_eq!(ada[0][MATCHES_COLUMN].as_array().unwrap().len(), 3);
}

#[test]
fn test_pick_first_respects_declared_order() {
    let provider = sources();
    let set = joined(
        JoinParams::on("orders", "id", "person_id")
            .policy(ConflictPolicy::PickFirst)
            .order_by("total", true),
    );
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();
    let ada = result.rows.iter().find(|r| r["name"] == json!("Ada")).unwrap();
    assert_eq!(ada["order_id"], json!("o1"));

    let set = joined(
        JoinParams::on("orders", "id", "person_id")
            .policy(ConflictPolicy::PickLast)
            .order_by("total", true),
    );
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();
    let ada = result.rows.iter().find(|r| r["name"] == json!("Ada")).unwrap();
    assert_eq!(ada["order_id"], json!("o2"));
}

#[test]
fn test_full_join_keeps_both_unmatched_sides() {
    let provider = sources();
    let set = joined(
        JoinParams::on("orders", "id", "person_id")
            .kind(JoinKind::Full)
            .policy(ConflictPolicy::PickFirst),
    );
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    let edsger = result.rows.iter().find(|r| r["name"] == json!("Edsger")).unwrap();
    assert!(edsger["order_id"].is_null());
    let orphan = result.rows.iter().find(|r| r["order_id"] == json!("o5")).unwrap();
    assert!(orphan["name"].is_null());
    // Ada, Grace, Edsger, orphan order
    assert_eq!(result.len(), 4);
}

// =============================================================================
// Aggregation
// =============================================================================

/// Four rows, two per type, grouped with COUNT(*): two groups of two
#[test]
fn test_group_count_yields_two_groups_of_two() {
    let provider = MemorySourceStore::from_value(&json!({
        "sources": {
            "entities": [
                {"id": "a", "type": "person"},
                {"id": "b", "type": "company"},
                {"id": "c", "type": "person"},
                {"id": "d", "type": "company"}
            ]
        }
    }))
    .unwrap();
    let set = from("entities")
        .aggregate(AggregateParams::group_by(["type"]).with(Aggregation::count_all("count")))
        .name("entity counts")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.columns, vec!["type".to_string(), "count".to_string()]);
    for row in &result.rows {
        assert_eq!(row["count"], json!(2));
    }
    assert_eq!(result.rows[0]["type"], json!("person"));
    assert_eq!(result.produced_type.as_str(), "derived_value");
}

#[test]
fn test_group_keys_are_exact() {
    let provider = sources();
    let set = from("entities")
        .aggregate(AggregateParams::group_by(["type"]).with(Aggregation::count_all("count")))
        .name("entity counts")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();
    // "person" and "Person" are distinct group keys
    assert_eq!(result.len(), 3);
}

// =============================================================================
// Absence
// =============================================================================

#[test]
fn test_absence_keeps_rows_without_counterpart() {
    let provider = sources();
    let set = from("people")
        .assert_absence(
            AbsenceParams::new("every person has placed an order", "orders", "id")
                .target_key_field("person_id")
                .basis("onboarding requires a first order"),
        )
        .unwrap()
        .name("people without orders")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.rows[0]["name"], json!("Edsger"));
    assert_eq!(
        result.steps.iter().map(|s| s.operator).collect::<Vec<_>>(),
        vec![
            OperatorKind::Entry,
            OperatorKind::Project,
            OperatorKind::AssertAbsence,
            OperatorKind::Designate
        ]
    );
}

#[test]
fn test_absence_with_missing_target_is_empty_not_an_error() {
    let provider = sources();
    let set = from("people")
        .assert_absence(AbsenceParams::new("x", "invoices", "id").basis("policy"))
        .unwrap()
        .name("people without invoices")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();
    assert!(result.is_empty());
}

// =============================================================================
// Missing Sources
// =============================================================================

#[test]
fn test_missing_entry_source_is_fatal() {
    let provider = sources();
    let metrics = MetricsRegistry::new();
    let set = from("ghosts").name("ghosts").build().unwrap();
    let err = ChainExecutor::new(&provider)
        .with_metrics(&metrics)
        .execute(&set)
        .unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::SourceNotFound);
    assert!(err.is_fatal());
    assert_eq!(err.step(), Some(0));
    assert_eq!(metrics.snapshot().execution_failures, 1);
}

#[test]
fn test_missing_join_source_is_fatal() {
    let provider = sources();
    let set = joined(JoinParams::on("refunds", "id", "person_id").policy(ConflictPolicy::Cluster));
    let err = ChainExecutor::new(&provider).execute(&set).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::SourceNotFound);
    assert_eq!(err.step(), Some(2));
}

// =============================================================================
// Column Projection
// =============================================================================

#[test]
fn test_select_projects_rows_and_columns() {
    let provider = sources();
    let set = from("people")
        .select(["name", "email"])
        .name("names")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    assert_eq!(result.columns, vec!["name".to_string(), "email".to_string()]);
    assert_eq!(result.len(), 3);
    for row in &result.rows {
        assert_eq!(row.len(), 2);
        assert!(row["email"].is_null());
    }
    assert_eq!(result.rows[0]["name"], json!("Ada"));
}

#[test]
fn test_pattern_filter_applies_to_every_row() {
    let provider = sources();
    let set = from("people")
        .filter(Predicate::matches("name", "^(ada|grace)$"))
        .name("pioneers")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();
    let names: Vec<_> = result.rows.iter().map(|r| r["name"].clone()).collect();
    assert_eq!(names, vec![json!("Ada"), json!("Grace")]);
}

// =============================================================================
// Temporal Annotation
// =============================================================================

#[test]
fn test_event_window_annotates_every_row() {
    let provider = sources();
    let start = ts() - Duration::days(30);
    let set = ChainBuilder::new()
        .entry("people")
        .window(start, ts(), TemporalSemantics::TransactionTime)
        .unwrap()
        .name("recent people")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    for row in &result.rows {
        assert_eq!(row[WINDOW_START_COLUMN], json!(start.to_rfc3339()));
        assert_eq!(row[WINDOW_END_COLUMN], json!(ts().to_rfc3339()));
        assert_eq!(row[SEMANTICS_COLUMN], json!("transaction_time"));
        assert_eq!(row[EVALUATION_COLUMN], json!("static"));
        assert!(row.get(AS_OF_COLUMN).is_none());
    }
    assert!(result.columns.contains(&WINDOW_START_COLUMN.to_string()));
    assert!(result.columns.contains(&WINDOW_END_COLUMN.to_string()));
}

#[test]
fn test_version_pin_annotates_every_row() {
    let provider = sources();
    let set = ChainBuilder::new()
        .entry("people")
        .pin_version("v7", TemporalSemantics::ValidTime)
        .unwrap()
        .name("people at v7")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    assert_eq!(result.len(), 3);
    for row in &result.rows {
        assert_eq!(row[VERSION_COLUMN], json!("v7"));
        assert_eq!(row[SEMANTICS_COLUMN], json!("valid_time"));
    }
    assert!(result.columns.contains(&VERSION_COLUMN.to_string()));
}

/// A persisted chain with a static "now" is frozen once, when it is built
#[test]
fn test_static_now_from_persisted_chain_is_frozen_at_build() {
    let mut value = ChainBuilder::new()
        .entry("people")
        .as_of(TimePoint::Now, TemporalSemantics::ValidTime, Evaluation::Dynamic)
        .unwrap()
        .name("people")
        .into_chain()
        .to_value();
    value["invocations"][1]["params"]["evaluation"] = json!("static");

    let chain = OperatorChain::from_value(&value).unwrap();
    assert_eq!(chain.temporal_contexts()[0].evaluation, Evaluation::Static);
    assert_eq!(
        chain.temporal_contexts()[0].mode,
        TemporalMode::AsOf { at: TimePoint::Now }
    );

    let set = build_chain(chain, BuildOptions::default()).unwrap();
    assert_eq!(
        set.temporal_context()[0].mode,
        TemporalMode::AsOf {
            at: TimePoint::At(set.created_at())
        }
    );

    let provider = sources();
    let executor = ChainExecutor::new(&provider);
    let early = executor.execute_at(&set, ts()).unwrap();
    let late = executor
        .execute_at(&set, ts() + Duration::days(365 * 6))
        .unwrap();
    assert_eq!(early.rows[0][AS_OF_COLUMN], late.rows[0][AS_OF_COLUMN]);
    assert_eq!(
        early.rows[0][AS_OF_COLUMN],
        json!(set.created_at().to_rfc3339())
    );
}

/// A dynamic "now" still follows the execution instant
#[test]
fn test_dynamic_now_follows_each_execution() {
    let provider = sources();
    let set = ChainBuilder::new()
        .entry("people")
        .as_of(TimePoint::Now, TemporalSemantics::ValidTime, Evaluation::Dynamic)
        .unwrap()
        .name("people now")
        .build()
        .unwrap();
    let later = ts() + Duration::days(1);
    let executor = ChainExecutor::new(&provider);
    let first = executor.execute_at(&set, ts()).unwrap();
    let second = executor.execute_at(&set, later).unwrap();
    assert_eq!(first.rows[0][AS_OF_COLUMN], json!(ts().to_rfc3339()));
    assert_eq!(second.rows[0][AS_OF_COLUMN], json!(later.to_rfc3339()));
}

// =============================================================================
// Synthesis and Superposition
// =============================================================================

/// Only rows naming either reference are tagged with the entity and evidence
#[test]
fn test_synthesis_tags_only_matching_rows() {
    let provider = sources();
    let set = from("entities")
        .synthesize(
            SynthesisParams::new("A", "c")
                .match_field("id")
                .evidence("ev-1"),
        )
        .unwrap()
        .name("a is c")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    assert_eq!(result.len(), 4);
    assert!(result.columns.contains(&SYNTHESIZED_ENTITY_COLUMN.to_string()));
    for row in &result.rows {
        let id = row["id"].as_str().unwrap();
        if id == "a" || id == "c" {
            assert_eq!(row[SYNTHESIZED_ENTITY_COLUMN], json!("A≡c"));
            assert_eq!(row[SYNTHESIS_EVIDENCE_COLUMN], json!(["ev-1"]));
        } else {
            assert!(row[SYNTHESIZED_ENTITY_COLUMN].is_null());
            assert!(row[SYNTHESIS_EVIDENCE_COLUMN].is_null());
        }
    }
    assert_eq!(result.produced_type.as_str(), "meant");
}

/// Interpretations are kept side by side; only real disagreement is flagged
#[test]
fn test_superposition_keeps_interpretations_and_flags_disagreement() {
    let provider = MemorySourceStore::from_value(&json!({
        "sources": {
            "readings": [
                {"id": 1, "sensor_a": "20", "sensor_b": 20},
                {"id": 2, "sensor_a": "20", "sensor_b": "21"},
                {"id": 3, "sensor_a": null, "sensor_b": "5"}
            ]
        }
    }))
    .unwrap();
    let set = from("readings")
        .superpose(
            SuperpositionParams::new("temperature")
                .interpretation("a", "sensor_a")
                .interpretation("b", "sensor_b"),
        )
        .name("temperatures")
        .build()
        .unwrap();
    let result = ChainExecutor::new(&provider).execute(&set).unwrap();

    assert!(result
        .columns
        .contains(&"temperature__interpretations".to_string()));
    assert_eq!(
        result.rows[0]["temperature__interpretations"],
        json!({"a": "20", "b": 20})
    );
    assert_eq!(result.rows[0][SUPERPOSED_COLUMN], json!(false));
    assert_eq!(result.rows[1][SUPERPOSED_COLUMN], json!(true));
    assert_eq!(
        result.rows[2]["temperature__interpretations"],
        json!({"a": null, "b": "5"})
    );
    assert_eq!(result.rows[2][SUPERPOSED_COLUMN], json!(false));
}
