//! CLI Command Tests
//!
//! Commands are driven through their library entry points with files in a
//! temporary directory.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use noema::cli::{self, CliErrorCode, Config};
use noema::epistemic::{Event, Frame, GroundingRef};
use noema::operator::{
    AggregateParams, Aggregation, ChainBuilder, Evaluation, TemporalSemantics, TimePoint,
};
use noema::predicate::Predicate;
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn ts() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn write(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn counts_chain() -> Value {
    ChainBuilder::new()
        .entry("entities")
        .as_of(TimePoint::At(ts()), TemporalSemantics::ValidTime, Evaluation::Static)
        .unwrap()
        .filter(Predicate::is_not_null("type"))
        .aggregate(AggregateParams::group_by(["type"]).with(Aggregation::count_all("count")))
        .name("entity counts")
        .into_chain()
        .to_value()
}

fn sources() -> Value {
    json!({
        "sources": {
            "entities": [
                {"id": "a", "type": "person"},
                {"id": "b", "type": "company"},
                {"id": "c", "type": "person"},
                {"id": "d", "type": "company"},
                {"id": "e"}
            ]
        }
    })
}

fn events() -> Value {
    let g1 = Event::given("g1", ts(), "alice")
        .unwrap()
        .with_workspace("w1")
        .with_reference(GroundingRef::external("ext:1"));
    let g2 = Event::given("g2", ts(), "bob").unwrap().with_workspace("w2");
    let m1 = Event::meant("m1", ts(), "alice", Frame::new("unsupported claim"))
        .unwrap()
        .with_workspace("w1");
    json!({ "events": [g1.to_value(), g2.to_value(), m1.to_value()] })
}

fn horizons() -> Value {
    json!([
        {"id": "w1-alice", "type": "SESSION", "name": "alice", "workspaces": ["w1"], "actors": ["alice"], "parent": "w1"},
        {"id": "w1", "type": "WORKSPACE", "name": "w1", "workspaces": ["w1"]},
        {"id": "w2", "type": "WORKSPACE", "name": "w2", "workspaces": ["w2"]}
    ])
}

// =============================================================================
// validate / execute
// =============================================================================

#[test]
fn test_validate_reports_set_and_event() {
    let dir = TempDir::new().unwrap();
    let chain = write(&dir, "chain.json", &counts_chain());

    let report = cli::validate(&Config::default(), &chain).unwrap();
    assert_eq!(report["valid"], json!(true));
    assert_eq!(report["produced_type"], json!("derived_value"));
    assert_eq!(report["set"]["strategy"], json!("aggregated"));
    assert_eq!(report["event"]["actor"], json!("system"));
    assert_eq!(report["event"]["epistemic_type"], json!("meant"));
}

#[test]
fn test_validate_invalid_chain_is_a_report_not_an_error() {
    let dir = TempDir::new().unwrap();
    let chain = ChainBuilder::new().entry("entities").into_chain().to_value();
    let chain = write(&dir, "chain.json", &chain);

    let report = cli::validate(&Config::default(), &chain).unwrap();
    assert_eq!(report["valid"], json!(false));
    assert_eq!(report["errors"].as_array().unwrap().len(), 2);
    assert!(report.get("set").is_none());
}

#[test]
fn test_validate_with_promoted_warnings() {
    let dir = TempDir::new().unwrap();
    let chain = write(&dir, "chain.json", &counts_chain());
    let config = Config {
        treat_warnings_as_errors: true,
        ..Config::default()
    };
    let report = cli::validate(&config, &chain).unwrap();
    assert_eq!(report["valid"], json!(false));
    assert_eq!(report["warnings"][0]["code"], json!("missing_grounding"));
}

#[test]
fn test_execute_groups_rows() {
    let dir = TempDir::new().unwrap();
    let chain = write(&dir, "chain.json", &counts_chain());
    let sources = write(&dir, "sources.json", &sources());

    let out = cli::execute(&Config::default(), &chain, &sources).unwrap();
    let rows = out["result"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["count"] == json!(2)));
    assert_eq!(out["metrics"]["executions"], json!(1));
    assert_eq!(out["metrics"]["chains_built"], json!(1));
}

#[test]
fn test_execute_respects_row_limit() {
    let dir = TempDir::new().unwrap();
    let chain = write(&dir, "chain.json", &counts_chain());
    let sources = write(&dir, "sources.json", &sources());
    let config = Config {
        max_rows: Some(3),
        ..Config::default()
    };

    let err = cli::execute(&config, &chain, &sources).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::CommandFailed);
    assert!(err.message().contains("NOEMA_EXECUTION_LIMIT"));
}

#[test]
fn test_execute_missing_sources_file() {
    let dir = TempDir::new().unwrap();
    let chain = write(&dir, "chain.json", &counts_chain());
    let err = cli::execute(&Config::default(), &chain, &dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::InputError);
}

// =============================================================================
// audit / gate / verify
// =============================================================================

#[test]
fn test_audit_lists_violations() {
    let dir = TempDir::new().unwrap();
    let events = write(&dir, "events.json", &events());

    let out = cli::audit(&events).unwrap();
    assert_eq!(out["events"], json!(3));
    assert_eq!(out["clean"], json!(2));
    assert_eq!(out["violations"][0]["event_id"], json!("m1"));
    assert_eq!(out["violations"][0]["code"], json!("empty_meant_grounding"));
}

#[test]
fn test_gate_lists_available_and_denied() {
    let dir = TempDir::new().unwrap();
    let events = write(&dir, "events.json", &events());
    let horizons = write(&dir, "horizons.json", &horizons());

    let out = cli::gate(&events, &horizons, "w1").unwrap();
    assert_eq!(out["available"], json!(["g1", "m1"]));
    assert_eq!(out["denied"], json!([{"event_id": "g2", "reason": "workspace"}]));
    assert_eq!(out["metrics"]["gate_denials"], json!(1));
    // one availability decision per event; explaining a denial is not a check
    assert_eq!(out["metrics"]["gate_checks"], json!(3));

    let err = cli::gate(&events, &horizons, "nope").unwrap_err();
    assert!(err.message().contains("NOEMA_UNKNOWN_HORIZON"));
}

#[test]
fn test_verify_restrictivity() {
    let dir = TempDir::new().unwrap();
    let events = write(&dir, "events.json", &events());
    let horizons = write(&dir, "horizons.json", &horizons());

    let out = cli::verify(&events, &horizons, "w1", "w1-alice").unwrap();
    assert_eq!(out["holds"], json!(true));

    let out = cli::verify(&events, &horizons, "w1", "w2").unwrap();
    assert_eq!(out["holds"], json!(false));
    assert_eq!(out["check"]["event_id"], json!("g2"));
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "noema.json",
        &json!({"log_level": "warn", "max_rows": 500, "default_actor": "pipeline"}),
    );
    let config = Config::resolve(Some(&path)).unwrap();
    assert_eq!(config.max_rows, Some(500));
    assert_eq!(config.default_actor, "pipeline");
    assert!(!config.treat_warnings_as_errors);
}

#[test]
fn test_invalid_config_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noema.json");
    fs::write(&path, "{not json").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.code_str(), "NOEMA_CLI_CONFIG_ERROR");
}
