//! Chain Validation Tests
//!
//! - Structural rejections: entry first, designate last, temporal context
//! - Epistemic rejections: join policy, synthesis evidence, absence basis
//! - Produced type: compute forces derived_value
//! - SetDefinition and its set-defined event

use chrono::{DateTime, Utc};
use noema::epistemic::{EpistemicType, Grounding, GroundingKind, GroundingRef};
use noema::operator::{
    build_chain, AbsenceParams, AggregateParams, Aggregation, BuildOptions, ChainBuilder,
    ChainValidator, ConflictPolicy, DesignateParams, EntryParams, Evaluation, IssueCode, JoinParams, OperatorChain,
    OperatorErrorCode, OperatorInvocation, OperatorKind, OperatorParams, SetStrategy,
    SynthesisParams, TemporalSemantics, TimePoint,
};
use noema::predicate::Predicate;

// =============================================================================
// Helper Functions
// =============================================================================

fn ts() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn grounded(builder: ChainBuilder) -> ChainBuilder {
    builder.with_grounding(Grounding::new().with_reference(GroundingRef::structural("g-src")))
}

fn temporal(builder: ChainBuilder) -> ChainBuilder {
    builder
        .as_of(TimePoint::At(ts()), TemporalSemantics::ValidTime, Evaluation::Static)
        .unwrap()
}

fn error_codes(chain: &OperatorChain) -> Vec<IssueCode> {
    ChainValidator::validate(chain)
        .errors
        .into_iter()
        .map(|i| i.code)
        .collect()
}

/// entry -> as_of, as a plain chain that bypasses builder checks
fn base_chain() -> OperatorChain {
    temporal(ChainBuilder::new().entry("people")).into_chain()
}

fn designate(chain: OperatorChain) -> OperatorChain {
    let step = chain.len();
    chain.push(OperatorInvocation::new(
        format!("designate-{}", step),
        OperatorParams::Designate(DesignateParams {
            name: "set".into(),
            description: None,
        }),
        EpistemicType::Given,
    ))
}

// =============================================================================
// Structural Rejections
// =============================================================================

#[test]
fn test_rejects_chain_not_starting_with_entry() {
    let chain = temporal(ChainBuilder::new().filter(Predicate::eq("a", 1)))
        .name("x")
        .into_chain();
    assert_eq!(error_codes(&chain), vec![IssueCode::MissingEntry]);
}

#[test]
fn test_rejects_chain_not_ending_with_designate() {
    let chain = base_chain();
    assert_eq!(error_codes(&chain), vec![IssueCode::MissingDesignate]);
}

#[test]
fn test_rejects_chain_without_temporal_projection() {
    let chain = ChainBuilder::new().entry("people").name("people").into_chain();
    assert_eq!(error_codes(&chain), vec![IssueCode::MissingTemporal]);
}

#[test]
fn test_rejects_empty_chain() {
    assert_eq!(error_codes(&OperatorChain::new()), vec![IssueCode::EmptyChain]);
}

// =============================================================================
// Epistemic Rejections
// =============================================================================

#[test]
fn test_rejects_join_without_policy() {
    let chain = designate(base_chain().push(OperatorInvocation::new(
        "connect-2",
        OperatorParams::Connect(JoinParams::on("orders", "id", "person_id")),
        EpistemicType::Given,
    )));
    assert_eq!(error_codes(&chain), vec![IssueCode::JoinWithoutPolicy]);

    let err = ChainBuilder::new()
        .entry("people")
        .join(JoinParams::on("orders", "id", "person_id"))
        .unwrap_err();
    assert_eq!(err.code(), OperatorErrorCode::JoinPolicyRequired);
}

#[test]
fn test_rejects_synthesis_without_evidence() {
    let chain = designate(base_chain().push(OperatorInvocation::new(
        "synthesize-2",
        OperatorParams::Synthesize(SynthesisParams::new("crm:1", "erp:9")),
        EpistemicType::Meant,
    )));
    assert_eq!(error_codes(&chain), vec![IssueCode::SynthesisWithoutEvidence]);

    let err = ChainBuilder::new()
        .entry("people")
        .synthesize(SynthesisParams::new("crm:1", "erp:9"))
        .unwrap_err();
    assert_eq!(err.code(), OperatorErrorCode::EvidenceRequired);
}

#[test]
fn test_rejects_absence_without_basis() {
    let chain = designate(base_chain().push(OperatorInvocation::new(
        "assert_absence-2",
        OperatorParams::AssertAbsence(AbsenceParams::new("every person has an order", "orders", "id")),
        EpistemicType::Meant,
    )));
    assert_eq!(error_codes(&chain), vec![IssueCode::AbsenceWithoutBasis]);

    let err = ChainBuilder::new()
        .entry("people")
        .assert_absence(AbsenceParams::new("x", "orders", "id").basis("   "))
        .unwrap_err();
    assert_eq!(err.code(), OperatorErrorCode::AbsenceBasisRequired);
}

#[test]
fn test_dynamic_evaluation_only_for_now() {
    let err = ChainBuilder::new()
        .entry("people")
        .as_of(TimePoint::At(ts()), TemporalSemantics::ValidTime, Evaluation::Dynamic)
        .unwrap_err();
    assert_eq!(err.code(), OperatorErrorCode::TemporalInvalid);
}

// =============================================================================
// Produced Type
// =============================================================================

#[test]
fn test_compute_forces_derived_value() {
    use OperatorKind::*;
    assert_eq!(
        OperatorKind::chain_produced_type(&[Entry, Restrict, Aggregate, Designate]),
        EpistemicType::DerivedValue
    );
    assert_eq!(
        OperatorKind::chain_produced_type(&[Entry, Restrict, Designate]),
        EpistemicType::Given
    );

    let chain = temporal(ChainBuilder::new().entry("people"))
        .filter(Predicate::eq("kind", "person"))
        .aggregate(AggregateParams::group_by(["kind"]).with(Aggregation::count_all("n")))
        .name("counts")
        .into_chain();
    assert_eq!(chain.produced_type(), EpistemicType::DerivedValue);
    assert!(ChainValidator::validate(&chain).is_valid());
}

// =============================================================================
// Build Results
// =============================================================================

#[test]
fn test_missing_grounding_is_a_warning_unless_promoted() {
    let chain = temporal(ChainBuilder::new().entry("people"))
        .name("people")
        .into_chain();

    let set = build_chain(chain.clone(), BuildOptions::default()).unwrap();
    assert_eq!(set.warnings().len(), 1);
    assert_eq!(set.warnings()[0].code, IssueCode::MissingGrounding);

    let strict = BuildOptions {
        treat_warnings_as_errors: true,
        metrics: None,
    };
    let err = build_chain(chain, strict).unwrap_err();
    assert_eq!(err.code(), OperatorErrorCode::ChainInvalid);
    assert_eq!(err.issues()[0].code, IssueCode::MissingGrounding);
}

#[test]
fn test_set_definition_and_event() {
    let set = grounded(temporal(ChainBuilder::new().entry_as("people", "p")))
        .join(JoinParams::on("orders", "id", "person_id").policy(ConflictPolicy::Cluster))
        .unwrap()
        .name("people with orders")
        .build()
        .unwrap();

    assert_eq!(set.name(), "people with orders");
    assert_eq!(set.strategy(), SetStrategy::Joined);
    assert_eq!(set.source_refs(), &["people".to_string(), "orders".to_string()]);
    assert_eq!(set.fingerprint().len(), 64);
    assert!(set.warnings().is_empty());

    let event = set.to_event("system", ts()).unwrap();
    assert!(event.is_meant());
    assert!(event.tags().contains("set_defined"));
    assert!(event.grounding().has_kind(GroundingKind::Structural));
    let operators = event.grounding().derivation().unwrap().operators();
    assert_eq!(operators.len(), 4);
    assert_eq!(operators[0], "entry");
}

#[test]
fn test_chain_structural_round_trip() {
    let chain = grounded(temporal(ChainBuilder::new().entry("people")))
        .hide(Predicate::is_null("email"))
        .name("people")
        .into_chain();
    let restored = OperatorChain::from_value(&chain.to_value()).unwrap();
    assert_eq!(restored.to_value(), chain.to_value());
    assert_eq!(restored.kinds(), chain.kinds());

    let err = OperatorChain::from_value(&serde_json::json!({"invocations": "nope"})).unwrap_err();
    assert_eq!(err.code(), OperatorErrorCode::ChainDecode);
}

#[test]
fn test_entry_params_shape() {
    let chain = ChainBuilder::new().entry_as("people", "p").into_chain();
    match chain.invocations()[0].params() {
        OperatorParams::Entry(EntryParams { source_id, alias }) => {
            assert_eq!(source_id, "people");
            assert_eq!(alias.as_deref(), Some("p"));
        }
        other => panic!("unexpected params {:?}", other),
    }
}
