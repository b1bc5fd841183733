use std::sync::Arc;

use super::common::*;

use crate::underwriting::record::ApplicantRecord;
use crate::underwriting::registry::{ModelRegistry, RegistryError};
use crate::underwriting::schema::SchemaError;
use crate::underwriting::{
    DecisionService, DecisionServiceError, DecisionStatus, MissingFieldPolicy, Predictor,
    RiskTier,
};

#[test]
fn decide_records_an_audit_entry() {
    let (service, audit) = build_service();

    let result = service
        .decide(strong_applicant())
        .expect("decision succeeds");

    let entries = audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, result.status);
    assert_eq!(entries[0].risk_tier, RiskTier::Low);
    assert_eq!(entries[0].confidence, result.confidence);
    assert_eq!(entries[0].applicant, strong_applicant());
}

#[test]
fn schema_errors_are_not_audited() {
    let (service, audit) = build_service();
    let record = ApplicantRecord {
        credit_history: None,
        ..strong_applicant()
    };

    let error = service.decide(record).expect_err("missing field");
    assert!(matches!(
        error,
        DecisionServiceError::Schema(SchemaError::MissingField {
            field: "Credit_History"
        })
    ));
    assert!(audit.entries().is_empty());
}

#[test]
fn audit_failures_surface_to_the_caller() {
    let registry = Arc::new(ModelRegistry::new(predictor()));
    let service = DecisionService::new(registry, Arc::new(UnavailableAudit));

    let error = service
        .decide(strong_applicant())
        .expect_err("audit unavailable");
    assert!(matches!(error, DecisionServiceError::Audit(_)));
}

#[test]
fn reload_without_a_source_is_refused() {
    let (service, _) = build_service();
    assert!(matches!(
        service.reload(),
        Err(DecisionServiceError::Registry(RegistryError::NoSource))
    ));
}

#[test]
fn reload_swaps_in_the_bundle_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bundle.json");
    synthetic_bundle().save(&path).expect("bundle saves");

    let registry = Arc::new(
        ModelRegistry::load(&path, MissingFieldPolicy::Impute).expect("registry loads"),
    );
    let service = DecisionService::new(registry.clone(), Arc::new(MemoryAudit::default()));
    let before = registry.current();
    assert_eq!(
        service
            .decide(weak_applicant())
            .expect("decision succeeds")
            .status,
        DecisionStatus::Rejected
    );

    // Flip the sign of Credit_History so the weak applicant is approved.
    let mut weights = synthetic_weights();
    weights[9] = -1.5;
    weighted_bundle(weights, SYNTHETIC_BIAS)
        .save(&path)
        .expect("replacement saves");

    let summary = service.reload().expect("reload succeeds");
    assert_eq!(summary.missing_fields, MissingFieldPolicy::Impute);
    assert_eq!(
        service
            .decide(weak_applicant())
            .expect("decision succeeds")
            .status,
        DecisionStatus::Approved
    );

    // Snapshots taken before the swap keep scoring with the old bundle.
    assert_eq!(
        before
            .predict(&weak_applicant())
            .expect("prediction")
            .status,
        DecisionStatus::Rejected
    );
}

#[test]
fn failed_reload_keeps_the_serving_model() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bundle.json");
    synthetic_bundle().save(&path).expect("bundle saves");

    let registry =
        ModelRegistry::load(&path, MissingFieldPolicy::Reject).expect("registry loads");
    std::fs::write(&path, b"{}").expect("truncate bundle");

    assert!(matches!(registry.reload(), Err(RegistryError::Artifact(_))));
    assert_eq!(
        registry
            .current()
            .predict(&strong_applicant())
            .expect("prediction")
            .status,
        DecisionStatus::Approved
    );
}

#[test]
fn publish_replaces_the_current_predictor() {
    let registry = ModelRegistry::new(predictor());
    let replacement = Predictor::new(Arc::new(weighted_bundle(vec![0.0; 11], -3.0)))
        .expect("predictor builds");

    registry.publish(replacement);

    let result = registry
        .current()
        .predict(&strong_applicant())
        .expect("prediction");
    assert_eq!(result.status, DecisionStatus::Rejected);
    assert_eq!(result.risk_tier, RiskTier::High);
}
