use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::underwriting::audit::{AuditEntry, AuditError, AuditSink};
use crate::underwriting::dataset::LabeledRecord;
use crate::underwriting::model::LinearModel;
use crate::underwriting::preprocess::{
    CategoryVocabulary, ImputationStatistics, PreprocessingState, ScalingParameters,
};
use crate::underwriting::record::ApplicantRecord;
use crate::underwriting::registry::ModelRegistry;
use crate::underwriting::schema::{feature_names, CategoricalField, NumericField};
use crate::underwriting::{ArtifactBundle, DecisionService, Predictor};

pub(super) const TOLERANCE: f64 = 1e-9;

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

fn vocabulary(values: &[&str]) -> CategoryVocabulary {
    CategoryVocabulary::from_ordered(values.iter().map(|value| value.to_string()).collect())
}

/// Preprocessing state with round numbers so encodings can be checked by hand.
///
/// `Loan_Amount_Term` has zero deviation, so it is centred but not divided.
pub(super) fn synthetic_state() -> PreprocessingState {
    let vocabularies = BTreeMap::from([
        (CategoricalField::Gender, vocabulary(&["Female", "Male"])),
        (CategoricalField::Married, vocabulary(&["No", "Yes"])),
        (CategoricalField::Dependents, vocabulary(&["0", "1", "2", "3+"])),
        (
            CategoricalField::Education,
            vocabulary(&["Graduate", "Not Graduate"]),
        ),
        (CategoricalField::SelfEmployed, vocabulary(&["No", "Yes"])),
        (
            CategoricalField::PropertyArea,
            vocabulary(&["Rural", "Semiurban", "Urban"]),
        ),
    ]);

    let scaling = BTreeMap::from([
        (
            NumericField::ApplicantIncome,
            ScalingParameters {
                mean: 5000.0,
                std_dev: 2500.0,
            },
        ),
        (
            NumericField::CoapplicantIncome,
            ScalingParameters {
                mean: 1500.0,
                std_dev: 1500.0,
            },
        ),
        (
            NumericField::LoanAmount,
            ScalingParameters {
                mean: 150.0,
                std_dev: 50.0,
            },
        ),
        (
            NumericField::LoanAmountTerm,
            ScalingParameters {
                mean: 360.0,
                std_dev: 0.0,
            },
        ),
        (
            NumericField::CreditHistory,
            ScalingParameters {
                mean: 0.75,
                std_dev: 0.25,
            },
        ),
    ]);

    let imputation = ImputationStatistics {
        categorical: BTreeMap::from([
            (CategoricalField::Gender, "Male".to_string()),
            (CategoricalField::Married, "Yes".to_string()),
            (CategoricalField::Dependents, "0".to_string()),
            (CategoricalField::Education, "Graduate".to_string()),
            (CategoricalField::SelfEmployed, "No".to_string()),
            (CategoricalField::PropertyArea, "Semiurban".to_string()),
        ]),
        numeric: BTreeMap::from([
            (NumericField::ApplicantIncome, 5000.0),
            (NumericField::CoapplicantIncome, 1500.0),
            (NumericField::LoanAmount, 150.0),
            (NumericField::LoanAmountTerm, 360.0),
            (NumericField::CreditHistory, 0.75),
        ]),
    };

    PreprocessingState::new(vocabularies, scaling, imputation)
}

/// Weights in model column order: only Married, ApplicantIncome, LoanAmount,
/// and Credit_History contribute.
pub(super) fn synthetic_weights() -> Vec<f64> {
    vec![0.0, 0.5, 0.0, 0.0, 0.0, 0.4, 0.0, -0.6, 0.0, 1.5, 0.0]
}

pub(super) const SYNTHETIC_BIAS: f64 = 0.25;

pub(super) fn weighted_bundle(weights: Vec<f64>, bias: f64) -> ArtifactBundle {
    ArtifactBundle::new(
        feature_names(),
        LinearModel::new(weights, bias),
        synthetic_state(),
    )
    .expect("synthetic bundle is consistent")
}

pub(super) fn synthetic_bundle() -> ArtifactBundle {
    weighted_bundle(synthetic_weights(), SYNTHETIC_BIAS)
}

pub(super) fn predictor() -> Predictor {
    Predictor::new(Arc::new(synthetic_bundle())).expect("predictor builds")
}

/// Encodes to Married=1, ApplicantIncome=1, LoanAmount=-1, Credit_History=1,
/// so `z = 0.5 + 0.4 + 0.6 + 1.5 + 0.25 = 3.25`.
pub(super) fn strong_applicant() -> ApplicantRecord {
    ApplicantRecord {
        gender: Some("Male".to_string()),
        married: Some("Yes".to_string()),
        dependents: Some("0".to_string()),
        education: Some("Graduate".to_string()),
        self_employed: Some("No".to_string()),
        applicant_income: Some(7500.0),
        coapplicant_income: Some(0.0),
        loan_amount: Some(100.0),
        loan_amount_term: Some(360.0),
        credit_history: Some(1.0),
        property_area: Some("Urban".to_string()),
    }
}

/// Encodes to Married=0, ApplicantIncome=-1, LoanAmount=1, Credit_History=-3,
/// so `z = -0.4 - 0.6 - 4.5 + 0.25 = -5.25`.
pub(super) fn weak_applicant() -> ApplicantRecord {
    ApplicantRecord {
        married: Some("No".to_string()),
        applicant_income: Some(2500.0),
        loan_amount: Some(200.0),
        credit_history: Some(0.0),
        property_area: Some("Rural".to_string()),
        ..strong_applicant()
    }
}

pub(super) const STRONG_DECISION_VALUE: f64 = 3.25;
pub(super) const WEAK_DECISION_VALUE: f64 = -5.25;

/// Forty historical applications whose outcome follows credit history.
pub(super) fn labeled_history() -> Vec<LabeledRecord> {
    const AREAS: [&str; 3] = ["Urban", "Semiurban", "Rural"];
    const DEPENDENTS: [&str; 4] = ["0", "1", "2", "3+"];

    (0..40usize)
        .map(|i| {
            let good_credit = i % 4 != 0;
            let record = ApplicantRecord {
                gender: (i != 11).then(|| if i % 5 < 3 { "Male" } else { "Female" }.to_string()),
                married: Some(if i % 3 == 0 { "No" } else { "Yes" }.to_string()),
                dependents: Some(DEPENDENTS[(i / 3) % 4].to_string()),
                education: Some(if i % 5 == 0 { "Not Graduate" } else { "Graduate" }.to_string()),
                self_employed: Some(if i % 7 == 3 { "Yes" } else { "No" }.to_string()),
                applicant_income: Some(3000.0 + ((i * 737) % 5000) as f64),
                coapplicant_income: Some(((i * 311) % 2000) as f64),
                loan_amount: (i != 7).then(|| 90.0 + ((i * 13) % 120) as f64),
                loan_amount_term: Some(if i % 5 == 0 { 180.0 } else { 360.0 }),
                credit_history: Some(if good_credit { 1.0 } else { 0.0 }),
                property_area: Some(AREAS[i % 3].to_string()),
            };
            LabeledRecord {
                record,
                approved: good_credit,
            }
        })
        .collect()
}

/// Audit sink that keeps entries in memory.
#[derive(Default)]
pub(super) struct MemoryAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAudit {
    pub(super) fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push(entry.clone());
        Ok(())
    }
}

/// Audit sink whose storage is always unavailable.
pub(super) struct UnavailableAudit;

impl AuditSink for UnavailableAudit {
    fn record(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
        Err(AuditError::Io {
            path: "unavailable.csv".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

pub(super) fn build_service() -> (DecisionService<MemoryAudit>, Arc<MemoryAudit>) {
    let audit = Arc::new(MemoryAudit::default());
    let registry = Arc::new(ModelRegistry::new(predictor()));
    (DecisionService::new(registry, audit.clone()), audit)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
