use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::artifact::{ArtifactBundle, ArtifactError};
use super::preprocess::CategoryFallback;
use super::record::ApplicantRecord;
use super::schema::{Feature, SchemaError};
use super::trainer::TrainingSummary;

/// `p(Approved)` at or above this is an approval.
pub const APPROVAL_THRESHOLD: f64 = 0.5;
/// Risk scores below this are [`RiskTier::Low`].
pub const MEDIUM_RISK_FROM: f64 = 0.30;
/// Risk scores at or above this are [`RiskTier::High`].
pub const HIGH_RISK_FROM: f64 = 0.70;
/// Number of factors reported with every decision.
pub const TOP_FACTOR_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionStatus {
    Approved,
    Rejected,
}

impl DecisionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DecisionStatus::Approved => "Approved",
            DecisionStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_score(risk_score: f64) -> Self {
        if risk_score < MEDIUM_RISK_FROM {
            RiskTier::Low
        } else if risk_score < HIGH_RISK_FROM {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Global contribution of one feature: the magnitude of its weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub status: DecisionStatus,
    /// Probability of the returned status.
    pub confidence: f64,
    pub risk_tier: RiskTier,
    /// Probability of rejection.
    pub risk_score: f64,
    pub approval_probability: f64,
    pub top_factors: Vec<FeatureImportance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_fallbacks: Vec<CategoryFallback>,
}

impl PredictionResult {
    /// Confidence as a whole percentage, e.g. `"87%"`.
    pub fn confidence_percent(&self) -> String {
        format_percent(self.confidence)
    }

    pub fn risk_score_percent(&self) -> String {
        format_percent(self.risk_score)
    }
}

fn format_percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

/// How a record with absent fields is treated at prediction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Absent fields are a [`SchemaError::MissingField`].
    #[default]
    Reject,
    /// Absent fields take the bundle's imputation statistics.
    Impute,
}

impl MissingFieldPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(Self::Reject),
            "impute" => Some(Self::Impute),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MissingFieldPolicy::Reject => "reject",
            MissingFieldPolicy::Impute => "impute",
        }
    }
}

/// Read-only description of the loaded bundle.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub format_version: u32,
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub top_factors: Vec<FeatureImportance>,
    pub missing_fields: MissingFieldPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingSummary>,
}

/// Scores single applicant records against one immutable bundle.
///
/// A predictor holds no mutable state, so one instance can be shared across
/// threads and every call on the same record returns the same result.
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: Arc<ArtifactBundle>,
    columns: Vec<Feature>,
    top_factors: Vec<FeatureImportance>,
    missing_fields: MissingFieldPolicy,
}

impl Predictor {
    pub fn new(bundle: Arc<ArtifactBundle>) -> Result<Self, ArtifactError> {
        let columns = bundle.columns()?;
        let top_factors = rank_factors(bundle.feature_names(), &bundle.model().weights);
        Ok(Self {
            bundle,
            columns,
            top_factors,
            missing_fields: MissingFieldPolicy::default(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        Self::new(Arc::new(ArtifactBundle::load(path)?))
    }

    pub fn with_missing_field_policy(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_fields = policy;
        self
    }

    pub fn bundle(&self) -> &Arc<ArtifactBundle> {
        &self.bundle
    }

    pub fn missing_field_policy(&self) -> MissingFieldPolicy {
        self.missing_fields
    }

    /// Features ranked by descending weight magnitude, ties in column order.
    pub fn top_factors(&self) -> &[FeatureImportance] {
        &self.top_factors
    }

    pub fn predict(&self, record: &ApplicantRecord) -> Result<PredictionResult, SchemaError> {
        if self.missing_fields == MissingFieldPolicy::Reject {
            if let Some(feature) = self
                .columns
                .iter()
                .find(|feature| !record.is_present(**feature))
            {
                return Err(SchemaError::MissingField {
                    field: feature.name(),
                });
            }
        }

        let encoded = self
            .bundle
            .preprocessing()
            .apply_columns(record, &self.columns);
        let approval_probability = self.bundle.model().approval_probability(&encoded.values);

        let result = decide(approval_probability, self.top_factors.clone(), encoded.fallbacks);
        debug!(
            status = %result.status,
            risk_tier = %result.risk_tier,
            approval_probability,
            imputed = encoded.imputed.len(),
            "applicant scored"
        );
        Ok(result)
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            format_version: self.bundle.format_version(),
            schema_version: self.bundle.schema_version(),
            created_at: self.bundle.created_at(),
            feature_names: self.bundle.feature_names().to_vec(),
            top_factors: self.top_factors.clone(),
            missing_fields: self.missing_fields,
            training: self.bundle.training().cloned(),
        }
    }
}

/// Derive status, confidence, and risk from `p(Approved)`.
pub fn decide(
    approval_probability: f64,
    top_factors: Vec<FeatureImportance>,
    category_fallbacks: Vec<CategoryFallback>,
) -> PredictionResult {
    let risk_score = 1.0 - approval_probability;
    let status = if approval_probability >= APPROVAL_THRESHOLD {
        DecisionStatus::Approved
    } else {
        DecisionStatus::Rejected
    };
    let confidence = match status {
        DecisionStatus::Approved => approval_probability,
        DecisionStatus::Rejected => risk_score,
    };

    PredictionResult {
        status,
        confidence,
        risk_tier: RiskTier::from_score(risk_score),
        risk_score,
        approval_probability,
        top_factors,
        category_fallbacks,
    }
}

fn rank_factors(names: &[String], weights: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(weights)
        .map(|(name, weight)| FeatureImportance {
            feature: name.clone(),
            importance: weight.abs(),
        })
        .collect();
    // Stable sort keeps column order among equal magnitudes.
    ranked.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(TOP_FACTOR_COUNT);
    ranked
}
