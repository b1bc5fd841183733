//! Loan application underwriting: applicant schema, preprocessing, model
//! training, and single-record decisions with risk and factor attribution.
//!
//! Offline, [`Trainer`] turns a [`HistoricalDataset`] into an [`ArtifactBundle`].
//! Online, a [`Predictor`] built from that bundle scores one [`ApplicantRecord`]
//! at a time; [`DecisionService`] adds the audit trail and [`decision_router`]
//! puts it behind HTTP.

pub mod artifact;
pub mod audit;
pub mod dataset;
pub mod model;
pub mod predictor;
pub mod preprocess;
pub mod record;
pub mod registry;
pub mod router;
pub mod schema;
pub mod service;
pub mod trainer;

#[cfg(test)]
mod tests;

pub use artifact::{ArtifactBundle, ArtifactError, BUNDLE_FORMAT_VERSION};
pub use audit::{AuditEntry, AuditError, AuditSink, CsvAuditLog};
pub use dataset::{DatasetError, HistoricalDataset, LabeledRecord, RowError};
pub use model::LinearModel;
pub use predictor::{
    DecisionStatus, FeatureImportance, MissingFieldPolicy, ModelSummary, PredictionResult,
    Predictor, RiskTier,
};
pub use preprocess::{
    CategoryFallback, CategoryVocabulary, EncodedRecord, ImputationStatistics,
    PreprocessingState, ScalingParameters,
};
pub use record::{ApplicantRecord, RawValue};
pub use registry::{ModelRegistry, RegistryError};
pub use router::decision_router;
pub use schema::{CategoricalField, Feature, FieldKind, NumericField, SchemaError, FEATURE_ORDER};
pub use service::{DecisionService, DecisionServiceError};
pub use trainer::{Trainer, TrainingConfig, TrainingError, TrainingSummary};
