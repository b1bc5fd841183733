use std::sync::Arc;

use super::audit::{AuditEntry, AuditError, AuditSink};
use super::predictor::{ModelSummary, PredictionResult};
use super::record::ApplicantRecord;
use super::registry::{ModelRegistry, RegistryError};
use super::schema::SchemaError;

/// Service composing the model registry and the audit trail.
pub struct DecisionService<A> {
    registry: Arc<ModelRegistry>,
    audit: Arc<A>,
}

impl<A> DecisionService<A>
where
    A: AuditSink + 'static,
{
    pub fn new(registry: Arc<ModelRegistry>, audit: Arc<A>) -> Self {
        Self { registry, audit }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Score one applicant and append the outcome to the audit trail.
    ///
    /// The result is only returned once it has been recorded.
    pub fn decide(
        &self,
        applicant: ApplicantRecord,
    ) -> Result<PredictionResult, DecisionServiceError> {
        let predictor = self.registry.current();
        let result = predictor.predict(&applicant)?;
        self.audit.record(&AuditEntry::new(applicant, &result))?;
        Ok(result)
    }

    pub fn model_summary(&self) -> ModelSummary {
        self.registry.current().summary()
    }

    /// Reload the bundle from disk and return the new summary.
    pub fn reload(&self) -> Result<ModelSummary, DecisionServiceError> {
        Ok(self.registry.reload()?.summary())
    }
}

/// Error raised by the decision service.
#[derive(Debug, thiserror::Error)]
pub enum DecisionServiceError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
