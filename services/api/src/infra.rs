use loan_approval::config::ModelConfig;
use loan_approval::underwriting::{
    ArtifactError, AuditEntry, AuditError, AuditSink, CsvAuditLog, DecisionService,
    ModelRegistry,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Audit destination chosen by configuration.
pub(crate) enum AuditTrail {
    Csv(CsvAuditLog),
    Disabled,
}

impl AuditTrail {
    pub(crate) fn from_config(config: &ModelConfig) -> Self {
        match &config.audit_log {
            Some(path) => Self::Csv(CsvAuditLog::new(path.clone())),
            None => Self::Disabled,
        }
    }
}

impl AuditSink for AuditTrail {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        match self {
            AuditTrail::Csv(log) => log.record(entry),
            AuditTrail::Disabled => Ok(()),
        }
    }
}

/// Load the configured bundle (or `artifact` when given) and wire the
/// decision service around it.
pub(crate) fn decision_service(
    config: &ModelConfig,
    artifact: Option<PathBuf>,
) -> Result<DecisionService<AuditTrail>, ArtifactError> {
    let path = artifact.unwrap_or_else(|| config.artifact_path.clone());
    let registry = ModelRegistry::load(&path, config.missing_fields)?;
    let audit = AuditTrail::from_config(config);

    info!(
        artifact = %path.display(),
        audit_log = %config
            .audit_log
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "disabled".to_string()),
        missing_fields = config.missing_fields.label(),
        "decision service configured"
    );

    Ok(DecisionService::new(Arc::new(registry), Arc::new(audit)))
}
