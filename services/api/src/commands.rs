use crate::infra::decision_service;
use clap::Args;
use loan_approval::config::{AppConfig, ModelConfig};
use loan_approval::error::AppError;
use loan_approval::telemetry;
use loan_approval::underwriting::{
    ApplicantRecord, ArtifactBundle, FeatureImportance, HistoricalDataset, MissingFieldPolicy,
    PredictionResult, Predictor, Trainer, TrainingConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct TrainArgs {
    /// Historical applications CSV with a Loan_Status column
    #[arg(long)]
    pub(crate) data: PathBuf,
    /// Where to write the bundle (defaults to LOAN_ARTIFACT_PATH)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Share of rows held out for accuracy reporting
    #[arg(long, default_value_t = 0.2)]
    pub(crate) holdout: f64,
    /// Seed for the train/holdout shuffle
    #[arg(long, default_value_t = 42)]
    pub(crate) seed: u64,
}

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// JSON document mapping field names to values
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Override the configured model bundle path
    #[arg(long)]
    pub(crate) artifact: Option<PathBuf>,
    /// Fill absent fields from the bundle's statistics instead of rejecting them
    #[arg(long)]
    pub(crate) impute: bool,
}

#[derive(Args, Debug)]
pub(crate) struct InspectArgs {
    /// Override the configured model bundle path
    #[arg(long)]
    pub(crate) artifact: Option<PathBuf>,
}

pub(crate) fn run_train(args: TrainArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let (dataset, bundle, output) = train(&args, &config.model.artifact_path)?;
    let predictor = Predictor::new(Arc::new(bundle))?;
    print!(
        "{}",
        render_training(&dataset, predictor.bundle(), predictor.top_factors(), &output)
    );
    Ok(())
}

pub(crate) fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    if args.impute {
        config.model.missing_fields = MissingFieldPolicy::Impute;
    }

    let applicant = read_applicant(&args.input)?;
    let service = decision_service(&config.model, args.artifact)?;
    let result = service.decide(applicant)?;

    print!("{}", render_decision(&result));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub(crate) fn run_inspect(args: InspectArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let path = bundle_path(&config.model, args.artifact);
    let predictor = Predictor::load(&path)?;
    println!("Model bundle: {}", path.display());
    println!("{}", serde_json::to_string_pretty(&predictor.summary())?);
    Ok(())
}

fn bundle_path(config: &ModelConfig, artifact: Option<PathBuf>) -> PathBuf {
    artifact.unwrap_or_else(|| config.artifact_path.clone())
}

pub(crate) fn train(
    args: &TrainArgs,
    default_output: &Path,
) -> Result<(HistoricalDataset, ArtifactBundle, PathBuf), AppError> {
    let dataset = HistoricalDataset::from_path(&args.data)?;
    let trainer = Trainer::new(TrainingConfig {
        holdout_fraction: args.holdout,
        seed: args.seed,
        ..TrainingConfig::default()
    });
    let bundle = trainer.train(&dataset.records)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output.to_path_buf());
    bundle.save(&output)?;
    Ok((dataset, bundle, output))
}

pub(crate) fn read_applicant(path: &Path) -> Result<ApplicantRecord, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let applicant: ApplicantRecord = serde_json::from_str(&raw)?;
    applicant.check_ranges()?;
    Ok(applicant)
}

pub(crate) fn render_training(
    dataset: &HistoricalDataset,
    bundle: &ArtifactBundle,
    top_factors: &[FeatureImportance],
    output: &Path,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Loaded {} of {} rows from the historical dataset\n",
        dataset.len(),
        dataset.rows_read
    ));
    for error in &dataset.row_errors {
        out.push_str(&format!("  skipped line {}: {}\n", error.line, error.message));
    }

    if let Some(summary) = bundle.training() {
        out.push_str(&format!(
            "Trained on {} rows ({} held out, seed {}) in {} iterations{}\n",
            summary.training_rows,
            summary.holdout_rows,
            summary.seed,
            summary.iterations,
            if summary.converged { "" } else { " (not converged)" }
        ));
        match summary.holdout_accuracy {
            Some(accuracy) => out.push_str(&format!("Holdout accuracy: {:.0}%\n", accuracy * 100.0)),
            None => out.push_str("Holdout accuracy: n/a (no holdout rows)\n"),
        }
    }

    out.push_str("Top factors:\n");
    out.push_str(&render_factors(top_factors));
    out.push_str(&format!("Bundle written to {}\n", output.display()));
    out
}

pub(crate) fn render_decision(result: &PredictionResult) -> String {
    let mut out = format!(
        "Status: {} | Confidence: {} | Risk: {} ({})\n",
        result.status,
        result.confidence_percent(),
        result.risk_tier,
        result.risk_score_percent()
    );
    out.push_str("Top factors:\n");
    out.push_str(&render_factors(&result.top_factors));
    for fallback in &result.category_fallbacks {
        out.push_str(&format!(
            "Note: {} value '{}' was not seen in training; scored as '{}'\n",
            fallback.field.name(),
            fallback.observed,
            fallback.substituted.as_deref().unwrap_or("code 0")
        ));
    }
    out
}

fn render_factors(factors: &[FeatureImportance]) -> String {
    factors
        .iter()
        .map(|factor| format!("  - {}: {:.3}\n", factor.feature, factor.importance))
        .collect()
}
