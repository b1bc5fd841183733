//! Logistic regression training.
//!
//! The preprocessor is fit on every labeled record, the encoded rows are split
//! into a training and a holdout partition with a seeded shuffle, and the model
//! is fit on the training partition by Newton-Raphson on the L2-penalised
//! log-likelihood. The bias is not penalised.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::artifact::{ArtifactBundle, ArtifactError};
use super::dataset::LabeledRecord;
use super::model::{sigmoid, LinearModel};
use super::preprocess;
use super::record::ApplicantRecord;
use super::schema::{feature_names, SchemaError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    /// Share of rows held out for accuracy reporting, in `[0, 1)`.
    pub holdout_fraction: f64,
    pub seed: u64,
    pub max_iterations: usize,
    /// Newton iterations stop once no parameter moves by more than this.
    pub tolerance: f64,
    /// Inverse L2 strength; larger values regularise less.
    pub inverse_regularization: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
            seed: 42,
            max_iterations: 100,
            tolerance: 1e-8,
            inverse_regularization: 1.0,
        }
    }
}

/// Facts about a training run, stored alongside the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub training_rows: usize,
    pub holdout_rows: usize,
    /// Share of holdout rows classified correctly; `None` without a holdout.
    pub holdout_accuracy: Option<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub seed: u64,
    pub holdout_fraction: f64,
    pub inverse_regularization: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("training rows contain only {label} outcomes; both classes are required")]
    SingleClass { label: &'static str },
    #[error("newton step could not be solved at iteration {iteration}")]
    Singular { iteration: usize },
    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

struct Fit {
    coefficients: DVector<f64>,
    iterations: usize,
    converged: bool,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn train(&self, labeled: &[LabeledRecord]) -> Result<ArtifactBundle, TrainingError> {
        self.validate_config()?;

        let records: Vec<ApplicantRecord> =
            labeled.iter().map(|row| row.record.clone()).collect();
        let fitted = preprocess::fit(&records)?;
        let labels: Vec<bool> = labeled.iter().map(|row| row.approved).collect();

        let (training, holdout) = self.split(labels.len());
        info!(
            rows = labels.len(),
            training_rows = training.len(),
            holdout_rows = holdout.len(),
            seed = self.config.seed,
            "training logistic model"
        );

        let approved = training.iter().filter(|&&row| labels[row]).count();
        if approved == 0 {
            return Err(TrainingError::SingleClass { label: "rejected" });
        }
        if approved == training.len() {
            return Err(TrainingError::SingleClass { label: "approved" });
        }

        let fit = self.fit_logistic(&fitted.matrix, &labels, &training)?;
        let columns = fitted.matrix.first().map(Vec::len).unwrap_or_default();
        let model = LinearModel::new(
            fit.coefficients.rows(0, columns).iter().copied().collect(),
            fit.coefficients[columns],
        );

        let holdout_accuracy = if holdout.is_empty() {
            None
        } else {
            let correct = holdout
                .iter()
                .filter(|&&row| {
                    (model.approval_probability(&fitted.matrix[row]) >= 0.5) == labels[row]
                })
                .count();
            Some(correct as f64 / holdout.len() as f64)
        };

        if !fit.converged {
            warn!(
                iterations = fit.iterations,
                "logistic fit stopped at the iteration cap before converging"
            );
        }

        let summary = TrainingSummary {
            training_rows: training.len(),
            holdout_rows: holdout.len(),
            holdout_accuracy,
            iterations: fit.iterations,
            converged: fit.converged,
            seed: self.config.seed,
            holdout_fraction: self.config.holdout_fraction,
            inverse_regularization: self.config.inverse_regularization,
        };
        info!(
            iterations = summary.iterations,
            converged = summary.converged,
            holdout_accuracy = ?summary.holdout_accuracy,
            "training complete"
        );

        let bundle = ArtifactBundle::new(feature_names(), model, fitted.state)?;
        Ok(bundle.with_training(summary))
    }

    fn validate_config(&self) -> Result<(), TrainingError> {
        let config = &self.config;
        if !(0.0..1.0).contains(&config.holdout_fraction) {
            return Err(TrainingError::InvalidConfig(format!(
                "holdout fraction {} is outside [0, 1)",
                config.holdout_fraction
            )));
        }
        if !(config.inverse_regularization.is_finite() && config.inverse_regularization > 0.0) {
            return Err(TrainingError::InvalidConfig(
                "inverse regularization must be positive".to_string(),
            ));
        }
        if config.max_iterations == 0 {
            return Err(TrainingError::InvalidConfig(
                "at least one iteration is required".to_string(),
            ));
        }
        if !(config.tolerance.is_finite() && config.tolerance > 0.0) {
            return Err(TrainingError::InvalidConfig(
                "tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Shuffled row indices split into (training, holdout).
    fn split(&self, rows: usize) -> (Vec<usize>, Vec<usize>) {
        let mut order: Vec<usize> = (0..rows).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        order.shuffle(&mut rng);

        let holdout = holdout_size(rows, self.config.holdout_fraction);
        let training = order.split_off(holdout);
        (training, order)
    }

    fn fit_logistic(
        &self,
        matrix: &[Vec<f64>],
        labels: &[bool],
        rows: &[usize],
    ) -> Result<Fit, TrainingError> {
        let columns = matrix.first().map(Vec::len).unwrap_or_default();
        let dimension = columns + 1;
        let penalty = 1.0 / self.config.inverse_regularization;

        // Design matrix with a trailing intercept column.
        let x = DMatrix::from_fn(rows.len(), dimension, |i, j| {
            if j == columns {
                1.0
            } else {
                matrix[rows[i]][j]
            }
        });
        let y = DVector::from_iterator(
            rows.len(),
            rows.iter().map(|&row| if labels[row] { 1.0 } else { 0.0 }),
        );

        let mut beta = DVector::<f64>::zeros(dimension);
        for iteration in 1..=self.config.max_iterations {
            let probabilities = (&x * &beta).map(sigmoid);

            let mut gradient = x.tr_mul(&(&probabilities - &y));
            let mut weighted = x.clone();
            for (i, p) in probabilities.iter().enumerate() {
                weighted.row_mut(i).scale_mut(p * (1.0 - p));
            }
            let mut hessian = x.tr_mul(&weighted);
            for j in 0..columns {
                gradient[j] += penalty * beta[j];
                hessian[(j, j)] += penalty;
            }

            let step = solve(hessian, &gradient).ok_or(TrainingError::Singular { iteration })?;
            beta -= &step;

            let largest_move = step.amax();
            debug!(iteration, largest_move, "newton step");
            if largest_move < self.config.tolerance {
                return Ok(Fit {
                    coefficients: beta,
                    iterations: iteration,
                    converged: true,
                });
            }
        }

        Ok(Fit {
            coefficients: beta,
            iterations: self.config.max_iterations,
            converged: false,
        })
    }
}

/// `ceil(rows * fraction)`, leaving at least one row for training.
fn holdout_size(rows: usize, fraction: f64) -> usize {
    let wanted = (rows as f64 * fraction).ceil() as usize;
    wanted.min(rows.saturating_sub(1))
}

fn solve(hessian: DMatrix<f64>, gradient: &DVector<f64>) -> Option<DVector<f64>> {
    let step = match hessian.clone().cholesky() {
        Some(factor) => Some(factor.solve(gradient)),
        None => hessian.lu().solve(gradient),
    }?;
    step.iter().all(|value| value.is_finite()).then_some(step)
}
