use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::model::LinearModel;
use super::preprocess::PreprocessingState;
use super::schema::{Feature, SCHEMA_VERSION};
use super::trainer::TrainingSummary;

/// Layout version of the persisted bundle document.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Frozen output of training: model, preprocessing state, and column order.
///
/// Bundles are validated on construction and on load, and never mutated
/// afterwards; retraining produces a new bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    format_version: u32,
    schema_version: u32,
    created_at: DateTime<Utc>,
    feature_names: Vec<String>,
    model: LinearModel,
    preprocessing: PreprocessingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    training: Option<TrainingSummary>,
}

#[derive(Debug, Deserialize)]
struct BundleHeader {
    format_version: u32,
    schema_version: u32,
}

/// Failures building, persisting, or loading a bundle.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read bundle {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write bundle {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("bundle is not a valid document: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("unsupported {component} version {found} (expected {expected})")]
    Version {
        component: &'static str,
        found: u32,
        expected: u32,
    },
    #[error("bundle is inconsistent: {0}")]
    Incompatible(String),
}

impl ArtifactBundle {
    pub fn new(
        feature_names: Vec<String>,
        model: LinearModel,
        preprocessing: PreprocessingState,
    ) -> Result<Self, ArtifactError> {
        let bundle = Self {
            format_version: BUNDLE_FORMAT_VERSION,
            schema_version: SCHEMA_VERSION,
            created_at: Utc::now(),
            feature_names,
            model,
            preprocessing,
            training: None,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn with_training(mut self, summary: TrainingSummary) -> Self {
        self.training = Some(summary);
        self
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn preprocessing(&self) -> &PreprocessingState {
        &self.preprocessing
    }

    pub fn training(&self) -> Option<&TrainingSummary> {
        self.training.as_ref()
    }

    /// Resolve the recorded feature names into model columns.
    pub fn columns(&self) -> Result<Vec<Feature>, ArtifactError> {
        let mut columns = Vec::with_capacity(self.feature_names.len());
        for name in &self.feature_names {
            let feature = Feature::from_name(name).ok_or_else(|| {
                ArtifactError::Incompatible(format!("unknown feature `{name}`"))
            })?;
            if columns.contains(&feature) {
                return Err(ArtifactError::Incompatible(format!(
                    "feature `{name}` listed twice"
                )));
            }
            columns.push(feature);
        }
        Ok(columns)
    }

    /// Write the bundle as pretty JSON. The document goes to a sibling temp file
    /// first and is renamed into place, so readers never see a partial bundle.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let write_error = |source| ArtifactError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let document = serde_json::to_vec_pretty(self)?;
        let staging = staging_path(path);
        fs::write(&staging, document).map_err(write_error)?;
        if let Err(source) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(write_error(source));
        }

        info!(
            path = %path.display(),
            features = self.feature_names.len(),
            "artifact bundle saved"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|source| ArtifactError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle = Self::from_reader(file).map_err(|error| match error {
            ArtifactError::Load { source, .. } => ArtifactError::Load {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        info!(
            path = %path.display(),
            created_at = %bundle.created_at,
            "artifact bundle loaded"
        );
        Ok(bundle)
    }

    /// Parse and validate a bundle document. The version header is checked before
    /// the body so an older or newer layout reports a version error, not a parse error.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ArtifactError> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .map_err(|source| ArtifactError::Load {
                path: PathBuf::new(),
                source,
            })?;

        let document: serde_json::Value = serde_json::from_str(&raw)?;
        let header: BundleHeader = serde_json::from_value(document.clone())?;
        check_version("bundle format", header.format_version, BUNDLE_FORMAT_VERSION)?;
        check_version("schema", header.schema_version, SCHEMA_VERSION)?;

        let bundle: Self = serde_json::from_value(document)?;
        bundle.validate()?;
        Ok(bundle)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        check_version("bundle format", self.format_version, BUNDLE_FORMAT_VERSION)?;
        check_version("schema", self.schema_version, SCHEMA_VERSION)?;

        let columns = self.columns()?;
        if self.model.weights.len() != columns.len() {
            return Err(ArtifactError::Incompatible(format!(
                "{} weights for {} features",
                self.model.weights.len(),
                columns.len()
            )));
        }
        if self.model.weights.iter().any(|weight| !weight.is_finite())
            || !self.model.bias.is_finite()
        {
            return Err(ArtifactError::Incompatible(
                "model parameters must be finite".to_string(),
            ));
        }

        let incomplete = self.preprocessing.incomplete_fields();
        if !incomplete.is_empty() {
            return Err(ArtifactError::Incompatible(format!(
                "no preprocessing state for {}",
                incomplete.join(", ")
            )));
        }
        if let Some((field, _)) = self
            .preprocessing
            .vocabularies
            .iter()
            .find(|(_, vocabulary)| vocabulary.has_duplicates())
        {
            return Err(ArtifactError::Incompatible(format!(
                "vocabulary for `{}` repeats a value",
                field.name()
            )));
        }
        Ok(())
    }
}

fn check_version(component: &'static str, found: u32, expected: u32) -> Result<(), ArtifactError> {
    if found == expected {
        Ok(())
    } else {
        Err(ArtifactError::Version {
            component,
            found,
            expected,
        })
    }
}

/// Sibling file unique to this process and call, so concurrent writers to the
/// same bundle never share a staging file.
pub(super) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(
        ".{}.{:016x}.tmp",
        std::process::id(),
        rand::random::<u64>()
    ));
    path.with_file_name(name)
}
