use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use super::artifact::ArtifactError;
use super::predictor::{MissingFieldPolicy, Predictor};

/// Holds the predictor currently serving decisions.
///
/// Callers take an `Arc` snapshot with [`ModelRegistry::current`] and score
/// against it without holding any lock; publishing swaps the whole predictor,
/// so a decision never mixes two bundles.
#[derive(Debug)]
pub struct ModelRegistry {
    current: RwLock<Arc<Predictor>>,
    source: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry was not loaded from a file and cannot be reloaded")]
    NoSource,
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl ModelRegistry {
    pub fn new(predictor: Predictor) -> Self {
        Self {
            current: RwLock::new(Arc::new(predictor)),
            source: None,
        }
    }

    pub fn load(path: impl AsRef<Path>, policy: MissingFieldPolicy) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let predictor = Predictor::load(path)?.with_missing_field_policy(policy);
        Ok(Self {
            current: RwLock::new(Arc::new(predictor)),
            source: Some(path.to_path_buf()),
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn current(&self) -> Arc<Predictor> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the serving predictor. In-flight callers keep the snapshot they took.
    pub fn publish(&self, predictor: Predictor) {
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(predictor);
    }

    /// Re-read the bundle from the file the registry was loaded from. The
    /// serving predictor is left untouched if the new bundle fails to load.
    pub fn reload(&self) -> Result<Arc<Predictor>, RegistryError> {
        let path = self.source.as_deref().ok_or(RegistryError::NoSource)?;
        let policy = self.current().missing_field_policy();
        let predictor = Predictor::load(path)?.with_missing_field_policy(policy);
        self.publish(predictor);
        info!(path = %path.display(), "model bundle reloaded");
        Ok(self.current())
    }
}
