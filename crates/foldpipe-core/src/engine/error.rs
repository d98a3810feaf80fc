use thiserror::Error;

use crate::core::io::features::FeatureStoreError;
use crate::engine::artifacts::ArtifactError;
use crate::engine::relax::RelaxError;
use crate::engine::runner::RunnerError;
use std::path::PathBuf;

/// Errors raised while carrying one target through the pipeline.
///
/// The taxonomy matters: missing or corrupt input skips the target, a runner
/// or artifact failure abandons the target, and a relaxation failure is
/// tolerated per model. No variant aborts the multi-target run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("features for target '{target}' are missing: {source}")]
    MissingInput {
        target: String,
        #[source]
        source: FeatureStoreError,
    },

    #[error("features for target '{target}' could not be read: {source}")]
    CorruptInput {
        target: String,
        #[source]
        source: FeatureStoreError,
    },

    #[error("model '{model}' failed during {stage}: {source}")]
    Runner {
        model: String,
        stage: &'static str,
        #[source]
        source: RunnerError,
    },

    #[error("relaxation failed for model '{model}': {source}")]
    Relaxation {
        model: String,
        #[source]
        source: RelaxError,
    },

    #[error("failed to write artifact '{path}': {source}", path = path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: ArtifactError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// True for failures that skip the target instead of failing it.
    pub fn skips_target(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingInput { .. } | PipelineError::CorruptInput { .. }
        )
    }
}
