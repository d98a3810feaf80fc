use crate::config::RunFileConfig;
use crate::error::Result;
use foldpipe::core::models::features::{FeatureBundle, ProcessedFeatures};
use foldpipe::core::models::prediction::PredictionResult;
use foldpipe::core::models::structure::Structure;
use foldpipe::engine::config::{InferenceConfig, ModelKind};
use foldpipe::engine::relax::{RelaxError, RelaxOutcome, Relaxer};
use foldpipe::engine::runner::{ModelRunner, RunnerError, RunnerPool};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::debug;

/// One request to the external predictor/relaxer executable: a single JSON
/// object on stdin, a single JSON response on stdout. This is the entire
/// contract; what the executable does internally (accelerators, containers)
/// is its own business.
#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BackendRequest<'a> {
    Process {
        model: &'a str,
        seed: u64,
        features: &'a FeatureBundle,
    },
    Predict {
        model: &'a str,
        seed: u64,
        features: &'a ProcessedFeatures,
    },
    Relax {
        structure: &'a Structure,
    },
}

/// Shared subprocess plumbing for both capabilities.
#[derive(Debug, Clone)]
struct BackendProcess {
    command: PathBuf,
    args: Vec<String>,
}

impl BackendProcess {
    fn new(command: PathBuf, args: Vec<String>) -> Self {
        Self { command, args }
    }

    fn invoke<R: DeserializeOwned>(&self, request: &BackendRequest) -> std::result::Result<R, String> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| format!("failed to encode backend request: {e}"))?;

        debug!(command = %self.command.display(), "Invoking backend process.");
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to spawn '{}': {e}", self.command.display()))?;

        child
            .stdin
            .take()
            .ok_or_else(|| "backend stdin was not captured".to_string())?
            .write_all(&payload)
            .map_err(|e| format!("failed to write backend request: {e}"))?;

        let output = child
            .wait_with_output()
            .map_err(|e| format!("failed to read backend output: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "'{}' exited with {}: {}",
                self.command.display(),
                output.status,
                stderr.trim()
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("failed to decode backend response: {e}"))
    }
}

/// [`ModelRunner`] implementation that drives one model architecture of the
/// external predictor executable.
pub struct ProcessRunner {
    process: BackendProcess,
    model: String,
}

impl ProcessRunner {
    pub fn new(command: PathBuf, args: Vec<String>, model: String) -> Self {
        Self {
            process: BackendProcess::new(command, args),
            model,
        }
    }
}

impl ModelRunner for ProcessRunner {
    fn process_features(
        &self,
        features: &FeatureBundle,
        seed: u64,
    ) -> std::result::Result<ProcessedFeatures, RunnerError> {
        self.process
            .invoke(&BackendRequest::Process {
                model: &self.model,
                seed,
                features,
            })
            .map_err(RunnerError::new)
    }

    fn predict(
        &self,
        features: &ProcessedFeatures,
        seed: u64,
    ) -> std::result::Result<PredictionResult, RunnerError> {
        self.process
            .invoke(&BackendRequest::Predict {
                model: &self.model,
                seed,
                features,
            })
            .map_err(RunnerError::new)
    }
}

/// [`Relaxer`] implementation backed by the external relaxer executable.
pub struct ProcessRelaxer {
    process: BackendProcess,
}

impl ProcessRelaxer {
    pub fn new(command: PathBuf, args: Vec<String>) -> Self {
        Self {
            process: BackendProcess::new(command, args),
        }
    }
}

impl Relaxer for ProcessRelaxer {
    fn relax(&self, structure: &Structure) -> std::result::Result<RelaxOutcome, RelaxError> {
        self.process
            .invoke(&BackendRequest::Relax { structure })
            .map_err(RelaxError::new)
    }
}

/// Builds the runner pool and relaxer from the run configuration. Multimer
/// runs fan each architecture out into several stochastic pool entries;
/// monomer runs get exactly one entry per architecture.
pub fn build_backend(
    file: &RunFileConfig,
    config: &InferenceConfig,
) -> Result<(RunnerPool, Box<dyn Relaxer>)> {
    let predictions_per_model = match config.model_kind {
        ModelKind::Multimer => config.predictions_per_model,
        ModelKind::Monomer => 1,
    };

    let mut pool = RunnerPool::new();
    for model in &file.backend.models {
        let runner = Arc::new(ProcessRunner::new(
            file.backend.predictor_command.clone(),
            file.backend.predictor_args.clone(),
            model.clone(),
        ));
        pool.register_replicated(model, runner, predictions_per_model);
    }

    let relaxer = Box::new(ProcessRelaxer::new(
        file.backend.relaxer_command.clone(),
        file.backend.relaxer_args.clone(),
    ));
    Ok((pool, relaxer))
}
