use crate::cli::InferArgs;
use crate::error::{CliError, Result};
use foldpipe::engine::config::{
    ConfidenceLabel, InferenceConfig, InferenceConfigBuilder, ModelKind, RelaxMode,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Backend section of the run configuration: the external predictor and
/// relaxer commands, and the model architectures the predictor serves.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BackendConfig {
    pub predictor_command: PathBuf,
    #[serde(default)]
    pub predictor_args: Vec<String>,
    pub relaxer_command: PathBuf,
    #[serde(default)]
    pub relaxer_args: Vec<String>,
    /// Model architecture names; each becomes one or more pool entries.
    pub models: Vec<String>,
}

/// Optional inference defaults from the file; every field can be overridden
/// on the command line.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InferenceFileConfig {
    pub models_to_relax: Option<RelaxMode>,
    pub random_seed: Option<u64>,
    pub num_predictions_per_model: Option<usize>,
    pub model_kind: Option<ModelKind>,
    pub confidence_label: Option<ConfidenceLabel>,
    pub benchmark: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RunFileConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub inference: InferenceFileConfig,
}

impl RunFileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Reading run configuration file.");
        let contents = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let config: RunFileConfig =
            toml::from_str(&contents).map_err(|e| CliError::FileParsing {
                path: path.to_path_buf(),
                source: e.into(),
            })?;
        if config.backend.models.is_empty() {
            return Err(CliError::Argument(
                "run configuration lists no models under [backend]".into(),
            ));
        }
        Ok(config)
    }
}

/// Merges file defaults with command-line overrides into the core
/// configuration. CLI values win.
pub fn build_inference_config(args: &InferArgs, file: &RunFileConfig) -> Result<InferenceConfig> {
    let mut builder = InferenceConfigBuilder::new().output_root(&args.output_dir);

    let relax_mode = args
        .models_to_relax
        .map(RelaxMode::from)
        .or(file.inference.models_to_relax);
    if let Some(mode) = relax_mode {
        builder = builder.relax_mode(mode);
    }
    if let Some(seed) = args.random_seed.or(file.inference.random_seed) {
        builder = builder.base_seed(seed);
    }
    if let Some(n) = args
        .num_predictions_per_model
        .or(file.inference.num_predictions_per_model)
    {
        builder = builder.predictions_per_model(n);
    }
    if let Some(kind) = file.inference.model_kind {
        builder = builder.model_kind(kind);
    }
    if let Some(label) = file.inference.confidence_label {
        builder = builder.confidence_label(label);
    }
    builder = builder.benchmark(args.benchmark || file.inference.benchmark.unwrap_or(false));

    Ok(builder.build()?)
}
