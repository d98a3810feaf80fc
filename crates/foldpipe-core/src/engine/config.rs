use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },
}

/// Which ranked predictions receive the relaxation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelaxMode {
    /// Relaxation is skipped entirely; no relaxation-metrics manifest is
    /// written.
    None,
    /// Only the top-ranked prediction is relaxed.
    #[default]
    Best,
    /// Every prediction is relaxed.
    All,
}

impl RelaxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelaxMode::None => "none",
            RelaxMode::Best => "best",
            RelaxMode::All => "all",
        }
    }
}

/// Whether the runner pool predicts single chains or paired complexes.
/// Controls fan-out (stochastic predictions per architecture) and the model
/// kind recorded in structural metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Monomer,
    Multimer,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Monomer => "Monomer",
            ModelKind::Multimer => "Multimer",
        }
    }
}

/// The confidence metric name under which a ranking is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceLabel {
    /// Paired (inter-chain) confidence, published as `iptm+ptm`.
    PairedConfidence,
    /// Plain per-residue confidence, published as `plddts`.
    PerResidueConfidence,
}

impl ConfidenceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::PairedConfidence => "iptm+ptm",
            ConfidenceLabel::PerResidueConfidence => "plddts",
        }
    }
}

/// Run-wide configuration consumed by the orchestrator.
///
/// Passed explicitly into the workflow rather than held as ambient process
/// state, so independent runs do not interfere.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    /// Root of the per-target directory tree; also where feature bundles
    /// are read from.
    pub output_root: PathBuf,
    pub relax_mode: RelaxMode,
    /// Base random seed for the whole run. When absent, one is generated
    /// and logged at workflow start.
    pub base_seed: Option<u64>,
    /// Stochastic predictions per model architecture; only greater than one
    /// for multimer-style fan-out.
    pub predictions_per_model: usize,
    /// When set, each runner performs one extra repeat prediction whose
    /// timing excludes compilation effects.
    pub benchmark: bool,
    pub model_kind: ModelKind,
    /// Pins the published confidence label; when absent the label is chosen
    /// from the predictions themselves.
    pub confidence_label: Option<ConfidenceLabel>,
}

#[derive(Default)]
pub struct InferenceConfigBuilder {
    output_root: Option<PathBuf>,
    relax_mode: Option<RelaxMode>,
    base_seed: Option<u64>,
    predictions_per_model: Option<usize>,
    benchmark: Option<bool>,
    model_kind: Option<ModelKind>,
    confidence_label: Option<ConfidenceLabel>,
}

impl InferenceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_root = Some(path.into());
        self
    }
    pub fn relax_mode(mut self, mode: RelaxMode) -> Self {
        self.relax_mode = Some(mode);
        self
    }
    pub fn base_seed(mut self, seed: u64) -> Self {
        self.base_seed = Some(seed);
        self
    }
    pub fn predictions_per_model(mut self, n: usize) -> Self {
        self.predictions_per_model = Some(n);
        self
    }
    pub fn benchmark(mut self, enabled: bool) -> Self {
        self.benchmark = Some(enabled);
        self
    }
    pub fn model_kind(mut self, kind: ModelKind) -> Self {
        self.model_kind = Some(kind);
        self
    }
    pub fn confidence_label(mut self, label: ConfidenceLabel) -> Self {
        self.confidence_label = Some(label);
        self
    }

    pub fn build(self) -> Result<InferenceConfig, ConfigError> {
        let predictions_per_model = self.predictions_per_model.unwrap_or(1);
        if predictions_per_model == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "predictions_per_model",
                message: "must be at least 1".into(),
            });
        }
        Ok(InferenceConfig {
            output_root: self
                .output_root
                .ok_or(ConfigError::MissingParameter("output_root"))?,
            relax_mode: self.relax_mode.unwrap_or_default(),
            base_seed: self.base_seed,
            predictions_per_model,
            benchmark: self.benchmark.unwrap_or(false),
            model_kind: self.model_kind.unwrap_or_default(),
            confidence_label: self.confidence_label,
        })
    }
}
