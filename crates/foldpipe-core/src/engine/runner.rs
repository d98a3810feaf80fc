use crate::core::models::features::{FeatureBundle, ProcessedFeatures};
use crate::core::models::prediction::PredictionResult;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a predictor backend. Backends flatten their own
/// error detail into the message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RunnerError {
    pub message: String,
}

impl RunnerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A named predictor capability: transforms raw features into processed
/// features, then into a structural prediction.
///
/// Implementations are free to batch, cache, or call out of process; the
/// orchestrator only requires that the same features and seed produce an
/// equivalent prediction.
pub trait ModelRunner: Send + Sync {
    fn process_features(
        &self,
        features: &FeatureBundle,
        seed: u64,
    ) -> Result<ProcessedFeatures, RunnerError>;

    fn predict(
        &self,
        features: &ProcessedFeatures,
        seed: u64,
    ) -> Result<PredictionResult, RunnerError>;
}

/// Ordered collection of named runner instances.
///
/// Iteration order is registration order; seeds, timings, and artifacts are
/// all attributed by the registered name. Several entries may share one
/// underlying runner to support repeated stochastic predictions per
/// architecture.
#[derive(Default)]
pub struct RunnerPool {
    runners: Vec<(String, Arc<dyn ModelRunner>)>,
}

impl RunnerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a runner under a name. Re-registering a name replaces the
    /// runner but keeps its position.
    pub fn register(&mut self, name: impl Into<String>, runner: Arc<dyn ModelRunner>) {
        let name = name.into();
        match self.runners.iter().position(|(n, _)| *n == name) {
            Some(index) => self.runners[index].1 = runner,
            None => self.runners.push((name, runner)),
        }
    }

    /// Registers `predictions` entries named `{model}_pred_{i}` that all
    /// share the same underlying runner.
    pub fn register_replicated(
        &mut self,
        model: &str,
        runner: Arc<dyn ModelRunner>,
        predictions: usize,
    ) {
        for i in 0..predictions {
            self.register(format!("{model}_pred_{i}"), Arc::clone(&runner));
        }
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.runners.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ModelRunner>)> {
        self.runners.iter().map(|(n, r)| (n.as_str(), r))
    }
}

/// Derives the seed for runner `model_index` from the run-wide base seed.
///
/// With a single prediction per architecture the seeds are consecutive;
/// with stochastic fan-out the base seed is spread so that replicas of the
/// same run never collide. Reproducible for a given base seed and ordering.
pub fn derive_model_seed(base_seed: u64, model_index: usize, predictions_per_model: usize) -> u64 {
    if predictions_per_model <= 1 {
        base_seed.wrapping_add(model_index as u64)
    } else {
        (model_index as u64).wrapping_add(base_seed.wrapping_mul(predictions_per_model as u64))
    }
}
