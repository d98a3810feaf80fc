use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One value of a feature bundle.
///
/// The pipeline never interprets these beyond logging; they are carried
/// opaquely from the feature store to the predictor backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

/// The precomputed input features for one target, keyed by feature name.
///
/// Loaded once per target and read-only thereafter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureBundle {
    features: BTreeMap<String, FeatureValue>,
}

impl FeatureBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.features.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    /// Best-effort sequence length, for logging only.
    pub fn sequence_length(&self) -> Option<usize> {
        match self.features.get("sequence") {
            Some(FeatureValue::Text(seq)) => return Some(seq.len()),
            _ => {}
        }
        match self.features.get("aatype") {
            Some(FeatureValue::IntArray(types)) => return Some(types.len()),
            _ => {}
        }
        match self.features.get("seq_length") {
            Some(FeatureValue::Int(n)) if *n >= 0 => Some(*n as usize),
            _ => None,
        }
    }
}

/// Runner-specific transformation of a [`FeatureBundle`], opaque to the
/// orchestrator and consumed only by the runner that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedFeatures(FeatureBundle);

impl ProcessedFeatures {
    pub fn new(bundle: FeatureBundle) -> Self {
        Self(bundle)
    }

    pub fn bundle(&self) -> &FeatureBundle {
        &self.0
    }
}

impl From<FeatureBundle> for ProcessedFeatures {
    fn from(bundle: FeatureBundle) -> Self {
        Self(bundle)
    }
}
