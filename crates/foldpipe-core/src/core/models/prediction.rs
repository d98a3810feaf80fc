use super::structure::Structure;
use serde::{Deserialize, Serialize};

/// Pairwise predicted-error matrix with its reported maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedAlignedError {
    pub matrix: Vec<Vec<f64>>,
    pub max: f64,
}

/// The output of one model runner invocation.
///
/// Immutable once produced. Owned by the orchestrator; the ranking policy
/// and relaxation selector only read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub structure: Structure,
    /// Per-residue confidence, on the 0–100 scale.
    pub plddt: Vec<f64>,
    /// Scalar score used to order predictions against each other.
    pub ranking_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptm: Option<f64>,
    /// Inter-chain confidence; present only for paired (multi-chain) models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iptm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pae: Option<PredictedAlignedError>,
}

impl PredictionResult {
    pub fn has_paired_confidence(&self) -> bool {
        self.iptm.is_some()
    }
}
