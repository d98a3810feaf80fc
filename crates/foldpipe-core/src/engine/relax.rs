use crate::core::models::structure::Structure;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the refinement backend, e.g. numerical divergence.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RelaxError {
    pub message: String,
}

impl RelaxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The refinement capability: adjusts a predicted structure to reduce
/// physically implausible local geometry.
pub trait Relaxer: Send + Sync {
    fn relax(&self, structure: &Structure) -> Result<RelaxOutcome, RelaxError>;
}

/// Result of one successful relaxation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxOutcome {
    pub structure: Structure,
    /// Residual per-residue violation magnitudes after refinement.
    pub violations: Vec<f64>,
}

impl RelaxOutcome {
    /// Number of residues still carrying a violation.
    pub fn violation_count(&self) -> usize {
        self.violations.iter().filter(|v| **v > 0.0).count()
    }
}

/// What the relaxation-metrics manifest records for one model: either the
/// residual violations of a completed refinement, or the failure that was
/// tolerated for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelaxMetric {
    Completed {
        remaining_violations: Vec<f64>,
        remaining_violations_count: usize,
    },
    Failed {
        error: String,
    },
}

impl RelaxMetric {
    pub fn from_outcome(outcome: &RelaxOutcome) -> Self {
        RelaxMetric::Completed {
            remaining_violations: outcome.violations.clone(),
            remaining_violations_count: outcome.violation_count(),
        }
    }

    pub fn from_error(error: &RelaxError) -> Self {
        RelaxMetric::Failed {
            error: error.to_string(),
        }
    }
}
