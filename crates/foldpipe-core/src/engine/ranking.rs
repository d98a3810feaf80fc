use crate::core::models::prediction::PredictionResult;
use crate::engine::config::ConfidenceLabel;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedModel {
    pub name: String,
    pub confidence: f64,
}

/// Model names ordered by descending ranking confidence, together with the
/// confidence label the ordering was published under.
///
/// Created once per target after all predictions complete; read-only
/// afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingManifest {
    label: ConfidenceLabel,
    entries: Vec<RankedModel>,
}

impl RankingManifest {
    pub fn label(&self) -> ConfidenceLabel {
        self.label
    }

    pub fn entries(&self) -> &[RankedModel] {
        &self.entries
    }

    /// Model names in rank order, best first.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|m| m.name.as_str())
    }

    pub fn best(&self) -> Option<&RankedModel> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Orders completed predictions by their scalar ranking confidence.
///
/// The sort is stable and descending: equal confidences keep the input
/// order, so the result is deterministic for a given prediction sequence.
/// The label is `label_override` when given, else chosen from the
/// predictions themselves (paired confidence wins if any prediction
/// reports one).
pub fn rank(
    predictions: &[(String, PredictionResult)],
    label_override: Option<ConfidenceLabel>,
) -> RankingManifest {
    let label = label_override.unwrap_or_else(|| {
        if predictions.iter().any(|(_, p)| p.has_paired_confidence()) {
            ConfidenceLabel::PairedConfidence
        } else {
            ConfidenceLabel::PerResidueConfidence
        }
    });

    let mut entries: Vec<RankedModel> = predictions
        .iter()
        .map(|(name, result)| RankedModel {
            name: name.clone(),
            confidence: result.ranking_confidence,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    RankingManifest { label, entries }
}
