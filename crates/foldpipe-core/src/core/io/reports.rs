use crate::core::models::prediction::PredictedAlignedError;
use serde::Serialize;

/// Per-residue confidence report, in the layout downstream viewers expect.
#[derive(Debug, Serialize)]
struct ConfidenceReport {
    #[serde(rename = "residueNumber")]
    residue_number: Vec<usize>,
    #[serde(rename = "confidenceScore")]
    confidence_score: Vec<f64>,
    #[serde(rename = "confidenceCategory")]
    confidence_category: Vec<&'static str>,
}

fn category(score: f64) -> &'static str {
    if score < 50.0 {
        "D"
    } else if score < 70.0 {
        "L"
    } else if score < 90.0 {
        "M"
    } else {
        "H"
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Renders the per-residue confidence report for one model.
pub fn confidence_json(plddt: &[f64]) -> Result<String, serde_json::Error> {
    let report = ConfidenceReport {
        residue_number: (1..=plddt.len()).collect(),
        confidence_score: plddt.iter().copied().map(round2).collect(),
        confidence_category: plddt.iter().copied().map(category).collect(),
    };
    serde_json::to_string(&report)
}

#[derive(Debug, Serialize)]
struct PaeReport {
    predicted_aligned_error: Vec<Vec<f64>>,
    max_predicted_aligned_error: f64,
}

/// Renders the pairwise predicted-error report for one model. The payload is
/// a single-element array, matching the established interchange layout.
pub fn pae_json(pae: &PredictedAlignedError) -> Result<String, serde_json::Error> {
    let report = [PaeReport {
        predicted_aligned_error: pae
            .matrix
            .iter()
            .map(|row| row.iter().copied().map(round2).collect())
            .collect(),
        max_predicted_aligned_error: pae.max,
    }];
    serde_json::to_string(&report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_report_numbers_residues_from_one() {
        let json = confidence_json(&[96.234, 71.0, 44.9]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["residueNumber"], serde_json::json!([1, 2, 3]));
        assert_eq!(
            value["confidenceScore"],
            serde_json::json!([96.23, 71.0, 44.9])
        );
        assert_eq!(
            value["confidenceCategory"],
            serde_json::json!(["H", "M", "D"])
        );
    }

    #[test]
    fn category_boundaries_are_half_open() {
        assert_eq!(category(49.999), "D");
        assert_eq!(category(50.0), "L");
        assert_eq!(category(69.999), "L");
        assert_eq!(category(70.0), "M");
        assert_eq!(category(90.0), "H");
    }

    #[test]
    fn pae_report_is_a_single_element_array() {
        let pae = PredictedAlignedError {
            matrix: vec![vec![0.118, 2.5], vec![2.5, 0.0]],
            max: 31.75,
        };
        let json = pae_json(&pae).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value.is_array());
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(
            value[0]["predicted_aligned_error"],
            serde_json::json!([[0.12, 2.5], [2.5, 0.0]])
        );
        assert_eq!(value[0]["max_predicted_aligned_error"], 31.75);
    }
}
