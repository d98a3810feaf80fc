use crate::core::io::mmcif::{CifError, CifFile, CifMetadata};
use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::reports;
use crate::core::io::traits::StructureFile;
use crate::core::models::prediction::PredictionResult;
use crate::core::models::structure::Structure;
use crate::engine::config::ModelKind;
use crate::engine::error::PipelineError;
use crate::engine::ranking::RankingManifest;
use crate::engine::relax::RelaxMetric;
use crate::engine::timing::TimingLedger;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const RANKING_FILE: &str = "ranking_debug.json";
pub const RELAX_METRICS_FILE: &str = "relax_metrics.json";
/// Written last; downstream consumers treat its presence as the completion
/// marker for the whole target directory.
pub const TIMINGS_FILE: &str = "timings.json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Pdb(#[from] PdbError),
    #[error(transparent)]
    Cif(#[from] CifError),
}

/// Serializes a slice of pairs as a JSON object in slice order.
struct OrderedMap<'a, V>(&'a [(String, V)]);

impl<V: Serialize> Serialize for OrderedMap<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct RankingDebug<'a> {
    label: &'static str,
    confidences: &'a [(String, f64)],
    order: Vec<&'a str>,
}

impl Serialize for RankingDebug<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.label, &OrderedMap(self.confidences))?;
        map.serialize_entry("order", &self.order)?;
        map.end()
    }
}

/// Persists the fixed artifact set for one target.
///
/// All paths are rooted at `<output_root>/<target>/`. File names are part of
/// the interoperability contract with downstream tooling and never vary.
pub struct ArtifactWriter {
    target_dir: PathBuf,
    model_kind: ModelKind,
}

impl ArtifactWriter {
    pub fn new(output_root: &Path, target: &str, model_kind: ModelKind) -> Self {
        Self {
            target_dir: output_root.join(target),
            model_kind,
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn ensure_dir(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.target_dir).map_err(|e| PipelineError::ArtifactWrite {
            path: self.target_dir.clone(),
            source: e.into(),
        })
    }

    fn path(&self, file_name: &str) -> PathBuf {
        self.target_dir.join(file_name)
    }

    fn write_text(&self, file_name: &str, contents: &str) -> Result<(), PipelineError> {
        let path = self.path(file_name);
        fs::write(&path, contents).map_err(|e| PipelineError::ArtifactWrite {
            path,
            source: e.into(),
        })
    }

    /// Writes `<stem>.pdb` and `<stem>.cif` for the same structure.
    fn write_structure_pair(
        &self,
        stem: &str,
        structure: &Structure,
        entry_id: &str,
    ) -> Result<(), PipelineError> {
        let pdb_path = self.path(&format!("{stem}.pdb"));
        PdbFile::write_to_path(structure, &(), &pdb_path).map_err(|e: PdbError| {
            PipelineError::ArtifactWrite {
                path: pdb_path.clone(),
                source: e.into(),
            }
        })?;

        let cif_path = self.path(&format!("{stem}.cif"));
        let metadata = CifMetadata::new(entry_id, self.model_kind.as_str());
        CifFile::write_to_path(structure, &metadata, &cif_path).map_err(|e: CifError| {
            PipelineError::ArtifactWrite {
                path: cif_path.clone(),
                source: e.into(),
            }
        })
    }

    /// Persists the per-model outputs of one completed prediction: the
    /// confidence report, the pairwise-error report when present, and the
    /// unrefined structure pair. Returns the structure with per-residue
    /// confidence stamped into the b-factors, ready for rank artifacts.
    pub fn write_prediction(
        &self,
        model: &str,
        model_index: usize,
        result: &PredictionResult,
    ) -> Result<Structure, PipelineError> {
        let confidence_name = format!("confidence_{model}.json");
        let confidence =
            reports::confidence_json(&result.plddt).map_err(|e| PipelineError::ArtifactWrite {
                path: self.path(&confidence_name),
                source: e.into(),
            })?;
        self.write_text(&confidence_name, &confidence)?;

        if let Some(pae) = &result.pae {
            let pae_name = format!("pae_{model}.json");
            let payload = reports::pae_json(pae).map_err(|e| PipelineError::ArtifactWrite {
                path: self.path(&pae_name),
                source: e.into(),
            })?;
            self.write_text(&pae_name, &payload)?;
        }

        let stamped = result.structure.with_confidence_b_factors(&result.plddt);
        self.write_structure_pair(
            &format!("unrelaxed_{model}"),
            &stamped,
            &model_index.to_string(),
        )?;
        Ok(stamped)
    }

    pub fn write_relaxed(&self, model: &str, structure: &Structure) -> Result<(), PipelineError> {
        self.write_structure_pair(&format!("relaxed_{model}"), structure, "0")
    }

    pub fn write_ranked(&self, rank: usize, structure: &Structure) -> Result<(), PipelineError> {
        self.write_structure_pair(&format!("ranked_{rank}"), structure, &rank.to_string())
    }

    /// Writes the ranking manifest: the per-model confidences under the
    /// manifest's label, in prediction order, plus the ranked name order.
    pub fn write_ranking(
        &self,
        manifest: &RankingManifest,
        confidences: &[(String, f64)],
    ) -> Result<(), PipelineError> {
        let debug = RankingDebug {
            label: manifest.label().as_str(),
            confidences,
            order: manifest.order().collect(),
        };
        let payload =
            serde_json::to_string_pretty(&debug).map_err(|e| PipelineError::ArtifactWrite {
                path: self.path(RANKING_FILE),
                source: e.into(),
            })?;
        self.write_text(RANKING_FILE, &payload)
    }

    pub fn write_relax_metrics(
        &self,
        metrics: &[(String, RelaxMetric)],
    ) -> Result<(), PipelineError> {
        let payload = serde_json::to_string_pretty(&OrderedMap(metrics)).map_err(|e| {
            PipelineError::ArtifactWrite {
                path: self.path(RELAX_METRICS_FILE),
                source: e.into(),
            }
        })?;
        self.write_text(RELAX_METRICS_FILE, &payload)
    }

    pub fn write_timings(&self, ledger: &TimingLedger) -> Result<(), PipelineError> {
        let payload =
            serde_json::to_string_pretty(ledger).map_err(|e| PipelineError::ArtifactWrite {
                path: self.path(TIMINGS_FILE),
                source: e.into(),
            })?;
        self.write_text(TIMINGS_FILE, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::prediction::PredictedAlignedError;
    use crate::core::models::structure::{Atom, Chain, Residue};
    use crate::engine::config::ConfidenceLabel;
    use crate::engine::ranking::rank;
    use nalgebra::Point3;

    fn prediction(confidence: f64) -> PredictionResult {
        let mut chain = Chain::new('A');
        let mut res = Residue::new("GLY", 1);
        res.atoms
            .push(Atom::new("CA", "C", Point3::new(0.0, 0.0, 0.0)));
        chain.residues.push(res);
        PredictionResult {
            structure: Structure {
                chains: vec![chain],
            },
            plddt: vec![confidence],
            ranking_confidence: confidence,
            ptm: None,
            iptm: None,
            pae: None,
        }
    }

    fn writer(root: &Path) -> ArtifactWriter {
        let w = ArtifactWriter::new(root, "t1", ModelKind::Monomer);
        w.ensure_dir().unwrap();
        w
    }

    #[test]
    fn prediction_artifacts_use_the_fixed_names() {
        let tmp = tempfile::tempdir().unwrap();
        let w = writer(tmp.path());

        let mut result = prediction(88.0);
        result.pae = Some(PredictedAlignedError {
            matrix: vec![vec![0.0]],
            max: 30.0,
        });
        let stamped = w.write_prediction("model_1_pred_0", 0, &result).unwrap();

        let dir = tmp.path().join("t1");
        assert!(dir.join("confidence_model_1_pred_0.json").exists());
        assert!(dir.join("pae_model_1_pred_0.json").exists());
        assert!(dir.join("unrelaxed_model_1_pred_0.pdb").exists());
        assert!(dir.join("unrelaxed_model_1_pred_0.cif").exists());
        assert_eq!(stamped.chains[0].residues[0].atoms[0].b_factor, 88.0);
    }

    #[test]
    fn pae_report_is_skipped_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let w = writer(tmp.path());
        w.write_prediction("model_1_pred_0", 0, &prediction(50.0))
            .unwrap();
        assert!(!tmp
            .path()
            .join("t1")
            .join("pae_model_1_pred_0.json")
            .exists());
    }

    #[test]
    fn ranking_manifest_keeps_prediction_order_for_confidences() {
        let tmp = tempfile::tempdir().unwrap();
        let w = writer(tmp.path());

        let predictions = vec![
            ("a".to_string(), prediction(10.0)),
            ("b".to_string(), prediction(30.0)),
            ("c".to_string(), prediction(20.0)),
        ];
        let manifest = rank(&predictions, None);
        let confidences: Vec<(String, f64)> = predictions
            .iter()
            .map(|(n, p)| (n.clone(), p.ranking_confidence))
            .collect();
        w.write_ranking(&manifest, &confidences).unwrap();

        let text = fs::read_to_string(tmp.path().join("t1").join(RANKING_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["order"], serde_json::json!(["b", "c", "a"]));
        assert_eq!(value["plddts"]["b"], 30.0);
        // Confidences stay in prediction order, not rank order.
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        assert!(a < b);
        assert_eq!(manifest.label(), ConfidenceLabel::PerResidueConfidence);
    }

    #[test]
    fn relax_metrics_and_timings_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let w = writer(tmp.path());

        let metrics = vec![(
            "b".to_string(),
            RelaxMetric::Completed {
                remaining_violations: vec![0.0, 1.0],
                remaining_violations_count: 1,
            },
        )];
        w.write_relax_metrics(&metrics).unwrap();

        let mut ledger = TimingLedger::new();
        ledger.record("predict_and_compile_b", 4.5);
        w.write_timings(&ledger).unwrap();

        let dir = tmp.path().join("t1");
        let metrics_value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join(RELAX_METRICS_FILE)).unwrap())
                .unwrap();
        assert_eq!(metrics_value["b"]["remaining_violations_count"], 1);

        let timing_value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join(TIMINGS_FILE)).unwrap()).unwrap();
        assert_eq!(timing_value["predict_and_compile_b"], 4.5);
    }

    #[test]
    fn rank_artifacts_are_written_per_position() {
        let tmp = tempfile::tempdir().unwrap();
        let w = writer(tmp.path());
        let stamped = prediction(75.0).structure;

        w.write_ranked(0, &stamped).unwrap();
        w.write_ranked(1, &stamped).unwrap();

        let dir = tmp.path().join("t1");
        for k in 0..2 {
            assert!(dir.join(format!("ranked_{k}.pdb")).exists());
            assert!(dir.join(format!("ranked_{k}.cif")).exists());
        }
    }
}
