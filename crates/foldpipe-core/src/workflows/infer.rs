use crate::core::io::features::{FeatureStore, FeatureStoreError};
use crate::core::models::structure::Structure;
use crate::engine::artifacts::ArtifactWriter;
use crate::engine::config::{InferenceConfig, RelaxMode};
use crate::engine::error::PipelineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::ranking::rank;
use crate::engine::relax::{RelaxMetric, Relaxer};
use crate::engine::runner::{RunnerPool, derive_model_seed};
use crate::engine::selection::select_for_relaxation;
use crate::engine::state::{RunSummary, TargetReport, TargetState};
use crate::engine::timing::{TimingLedger, timed};
use rand::Rng;
use tracing::{debug, error, info, instrument, warn};

/// Everything one target needs besides its name. Global run-wide state is
/// carried here explicitly so independent runs do not interfere.
pub struct TargetContext<'a> {
    pub store: &'a FeatureStore,
    pub pool: &'a RunnerPool,
    pub relaxer: &'a dyn Relaxer,
    pub config: &'a InferenceConfig,
    pub base_seed: u64,
    pub reporter: &'a ProgressReporter<'a>,
}

/// Runs the full pipeline over a set of targets, sequentially.
///
/// Each target is an isolated failure domain: missing or corrupt features
/// skip it, a runner or artifact failure abandons it, and in both cases the
/// run proceeds to the next target. The summary records every disposition.
#[instrument(skip_all, name = "inference_run")]
pub fn run(
    targets: &[String],
    pool: &RunnerPool,
    relaxer: &dyn Relaxer,
    config: &InferenceConfig,
    reporter: &ProgressReporter,
) -> RunSummary {
    let base_seed = resolve_base_seed(config, pool.len());
    let store = FeatureStore::new(&config.output_root);
    let context = TargetContext {
        store: &store,
        pool,
        relaxer,
        config,
        base_seed,
        reporter,
    };

    let mut summary = RunSummary::default();
    for (index, target) in targets.iter().enumerate() {
        reporter.report(Progress::TargetStart {
            name: target.clone(),
            index,
            total: targets.len(),
        });
        let report = match run_target(target, &context) {
            Ok(()) => TargetReport {
                name: target.clone(),
                state: TargetState::ArtifactsWritten,
                error: None,
            },
            Err(e) if e.skips_target() => {
                warn!(target, error = %e, "Skipping target: input features unavailable.");
                TargetReport {
                    name: target.clone(),
                    state: TargetState::Skipped,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => {
                error!(target, error = %e, "Target failed; continuing with remaining targets.");
                TargetReport {
                    name: target.clone(),
                    state: TargetState::Failed,
                    error: Some(e.to_string()),
                }
            }
        };
        summary.push(report);
    }
    info!(
        completed = summary.completed(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "Inference run finished."
    );
    summary
}

/// Carries one target from feature load to the completion marker.
#[instrument(skip_all, name = "target_pipeline", fields(target = %target))]
pub fn run_target(target: &str, context: &TargetContext) -> Result<(), PipelineError> {
    info!(target, "Running inference.");
    let mut state = TargetState::Pending;

    context.reporter.report(Progress::StageStart {
        name: "Loading features",
    });
    let features = context.store.load(target).map_err(|e| match e {
        FeatureStoreError::NotFound { .. } => PipelineError::MissingInput {
            target: target.to_string(),
            source: e,
        },
        _ => PipelineError::CorruptInput {
            target: target.to_string(),
            source: e,
        },
    })?;
    advance(&mut state, TargetState::FeaturesLoaded, target);
    if let Some(length) = features.sequence_length() {
        info!(target, sequence_length = length, "Loaded feature bundle.");
    }
    if let Some(metadata) = context.store.load_metadata(target) {
        info!(target, %metadata, "Loaded preprocessing metadata.");
    }
    context.reporter.report(Progress::StageFinish);

    let writer = ArtifactWriter::new(&context.config.output_root, target, context.config.model_kind);
    writer.ensure_dir()?;

    let mut timings = TimingLedger::new();

    // Fan out over the runner pool, in registration order.
    advance(&mut state, TargetState::Predicting, target);
    context.reporter.report(Progress::StageStart {
        name: "Predicting",
    });
    let mut predictions = Vec::with_capacity(context.pool.len());
    let mut unrelaxed: Vec<(String, Structure)> = Vec::with_capacity(context.pool.len());
    for (model_index, (model, runner)) in context.pool.iter().enumerate() {
        info!(model, target, "Running model.");
        context.reporter.report(Progress::ModelStart {
            name: model.to_string(),
        });
        let seed = derive_model_seed(
            context.base_seed,
            model_index,
            context.config.predictions_per_model,
        );

        let (processed, seconds) = timed(|| runner.process_features(&features, seed));
        let processed = processed.map_err(|e| PipelineError::Runner {
            model: model.to_string(),
            stage: "process_features",
            source: e,
        })?;
        timings.record(format!("process_features_{model}"), seconds);

        let (prediction, seconds) = timed(|| runner.predict(&processed, seed));
        let prediction = prediction.map_err(|e| PipelineError::Runner {
            model: model.to_string(),
            stage: "predict",
            source: e,
        })?;
        timings.record(format!("predict_and_compile_{model}"), seconds);
        info!(
            model,
            target, seconds, "Model predict time (includes compilation)."
        );

        if context.config.benchmark {
            let (repeat, seconds) = timed(|| runner.predict(&processed, seed));
            repeat.map_err(|e| PipelineError::Runner {
                model: model.to_string(),
                stage: "predict_benchmark",
                source: e,
            })?;
            timings.record(format!("predict_benchmark_{model}"), seconds);
            info!(
                model,
                target, seconds, "Model predict time (excludes compilation)."
            );
        }

        let stamped = writer.write_prediction(model, model_index, &prediction)?;
        unrelaxed.push((model.to_string(), stamped));
        predictions.push((model.to_string(), prediction));
        context.reporter.report(Progress::ModelFinish {
            name: model.to_string(),
            seconds,
        });
    }
    context.reporter.report(Progress::StageFinish);

    // Rank by model confidence. Cannot fail for non-empty predictions.
    let manifest = rank(&predictions, context.config.confidence_label);
    let confidences: Vec<(String, f64)> = predictions
        .iter()
        .map(|(name, p)| (name.clone(), p.ranking_confidence))
        .collect();
    advance(&mut state, TargetState::Ranked, target);

    // Relax the selected subset; per-model failures are tolerated.
    advance(&mut state, TargetState::Relaxing, target);
    let to_relax = select_for_relaxation(&manifest, context.config.relax_mode);
    let mut relax_metrics: Vec<(String, RelaxMetric)> = Vec::with_capacity(to_relax.len());
    let mut relaxed: Vec<(String, Structure)> = Vec::new();
    if !to_relax.is_empty() {
        context.reporter.report(Progress::StageStart { name: "Relaxing" });
    }
    for model in &to_relax {
        let structure = lookup(&unrelaxed, model)?;
        let (outcome, seconds) = timed(|| context.relaxer.relax(structure));
        timings.record(format!("relax_{model}"), seconds);
        match outcome {
            Ok(outcome) => {
                relax_metrics.push((model.clone(), RelaxMetric::from_outcome(&outcome)));
                writer.write_relaxed(model, &outcome.structure)?;
                relaxed.push((model.clone(), outcome.structure));
            }
            Err(e) => {
                warn!(
                    model,
                    target,
                    error = %e,
                    "Relaxation failed; keeping the unrelaxed structure for this model."
                );
                relax_metrics.push((model.clone(), RelaxMetric::from_error(&e)));
            }
        }
    }
    if !to_relax.is_empty() {
        context.reporter.report(Progress::StageFinish);
    }

    // Rank-indexed artifacts cover every ranked model exactly once, using
    // the refined structure iff that model was relaxed.
    context.reporter.report(Progress::StageStart {
        name: "Writing artifacts",
    });
    for (position, model) in manifest.order().enumerate() {
        let structure = match relaxed.iter().find(|(name, _)| name == model) {
            Some((_, structure)) => structure,
            None => lookup(&unrelaxed, model)?,
        };
        writer.write_ranked(position, structure)?;
    }

    writer.write_ranking(&manifest, &confidences)?;
    if context.config.relax_mode != RelaxMode::None {
        writer.write_relax_metrics(&relax_metrics)?;
    }

    debug!(target, stages = timings.len(), "Final timings collected.");
    writer.write_timings(&timings)?;
    advance(&mut state, TargetState::ArtifactsWritten, target);
    context.reporter.report(Progress::StageFinish);
    Ok(())
}

fn advance(state: &mut TargetState, next: TargetState, target: &str) {
    debug!(target, from = %state, to = %next, "Target state transition.");
    *state = next;
}

fn lookup<'a>(
    structures: &'a [(String, Structure)],
    model: &str,
) -> Result<&'a Structure, PipelineError> {
    structures
        .iter()
        .find(|(name, _)| name == model)
        .map(|(_, structure)| structure)
        .ok_or_else(|| {
            PipelineError::Internal(format!("ranked model '{model}' has no stored prediction"))
        })
}

/// Uses the configured base seed, or derives one pseudo-randomly for the
/// whole run and logs it so the run can be reproduced.
fn resolve_base_seed(config: &InferenceConfig, num_runners: usize) -> u64 {
    match config.base_seed {
        Some(seed) => seed,
        None => {
            let ceiling = u64::MAX / num_runners.max(1) as u64;
            let seed = rand::thread_rng().gen_range(0..ceiling);
            info!(seed, "No base seed supplied; generated one for this run.");
            seed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::features::FEATURES_FILE;
    use crate::core::models::features::{FeatureBundle, ProcessedFeatures};
    use crate::core::models::prediction::{PredictedAlignedError, PredictionResult};
    use crate::core::models::structure::{Atom, Chain, Residue};
    use crate::engine::config::{InferenceConfigBuilder, ModelKind};
    use crate::engine::relax::{RelaxError, RelaxOutcome};
    use crate::engine::runner::{ModelRunner, RunnerError};
    use nalgebra::Point3;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    struct StubRunner {
        confidence: f64,
        iptm: Option<f64>,
        with_pae: bool,
        fail: bool,
    }

    impl StubRunner {
        fn with_confidence(confidence: f64) -> Self {
            Self {
                confidence,
                iptm: None,
                with_pae: false,
                fail: false,
            }
        }
    }

    fn marker_structure(confidence: f64) -> Structure {
        let mut chain = Chain::new('A');
        let mut res = Residue::new("GLY", 1);
        // Encode the runner identity in a coordinate so artifacts can be
        // told apart by content.
        res.atoms
            .push(Atom::new("CA", "C", Point3::new(confidence, 0.0, 0.0)));
        chain.residues.push(res);
        Structure {
            chains: vec![chain],
        }
    }

    impl ModelRunner for StubRunner {
        fn process_features(
            &self,
            features: &FeatureBundle,
            _seed: u64,
        ) -> Result<ProcessedFeatures, RunnerError> {
            Ok(ProcessedFeatures::new(features.clone()))
        }

        fn predict(
            &self,
            _features: &ProcessedFeatures,
            _seed: u64,
        ) -> Result<PredictionResult, RunnerError> {
            if self.fail {
                return Err(RunnerError::new("stub runner failure"));
            }
            Ok(PredictionResult {
                structure: marker_structure(self.confidence),
                plddt: vec![self.confidence],
                ranking_confidence: self.confidence,
                ptm: None,
                iptm: self.iptm,
                pae: self.with_pae.then(|| PredictedAlignedError {
                    matrix: vec![vec![0.5]],
                    max: 31.75,
                }),
            })
        }
    }

    struct ShiftRelaxer {
        fail: bool,
    }

    impl Relaxer for ShiftRelaxer {
        fn relax(&self, structure: &Structure) -> Result<RelaxOutcome, RelaxError> {
            if self.fail {
                return Err(RelaxError::new("minimization diverged"));
            }
            let mut refined = structure.clone();
            for chain in &mut refined.chains {
                for residue in &mut chain.residues {
                    for atom in &mut residue.atoms {
                        atom.position.y += 1.0;
                    }
                }
            }
            Ok(RelaxOutcome {
                structure: refined,
                violations: vec![0.0],
            })
        }
    }

    struct TestRun {
        _tmp: tempfile::TempDir,
        root: std::path::PathBuf,
        pool: RunnerPool,
    }

    fn setup(targets: &[&str]) -> TestRun {
        let tmp = tempfile::tempdir().unwrap();
        for target in targets {
            let dir = tmp.path().join(target);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(FEATURES_FILE), r#"{"sequence": "G"}"#).unwrap();
        }

        let mut pool = RunnerPool::new();
        pool.register("a", Arc::new(StubRunner::with_confidence(10.0)));
        pool.register("b", Arc::new(StubRunner::with_confidence(30.0)));
        pool.register("c", Arc::new(StubRunner::with_confidence(20.0)));

        TestRun {
            root: tmp.path().to_path_buf(),
            _tmp: tmp,
            pool,
        }
    }

    fn config(root: &Path, mode: RelaxMode) -> InferenceConfig {
        InferenceConfigBuilder::new()
            .output_root(root)
            .relax_mode(mode)
            .base_seed(7)
            .build()
            .unwrap()
    }

    fn run_one(test: &TestRun, target: &str, mode: RelaxMode, fail_relax: bool) -> RunSummary {
        let config = config(&test.root, mode);
        let relaxer = ShiftRelaxer { fail: fail_relax };
        let reporter = ProgressReporter::new();
        run(
            &[target.to_string()],
            &test.pool,
            &relaxer,
            &config,
            &reporter,
        )
    }

    fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn best_mode_relaxes_only_the_top_ranked_model() {
        let test = setup(&["t1"]);
        let summary = run_one(&test, "t1", RelaxMode::Best, false);
        assert!(summary.all_succeeded());

        let dir = test.root.join("t1");
        let ranking: serde_json::Value =
            serde_json::from_str(&read(&dir, "ranking_debug.json")).unwrap();
        assert_eq!(ranking["order"], serde_json::json!(["b", "c", "a"]));

        assert!(dir.join("relaxed_b.pdb").exists());
        assert!(!dir.join("relaxed_c.pdb").exists());
        assert!(!dir.join("relaxed_a.pdb").exists());

        // Rank 0 carries b's refined structure; the rest fall back to the
        // unrelaxed ones.
        assert_eq!(read(&dir, "ranked_0.pdb"), read(&dir, "relaxed_b.pdb"));
        assert_eq!(read(&dir, "ranked_1.pdb"), read(&dir, "unrelaxed_c.pdb"));
        assert_eq!(read(&dir, "ranked_2.pdb"), read(&dir, "unrelaxed_a.pdb"));
        assert_ne!(read(&dir, "ranked_0.pdb"), read(&dir, "unrelaxed_b.pdb"));
    }

    #[test]
    fn rank_artifacts_cover_every_runner_in_both_formats() {
        let test = setup(&["t1"]);
        run_one(&test, "t1", RelaxMode::All, false);

        let dir = test.root.join("t1");
        for k in 0..test.pool.len() {
            assert!(dir.join(format!("ranked_{k}.pdb")).exists());
            assert!(dir.join(format!("ranked_{k}.cif")).exists());
        }
        assert!(!dir.join(format!("ranked_{}.pdb", test.pool.len())).exists());

        let metrics: serde_json::Value =
            serde_json::from_str(&read(&dir, "relax_metrics.json")).unwrap();
        for model in ["a", "b", "c"] {
            assert_eq!(metrics[model]["remaining_violations_count"], 0);
        }
    }

    #[test]
    fn missing_features_skip_the_target_without_artifacts() {
        let test = setup(&["present"]);
        let config = config(&test.root, RelaxMode::Best);
        let relaxer = ShiftRelaxer { fail: false };
        let reporter = ProgressReporter::new();
        let summary = run(
            &["absent".to_string(), "present".to_string()],
            &test.pool,
            &relaxer,
            &config,
            &reporter,
        );

        assert_eq!(summary.reports[0].state, TargetState::Skipped);
        assert!(!test.root.join("absent").exists());
        // The run carried on to the next target.
        assert_eq!(summary.reports[1].state, TargetState::ArtifactsWritten);
        assert_eq!(summary.completed(), 1);
    }

    #[test]
    fn corrupt_features_also_skip_the_target() {
        let test = setup(&["bad"]);
        fs::write(test.root.join("bad").join(FEATURES_FILE), "{oops").unwrap();
        let summary = run_one(&test, "bad", RelaxMode::Best, false);
        assert_eq!(summary.reports[0].state, TargetState::Skipped);
        assert!(!test.root.join("bad").join("timings.json").exists());
    }

    #[test]
    fn relax_failure_falls_back_to_the_unrelaxed_structure() {
        let test = setup(&["t1"]);
        let summary = run_one(&test, "t1", RelaxMode::Best, true);
        assert!(summary.all_succeeded());

        let dir = test.root.join("t1");
        assert!(!dir.join("relaxed_b.pdb").exists());
        assert_eq!(read(&dir, "ranked_0.pdb"), read(&dir, "unrelaxed_b.pdb"));

        let metrics: serde_json::Value =
            serde_json::from_str(&read(&dir, "relax_metrics.json")).unwrap();
        assert_eq!(metrics["b"]["error"], "minimization diverged");
        assert!(dir.join("timings.json").exists());
    }

    #[test]
    fn none_mode_writes_no_relax_metrics_manifest() {
        let test = setup(&["t1"]);
        run_one(&test, "t1", RelaxMode::None, false);

        let dir = test.root.join("t1");
        assert!(!dir.join("relax_metrics.json").exists());
        assert!(dir.join("ranking_debug.json").exists());
        assert!(dir.join("timings.json").exists());
    }

    #[test]
    fn runner_failure_fails_the_target_but_not_the_run() {
        let test = setup(&["t1", "t2"]);
        let mut pool = RunnerPool::new();
        pool.register("a", Arc::new(StubRunner::with_confidence(10.0)));
        pool.register(
            "broken",
            Arc::new(StubRunner {
                confidence: 0.0,
                iptm: None,
                with_pae: false,
                fail: true,
            }),
        );

        let config = config(&test.root, RelaxMode::Best);
        let relaxer = ShiftRelaxer { fail: false };
        let reporter = ProgressReporter::new();
        let summary = run(
            &["t1".to_string(), "t2".to_string()],
            &pool,
            &relaxer,
            &config,
            &reporter,
        );

        assert_eq!(summary.failed(), 2);
        assert!(summary.reports.iter().all(|r| r.state == TargetState::Failed));
        // No completion marker for an abandoned target.
        assert!(!test.root.join("t1").join("timings.json").exists());
    }

    #[test]
    fn timings_cover_every_stage_that_ran() {
        let test = setup(&["t1"]);
        run_one(&test, "t1", RelaxMode::Best, false);

        let dir = test.root.join("t1");
        let timings: serde_json::Value = serde_json::from_str(&read(&dir, "timings.json")).unwrap();
        for model in ["a", "b", "c"] {
            assert!(timings.get(format!("process_features_{model}")).is_some());
            assert!(timings.get(format!("predict_and_compile_{model}")).is_some());
            assert!(timings.get(format!("predict_benchmark_{model}")).is_none());
        }
        assert!(timings.get("relax_b").is_some());
        assert!(timings.get("relax_a").is_none());
    }

    #[test]
    fn benchmark_flag_times_an_extra_repeat_prediction() {
        let test = setup(&["t1"]);
        let config = InferenceConfigBuilder::new()
            .output_root(&test.root)
            .relax_mode(RelaxMode::None)
            .base_seed(7)
            .benchmark(true)
            .build()
            .unwrap();
        let relaxer = ShiftRelaxer { fail: false };
        let reporter = ProgressReporter::new();
        run(
            &["t1".to_string()],
            &test.pool,
            &relaxer,
            &config,
            &reporter,
        );

        let timings: serde_json::Value =
            serde_json::from_str(&read(&test.root.join("t1"), "timings.json")).unwrap();
        assert!(timings.get("predict_benchmark_a").is_some());
    }

    #[test]
    fn paired_confidence_switches_the_ranking_label() {
        let test = setup(&["t1"]);
        let mut pool = RunnerPool::new();
        pool.register(
            "m",
            Arc::new(StubRunner {
                confidence: 0.9,
                iptm: Some(0.85),
                with_pae: true,
                fail: false,
            }),
        );

        let config = InferenceConfigBuilder::new()
            .output_root(&test.root)
            .relax_mode(RelaxMode::None)
            .base_seed(1)
            .model_kind(ModelKind::Multimer)
            .build()
            .unwrap();
        let relaxer = ShiftRelaxer { fail: false };
        let reporter = ProgressReporter::new();
        run(&["t1".to_string()], &pool, &relaxer, &config, &reporter);

        let dir = test.root.join("t1");
        let ranking: serde_json::Value =
            serde_json::from_str(&read(&dir, "ranking_debug.json")).unwrap();
        assert!(ranking.get("iptm+ptm").is_some());
        assert!(ranking.get("plddts").is_none());
        assert!(dir.join("pae_m.json").exists());
    }
}
