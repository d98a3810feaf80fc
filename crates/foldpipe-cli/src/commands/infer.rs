use crate::backend;
use crate::cli::InferArgs;
use crate::config::{self, RunFileConfig};
use crate::error::{CliError, Result};
use crate::progress::CliProgressHandler;
use foldpipe::core::io::features::FeatureStore;
use foldpipe::engine::progress::ProgressReporter;
use foldpipe::engine::state::TargetState;
use foldpipe::workflows;
use tracing::{info, warn};

pub async fn run(args: InferArgs) -> Result<()> {
    let file_config = RunFileConfig::from_file(&args.config)?;
    let inference_config = config::build_inference_config(&args, &file_config)?;

    let store = FeatureStore::new(&args.output_dir);
    let targets = if args.target_names.is_empty() {
        let found = store.discover_targets().map_err(CliError::Io)?;
        if found.is_empty() {
            return Err(CliError::Argument(format!(
                "no preprocessed feature bundles found under '{}'; run preprocessing first",
                args.output_dir.display()
            )));
        }
        info!(
            count = found.len(),
            targets = ?found,
            "Discovered targets with preprocessed features."
        );
        found
    } else {
        args.target_names.clone()
    };

    let (pool, relaxer) = backend::build_backend(&file_config, &inference_config)?;
    info!(
        models = pool.len(),
        names = ?pool.names().collect::<Vec<_>>(),
        "Runner pool assembled."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Running inference on {} target(s) with {} model runner(s)...",
        targets.len(),
        pool.len()
    );
    let summary = tokio::task::block_in_place(|| {
        workflows::infer::run(&targets, &pool, relaxer.as_ref(), &inference_config, &reporter)
    });

    for report in &summary.reports {
        match report.state {
            TargetState::ArtifactsWritten => println!("  ✓ {}", report.name),
            TargetState::Skipped => {
                println!(
                    "  - {} skipped ({})",
                    report.name,
                    report.error.as_deref().unwrap_or("no features")
                );
            }
            _ => {
                warn!(target = %report.name, error = ?report.error, "Target did not complete.");
                println!(
                    "  ✗ {} failed ({})",
                    report.name,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    if !summary.all_succeeded() {
        return Err(CliError::RunIncomplete {
            failed: summary.reports.len() - summary.completed(),
            total: summary.reports.len(),
        });
    }
    Ok(())
}
