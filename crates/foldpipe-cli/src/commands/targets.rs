use crate::cli::TargetsArgs;
use crate::error::{CliError, Result};
use foldpipe::core::io::features::FeatureStore;
use tracing::info;

pub async fn run(args: TargetsArgs) -> Result<()> {
    let store = FeatureStore::new(&args.output_dir);
    let targets = store.discover_targets().map_err(CliError::Io)?;
    info!(count = targets.len(), "Scanned for preprocessed targets.");

    if targets.is_empty() {
        println!(
            "No targets with feature bundles under '{}'.",
            args.output_dir.display()
        );
        return Ok(());
    }

    for target in &targets {
        println!("{}", target);
    }
    Ok(())
}
