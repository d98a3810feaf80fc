use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "foldpipe CLI - Orchestrates multi-model structure-prediction inference: runs a predictor pool over preprocessed features, ranks and selectively relaxes the outputs, and writes the per-target artifact set.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run inference over targets with preprocessed feature bundles.
    Infer(InferArgs),
    /// List the targets under an output directory that are ready for inference.
    Targets(TargetsArgs),
}

/// Relaxation subset choice, mirrored onto the core configuration.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaxModeArg {
    None,
    Best,
    All,
}

impl From<RelaxModeArg> for foldpipe::engine::config::RelaxMode {
    fn from(arg: RelaxModeArg) -> Self {
        match arg {
            RelaxModeArg::None => Self::None,
            RelaxModeArg::Best => Self::Best,
            RelaxModeArg::All => Self::All,
        }
    }
}

/// Arguments for the `infer` subcommand.
#[derive(Args, Debug)]
pub struct InferArgs {
    /// Directory containing per-target feature bundles; results are stored
    /// alongside them.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Path to the run configuration file in TOML format (predictor backend
    /// and defaults).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Names of targets to run on; defaults to every target with a feature
    /// bundle under the output directory.
    #[arg(short, long, value_delimiter = ',', value_name = "NAMES")]
    pub target_names: Vec<String>,

    /// Which ranked predictions to relax, overriding the config file.
    #[arg(long, value_enum, value_name = "MODE")]
    pub models_to_relax: Option<RelaxModeArg>,

    /// Base random seed for the run, overriding the config file. Generated
    /// and logged when absent.
    #[arg(long, value_name = "INT")]
    pub random_seed: Option<u64>,

    /// Stochastic predictions per model architecture (multimer runs only).
    #[arg(long, value_name = "INT")]
    pub num_predictions_per_model: Option<usize>,

    /// Time one extra repeat prediction per runner to measure inference cost
    /// without compilation.
    #[arg(long)]
    pub benchmark: bool,
}

/// Arguments for the `targets` subcommand.
#[derive(Args, Debug)]
pub struct TargetsArgs {
    /// Directory to scan for per-target feature bundles.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,
}
