//! Command-line parsing for `whcap`.
//!
//! Argument parsing and command dispatch stay separate from the pipeline
//! code. Every option can also come from a `WHCAP_*` environment variable
//! (`.env` files are loaded before parsing).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::features::ImputeStrategy;
use crate::models::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "whcap", version, about = "Warehouse capacity model: train, predict, serve")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the feature pipeline and a model on a CSV, then save one bundle.
    Train(TrainArgs),
    /// Predict for one JSON document (object or array of objects).
    Predict(PredictArgs),
    /// Load a bundle once and answer one JSON request per stdin line.
    Serve(ServeArgs),
    /// Write a synthetic supply-chain CSV in the default column layout.
    Generate(GenerateArgs),
}

/// Column role overrides. Unset lists fall back to the built-in roles.
#[derive(Debug, Args, Clone, Default)]
pub struct RoleArgs {
    /// JSON file with `target`, `required`, `impute`, `categorical`, `ignore`.
    #[arg(long, value_name = "JSON", env = "WHCAP_ROLES")]
    pub roles: Option<PathBuf>,

    /// Target column.
    #[arg(long, env = "WHCAP_TARGET")]
    pub target: Option<String>,

    /// Columns whose missing values drop the row.
    #[arg(long, value_delimiter = ',', env = "WHCAP_REQUIRED")]
    pub required: Option<Vec<String>>,

    /// Numeric columns to impute.
    #[arg(long, value_delimiter = ',', env = "WHCAP_IMPUTE")]
    pub impute: Option<Vec<String>>,

    /// Columns to one-hot encode.
    #[arg(long, value_delimiter = ',', env = "WHCAP_CATEGORICAL")]
    pub categorical: Option<Vec<String>>,

    /// Columns excluded from the features.
    #[arg(long, value_delimiter = ',', env = "WHCAP_IGNORE")]
    pub ignore: Option<Vec<String>>,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Training CSV.
    #[arg(long, value_name = "CSV", env = "WHCAP_DATA")]
    pub data: PathBuf,

    /// Where to write the bundle.
    #[arg(long, value_name = "PATH", env = "WHCAP_ARTIFACT")]
    pub artifact: PathBuf,

    /// Optional JSON run report.
    #[arg(long, value_name = "JSON")]
    pub report: Option<PathBuf>,

    #[command(flatten)]
    pub roles: RoleArgs,

    /// Estimator to fit.
    #[arg(long, value_enum, default_value_t = ModelKind::Forest, env = "WHCAP_MODEL")]
    pub model: ModelKind,

    /// Number of trees (forest only).
    #[arg(long, default_value_t = 10)]
    pub trees: usize,

    /// Bootstrap seed (forest only).
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Maximum tree depth (forest only; unlimited when unset).
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Minimum rows to split a node (forest only).
    #[arg(long, default_value_t = 2)]
    pub min_samples_split: usize,

    /// Minimum rows per leaf (forest only).
    #[arg(long, default_value_t = 1)]
    pub min_samples_leaf: usize,

    /// Share of rows held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Seed for the train/test shuffle.
    #[arg(long, default_value_t = 1)]
    pub split_seed: u64,

    /// How imputed columns are filled.
    #[arg(long, value_enum, default_value_t = ImputeStrategy::Mean)]
    pub impute_strategy: ImputeStrategy,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Bundle written by `whcap train`.
    #[arg(long, value_name = "PATH", env = "WHCAP_ARTIFACT")]
    pub artifact: PathBuf,

    /// JSON request file (stdin when omitted).
    #[arg(long, value_name = "JSON")]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    /// Bundle written by `whcap train`.
    #[arg(long, value_name = "PATH", env = "WHCAP_ARTIFACT")]
    pub artifact: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Output CSV.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of rows.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub rows: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
