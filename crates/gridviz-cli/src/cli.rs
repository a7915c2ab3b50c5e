use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gridviz",
    author,
    version,
    about = "Convert ding0 grid tables into GeoJSON map layers"
)]
pub struct Cli {
    /// Set the logging level (RUST_LOG directives take precedence)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// TOML file overriding the built-in configuration
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub conf: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the GeoJSON layers for one or more grid identifiers
    Process(ProcessArgs),
    /// List grid identifiers under the CSV root and write the listing file
    List(PathArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct PathArgs {
    /// Directory with one subdirectory of ding0 CSV tables per grid
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub csv_root: Option<PathBuf>,

    /// Directory receiving the GeoJSON layers
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub geojson_root: Option<PathBuf>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ProcessArgs {
    /// Grid identifiers: `645`, `645,655` or `645..655`
    #[arg(short, long)]
    pub grid_ids: Option<String>,

    #[command(flatten)]
    pub paths: PathArgs,

    /// Dataset version used for the district lookup
    #[arg(long)]
    pub dataset_version: Option<String>,

    /// Base URL of the district registry API
    #[arg(long, value_hint = ValueHint::Url)]
    pub base_url: Option<String>,

    /// Timeout for the district lookup in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Worker threads across grids (1 = sequential, 0 = one per CPU)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Do not rewrite available_grid_data.txt after the batch
    #[arg(long)]
    pub no_listing: bool,
}
