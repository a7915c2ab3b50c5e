//! Per-grid pipeline driver and batch runner.
//!
//! [`process_grid`] turns one grid identifier's tables into its five GeoJSON
//! layers. [`run_batch`] drives many identifiers, isolating failures per grid
//! and recording the outcome of each in `batch_manifest.json`.

pub mod job;
pub mod manifest;
pub mod pipeline;
pub mod runner;

pub use job::{failure_kind, GridJobRecord, JobStatus};
pub use manifest::{load_batch_manifest, write_batch_manifest, BatchManifest, MANIFEST_FILE};
pub use pipeline::{
    build_layers, layer_path, process_grid, GridLayers, GridReport, PipelineSettings,
    GENERATOR_MAX_VOLTAGE,
};
pub use runner::{run_batch, BatchRunnerConfig, BatchSummary};
