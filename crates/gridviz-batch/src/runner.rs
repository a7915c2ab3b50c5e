use crate::job::GridJobRecord;
use crate::manifest::{write_batch_manifest, BatchManifest, MANIFEST_FILE};
use crate::pipeline::{process_grid, PipelineSettings};
use anyhow::{Context, Result};
use chrono::Utc;
use gridviz_io::{write_grid_listing, PolygonSource};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub struct BatchRunnerConfig {
    pub grid_ids: Vec<String>,
    pub settings: PipelineSettings,
    pub dataset_version: String,
    /// 1 runs grids sequentially; 0 uses one thread per CPU.
    pub threads: usize,
    /// Rewrite `available_grid_data.txt` after the batch.
    pub write_listing: bool,
}

pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub listing_path: Option<PathBuf>,
    pub grids: Vec<GridJobRecord>,
}

/// Process every configured grid. A grid failure is recorded and the batch
/// moves on; only failures outside a single grid (output root, manifest,
/// listing) abort the run.
pub fn run_batch(config: &BatchRunnerConfig, source: &dyn PolygonSource) -> Result<BatchSummary> {
    let output_root = &config.settings.geojson_root;
    fs::create_dir_all(output_root)
        .with_context(|| format!("creating output root '{}'", output_root.display()))?;

    let run_one = |grid_id: &String| {
        GridJobRecord::from_report(&process_grid(grid_id, &config.settings, source))
    };

    let records: Vec<GridJobRecord> = if config.threads == 1 {
        config.grid_ids.iter().map(run_one).collect()
    } else {
        let thread_count = if config.threads == 0 {
            num_cpus::get()
        } else {
            config.threads
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
            .context("building Rayon thread pool for grid processing")?;
        pool.install(|| config.grid_ids.par_iter().map(run_one).collect())
    };

    let success = records.iter().filter(|record| record.is_ok()).count();
    let failure = records.len() - success;

    let manifest = BatchManifest {
        created_at: Utc::now(),
        dataset_version: config.dataset_version.clone(),
        num_grids: records.len(),
        success,
        failure,
        grids: records.clone(),
    };
    let manifest_path = output_root.join(MANIFEST_FILE);
    write_batch_manifest(&manifest_path, &manifest)?;

    let listing_path = if config.write_listing {
        Some(write_grid_listing(&config.settings.csv_root, output_root)?)
    } else {
        None
    };

    info!(success, failure, manifest = %manifest_path.display(), "batch finished");
    Ok(BatchSummary {
        success,
        failure,
        manifest_path,
        listing_path,
        grids: records,
    })
}
