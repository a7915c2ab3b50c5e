//! Subcommand handlers.

use anyhow::{bail, Result};
use gridviz_batch::{run_batch, BatchRunnerConfig};
use gridviz_io::{list_grid_ids, write_grid_listing};
use tracing::{info, warn};

use crate::config::Settings;

/// Run the batch for the configured grid ids. Fails when any grid failed,
/// after every grid has been attempted.
pub fn process(settings: &Settings) -> Result<()> {
    let grid_ids = settings.grid_ids()?;
    let pipeline = settings.pipeline()?;
    let source = settings.polygon_source();

    info!(
        grids = grid_ids.len(),
        csv_root = %settings.data.csv_root.display(),
        geojson_root = %settings.data.geojson_root.display(),
        version = %settings.data.dataset_version,
        "starting batch"
    );

    let config = BatchRunnerConfig {
        grid_ids,
        settings: pipeline,
        dataset_version: settings.data.dataset_version.clone(),
        threads: settings.processing.threads,
        write_listing: settings.processing.write_listing,
    };
    let summary = run_batch(&config, &source)?;

    println!(
        "Processed {} grid(s): {} ok, {} failed (manifest: {})",
        summary.grids.len(),
        summary.success,
        summary.failure,
        summary.manifest_path.display()
    );
    for record in summary.grids.iter().filter(|r| !r.is_ok()) {
        let kind = record.error_kind.as_deref().unwrap_or("Error");
        let message = record.error.as_deref().unwrap_or_default();
        warn!(grid_id = %record.grid_id, kind, "{message}");
        println!("  {} {}: {}", record.grid_id, kind, message);
    }

    if summary.failure > 0 {
        bail!("{} of {} grid(s) failed", summary.failure, summary.grids.len());
    }
    Ok(())
}

/// Print the grid ids found under the CSV root and write the listing file.
pub fn list(settings: &Settings) -> Result<()> {
    let ids = list_grid_ids(&settings.data.csv_root)?;
    for id in &ids {
        println!("{id}");
    }
    write_grid_listing(&settings.data.csv_root, &settings.data.geojson_root)?;
    Ok(())
}
