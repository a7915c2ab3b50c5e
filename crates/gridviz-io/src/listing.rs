//! Listing of grid identifiers available under the CSV root.
//!
//! The map front end reads `available_grid_data.txt` to populate its grid
//! selector: a `gridids` header followed by one identifier per line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::geojson::write_atomic;

pub const LISTING_FILE: &str = "available_grid_data.txt";
pub const LISTING_HEADER: &str = "gridids";

/// Subdirectory names of `csv_root`, sorted numerically where possible.
pub fn list_grid_ids(csv_root: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(csv_root)
        .with_context(|| format!("listing grid directories in {}", csv_root.display()))?;

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("reading entry of {}", csv_root.display()))?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
    }

    ids.sort_by(|a, b| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    Ok(ids)
}

/// Render the listing file body.
pub fn render_listing(ids: &[String]) -> String {
    let mut out = String::from(LISTING_HEADER);
    out.push('\n');
    for id in ids {
        out.push_str(id);
        out.push('\n');
    }
    out
}

/// Write `<geojson_root>/available_grid_data.txt` from the CSV root.
pub fn write_grid_listing(csv_root: &Path, geojson_root: &Path) -> Result<PathBuf> {
    let ids = list_grid_ids(csv_root)?;
    fs::create_dir_all(geojson_root)
        .with_context(|| format!("creating {}", geojson_root.display()))?;
    let path = geojson_root.join(LISTING_FILE);
    write_atomic(&path, render_listing(&ids).as_bytes())?;
    info!(path = %path.display(), grids = ids.len(), "wrote grid listing");
    Ok(path)
}
