//! GeoJSON output files.
//!
//! Every layer of a grid lands in `<geojson_root>/<id>/`. Files are written
//! to a temporary file in the target directory and renamed into place, so a
//! reader never observes a half-written collection.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gridviz_core::{FeatureCollection, GeometryKind};
use tempfile::NamedTempFile;
use tracing::debug;

/// Map layers written per grid identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayer {
    Transformers,
    Generators,
    Lines,
    Loads,
    District,
}

impl OutputLayer {
    pub const ALL: [OutputLayer; 5] = [
        OutputLayer::Transformers,
        OutputLayer::Generators,
        OutputLayer::Lines,
        OutputLayer::Loads,
        OutputLayer::District,
    ];

    /// Layers built from the local tables, in write order.
    pub const TABLE_LAYERS: [OutputLayer; 4] = [
        OutputLayer::Transformers,
        OutputLayer::Generators,
        OutputLayer::Lines,
        OutputLayer::Loads,
    ];

    pub fn geometry_kind(&self) -> GeometryKind {
        match self {
            OutputLayer::Lines => GeometryKind::LineString,
            OutputLayer::District => GeometryKind::MultiPolygon,
            _ => GeometryKind::Point,
        }
    }

    pub fn file_name(&self, grid_id: &str) -> String {
        match self {
            OutputLayer::Transformers => format!("mv_visualization_transformer_data_{grid_id}.geojson"),
            OutputLayer::Generators => format!("mv_visualization_generator_data_{grid_id}.geojson"),
            OutputLayer::Lines => format!("mv_visualization_line_data_{grid_id}.geojson"),
            OutputLayer::Loads => format!("mv_visualization_load_data_{grid_id}.geojson"),
            OutputLayer::District => format!("mv_grid_district_{grid_id}.geojson"),
        }
    }
}

/// Output directory for one grid identifier.
pub fn grid_output_dir(geojson_root: &Path, grid_id: &str) -> PathBuf {
    geojson_root.join(grid_id)
}

/// Serialize `collection` and atomically replace `path` with it.
pub fn write_collection(collection: &FeatureCollection, path: &Path) -> Result<()> {
    let json = collection
        .to_json()
        .with_context(|| format!("serializing {}", path.display()))?;
    write_atomic(path, json.as_bytes())?;
    debug!(path = %path.display(), features = collection.len(), "wrote feature collection");
    Ok(())
}

/// Write one layer for `grid_id`, creating the grid directory if needed.
pub fn write_layer(
    geojson_root: &Path,
    grid_id: &str,
    layer: OutputLayer,
    collection: &FeatureCollection,
) -> Result<PathBuf> {
    let dir = grid_output_dir(geojson_root, grid_id);
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    let path = dir.join(layer.file_name(grid_id));
    write_collection(collection, &path)?;
    Ok(path)
}

/// Delete the given layers of `grid_id`. Layers that are not on disk are
/// skipped. Every layer is attempted; the first failure is returned after
/// the rest have been removed.
pub fn remove_layers(
    geojson_root: &Path,
    grid_id: &str,
    layers: &[OutputLayer],
) -> Result<Vec<PathBuf>> {
    let dir = grid_output_dir(geojson_root, grid_id);
    let mut removed = Vec::new();
    let mut first_error = None;
    for layer in layers {
        let path = dir.join(layer.file_name(grid_id));
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed layer");
                removed.push(path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                let err = anyhow::Error::new(e).context(format!("removing {}", path.display()));
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(removed),
    }
}

pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("writing temporary file for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}
