//! One grid identifier, start to finish.
//!
//! All four table layers are computed before anything is written. Any failure
//! up to and including the layer writes removes every layer of the grid,
//! including files left by an earlier run. The district lookup runs last:
//! when it fails, the fresh table layers stay on disk while an older district
//! file is removed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gridviz_core::aggregate::V_NOM_KEY;
use gridviz_core::{
    assemble, enrich_district, Aggregator, BusIndex, Diagnostics, DistrictAggregate,
    FeatureCollection, FieldNormalizer, FieldValue, GridVizResult, Kilovolts, Record,
};
use gridviz_io::{
    remove_layers, write_layer, GridTables, OutputLayer, PolygonSource, TableReader,
};
use tracing::{debug, error, info, warn};

/// Generators at or above this voltage are left off the map layer.
pub const GENERATOR_MAX_VOLTAGE: Kilovolts = Kilovolts(110.0);

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub csv_root: PathBuf,
    pub geojson_root: PathBuf,
    pub reader: TableReader,
    pub normalizer: FieldNormalizer,
    pub aggregator: Aggregator,
    pub generator_max_voltage: Kilovolts,
}

impl PipelineSettings {
    pub fn new(csv_root: impl Into<PathBuf>, geojson_root: impl Into<PathBuf>) -> Self {
        Self {
            csv_root: csv_root.into(),
            geojson_root: geojson_root.into(),
            reader: TableReader::default(),
            normalizer: FieldNormalizer::default(),
            aggregator: Aggregator::default(),
            generator_max_voltage: GENERATOR_MAX_VOLTAGE,
        }
    }
}

/// The four table layers of a grid plus its district totals.
#[derive(Debug, Clone)]
pub struct GridLayers {
    pub transformers: FeatureCollection,
    pub generators: FeatureCollection,
    pub lines: FeatureCollection,
    pub loads: FeatureCollection,
    pub aggregate: DistrictAggregate,
}

impl GridLayers {
    pub fn table_layers(&self) -> [(OutputLayer, &FeatureCollection); 4] {
        [
            (OutputLayer::Transformers, &self.transformers),
            (OutputLayer::Generators, &self.generators),
            (OutputLayer::Lines, &self.lines),
            (OutputLayer::Loads, &self.loads),
        ]
    }
}

/// Join, aggregate, normalize and assemble the table layers.
pub fn build_layers(
    tables: &GridTables,
    settings: &PipelineSettings,
    diag: &mut Diagnostics,
) -> GridVizResult<GridLayers> {
    let index = BusIndex::build(&tables.buses, diag)?;

    let transformers = index.join_single(&tables.transformers, "bus0", diag)?;
    let generators = index.join_single(&tables.generators, "bus", diag)?;
    let loads = index.join_single(&tables.loads, "bus", diag)?;
    let lines = index.join_lines(&tables.lines, diag)?;

    let aggregate = settings.aggregator.aggregate(&generators, &loads);

    let displayed: Vec<Record> = generators
        .into_iter()
        .filter(|g| below_voltage(g, settings.generator_max_voltage))
        .collect();

    let normalizer = &settings.normalizer;
    Ok(GridLayers {
        transformers: assemble(
            &normalizer.normalize_all(&transformers)?,
            OutputLayer::Transformers.geometry_kind(),
        )?,
        generators: assemble(
            &normalizer.normalize_all(&displayed)?,
            OutputLayer::Generators.geometry_kind(),
        )?,
        lines: assemble(&normalizer.normalize_all(&lines)?, OutputLayer::Lines.geometry_kind())?,
        loads: assemble(&normalizer.normalize_all(&loads)?, OutputLayer::Loads.geometry_kind())?,
        aggregate,
    })
}

// A missing voltage keeps the generator on the map.
fn below_voltage(record: &Record, cap: Kilovolts) -> bool {
    record
        .get(V_NOM_KEY)
        .and_then(FieldValue::as_f64)
        .map_or(true, |v| Kilovolts(v) < cap)
}

/// Outcome of one grid identifier.
#[derive(Debug)]
pub struct GridReport {
    pub grid_id: String,
    pub written: Vec<PathBuf>,
    pub diagnostics: Diagnostics,
    pub result: Result<()>,
}

impl GridReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Process one grid identifier. Never panics on bad data; failures land in
/// [`GridReport::result`].
pub fn process_grid(
    grid_id: &str,
    settings: &PipelineSettings,
    source: &dyn PolygonSource,
) -> GridReport {
    info!(grid_id, "processing grid");
    let mut written = Vec::new();
    let mut diagnostics = Diagnostics::new();

    let result = run_grid(grid_id, settings, source, &mut written, &mut diagnostics);

    if diagnostics.dropped_rows() > 0 {
        warn!(
            grid_id,
            dropped = diagnostics.dropped_rows(),
            "rows dropped for unresolved bus references"
        );
    }
    match &result {
        Ok(()) => info!(grid_id, files = written.len(), "grid done"),
        Err(err) => error!(
            grid_id,
            kind = crate::job::failure_kind(err),
            files = written.len(),
            "grid failed: {err:#}"
        ),
    }

    GridReport {
        grid_id: grid_id.to_string(),
        written,
        diagnostics,
        result,
    }
}

fn run_grid(
    grid_id: &str,
    settings: &PipelineSettings,
    source: &dyn PolygonSource,
    written: &mut Vec<PathBuf>,
    diag: &mut Diagnostics,
) -> Result<()> {
    let layers = match load_layers(grid_id, settings, diag) {
        Ok(layers) => layers,
        Err(err) => {
            discard_layers(settings, grid_id, &OutputLayer::ALL);
            return Err(err);
        }
    };

    for (layer, collection) in layers.table_layers() {
        match write_layer(&settings.geojson_root, grid_id, layer, collection) {
            Ok(path) => written.push(path),
            Err(err) => {
                written.clear();
                discard_layers(settings, grid_id, &OutputLayer::ALL);
                return Err(err);
            }
        }
    }

    match write_district(grid_id, settings, source, &layers.aggregate) {
        Ok(path) => {
            written.push(path);
            Ok(())
        }
        Err(err) => {
            discard_layers(settings, grid_id, &[OutputLayer::District]);
            Err(err)
        }
    }
}

fn load_layers(
    grid_id: &str,
    settings: &PipelineSettings,
    diag: &mut Diagnostics,
) -> Result<GridLayers> {
    let tables = settings
        .reader
        .load_grid(&settings.csv_root, grid_id)
        .with_context(|| format!("loading tables for grid {grid_id}"))?;

    let layers = build_layers(&tables, settings, diag)
        .with_context(|| format!("building layers for grid {grid_id}"))?;
    Ok(layers)
}

fn write_district(
    grid_id: &str,
    settings: &PipelineSettings,
    source: &dyn PolygonSource,
    aggregate: &DistrictAggregate,
) -> Result<PathBuf> {
    let polygon = source
        .fetch_district(grid_id)
        .with_context(|| format!("fetching district polygon for grid {grid_id}"))?;
    debug!(grid_id, area_km2 = polygon.area_km2, "district polygon resolved");

    let district = enrich_district(grid_id, aggregate, &polygon, &settings.normalizer)
        .with_context(|| format!("building district feature for grid {grid_id}"))?;
    write_layer(&settings.geojson_root, grid_id, OutputLayer::District, &district)
}

// Layers left over from an earlier run must not outlive a failed one.
fn discard_layers(settings: &PipelineSettings, grid_id: &str, layers: &[OutputLayer]) {
    match remove_layers(&settings.geojson_root, grid_id, layers) {
        Ok(removed) if !removed.is_empty() => {
            debug!(grid_id, files = removed.len(), "removed stale layers")
        }
        Ok(_) => {}
        Err(err) => warn!(grid_id, "could not remove stale layers: {err:#}"),
    }
}

/// Where `layer` of `grid_id` lands under `geojson_root`.
pub fn layer_path(geojson_root: &Path, grid_id: &str, layer: OutputLayer) -> PathBuf {
    gridviz_io::grid_output_dir(geojson_root, grid_id).join(layer.file_name(grid_id))
}
