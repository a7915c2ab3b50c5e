//! Layered configuration.
//!
//! Three layers, later ones winning key by key:
//!
//! 1. `config/default.toml`, embedded in the binary
//! 2. the file passed with `--conf` (any subset of keys)
//! 3. command-line flags
//!
//! Unknown keys are rejected so a typo never silently falls back to a default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use gridviz_batch::PipelineSettings;
use gridviz_core::{Aggregator, GridVizError, GridVizResult, Kilovolts};
use gridviz_io::{OepPolygonSource, TableReader};
use serde::{Deserialize, Serialize};

use crate::cli::{PathArgs, ProcessArgs};

pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub data: DataSettings,
    pub remote: RemoteSettings,
    pub processing: ProcessingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSettings {
    pub grid_ids: String,
    pub csv_root: PathBuf,
    pub geojson_root: PathBuf,
    pub dataset_version: String,
    pub delimiter: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSettings {
    pub base_url: String,
    pub schema: String,
    pub table: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingSettings {
    pub threads: usize,
    pub mv_threshold_kv: f64,
    pub generator_max_voltage_kv: f64,
    pub write_listing: bool,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            grid_ids: String::new(),
            csv_root: PathBuf::from("."),
            geojson_root: PathBuf::from("."),
            dataset_version: String::new(),
            delimiter: ',',
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: gridviz_io::sources::oep::DEFAULT_BASE_URL.to_string(),
            schema: gridviz_io::sources::oep::DEFAULT_SCHEMA.to_string(),
            table: gridviz_io::sources::oep::DEFAULT_TABLE.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            threads: 1,
            mv_threshold_kv: 0.4,
            generator_max_voltage_kv: 110.0,
            write_listing: true,
        }
    }
}

impl Settings {
    /// Built-in defaults overlaid with an optional user file.
    pub fn load(user_file: Option<&Path>) -> Result<Self> {
        let mut merged: toml::Value =
            toml::from_str(DEFAULT_CONFIG).context("parsing built-in default configuration")?;

        if let Some(path) = user_file {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file '{}'", path.display()))?;
            let overlay: toml::Value = toml::from_str(&text)
                .map_err(|e| GridVizError::Config(e.to_string()))
                .with_context(|| format!("parsing config file '{}'", path.display()))?;
            merge_values(&mut merged, overlay);
        }

        let settings: Settings = merged
            .try_into()
            .map_err(|e: toml::de::Error| GridVizError::Config(e.to_string()))
            .context("invalid configuration")?;
        Ok(settings)
    }

    pub fn apply_paths(&mut self, args: &PathArgs) {
        if let Some(csv_root) = &args.csv_root {
            self.data.csv_root = csv_root.clone();
        }
        if let Some(geojson_root) = &args.geojson_root {
            self.data.geojson_root = geojson_root.clone();
        }
    }

    pub fn apply_process_args(&mut self, args: &ProcessArgs) {
        self.apply_paths(&args.paths);
        if let Some(grid_ids) = &args.grid_ids {
            self.data.grid_ids = grid_ids.clone();
        }
        if let Some(version) = &args.dataset_version {
            self.data.dataset_version = version.clone();
        }
        if let Some(base_url) = &args.base_url {
            self.remote.base_url = base_url.clone();
        }
        if let Some(timeout) = args.timeout_secs {
            self.remote.timeout_secs = timeout;
        }
        if let Some(threads) = args.threads {
            self.processing.threads = threads;
        }
        if args.no_listing {
            self.processing.write_listing = false;
        }
    }

    pub fn grid_ids(&self) -> GridVizResult<Vec<String>> {
        parse_grid_ids(&self.data.grid_ids)
    }

    pub fn pipeline(&self) -> GridVizResult<PipelineSettings> {
        if !self.data.delimiter.is_ascii() {
            return Err(GridVizError::Config(format!(
                "delimiter '{}' is not a single-byte character",
                self.data.delimiter
            )));
        }
        let mut pipeline =
            PipelineSettings::new(&self.data.csv_root, &self.data.geojson_root);
        pipeline.reader = TableReader::new(self.data.delimiter as u8);
        pipeline.aggregator = Aggregator::new(Kilovolts(self.processing.mv_threshold_kv));
        pipeline.generator_max_voltage = Kilovolts(self.processing.generator_max_voltage_kv);
        Ok(pipeline)
    }

    pub fn polygon_source(&self) -> OepPolygonSource {
        OepPolygonSource {
            base_url: self.remote.base_url.clone(),
            schema: self.remote.schema.clone(),
            table: self.remote.table.clone(),
            version: self.data.dataset_version.clone(),
            timeout: Duration::from_secs(self.remote.timeout_secs),
        }
    }
}

/// Recursively overlay `overlay` onto `base`; tables merge, everything else replaces.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Largest number of ids a selector may expand to.
pub const MAX_SELECTED_GRIDS: usize = 100_000;

/// Expand a grid id selector: a single id, a comma list, or an inclusive
/// `start..end` range. List items may themselves be ranges.
pub fn parse_grid_ids(selector: &str) -> GridVizResult<Vec<String>> {
    let mut ids = Vec::new();
    for item in selector.split(',').map(str::trim) {
        if item.is_empty() {
            return Err(GridVizError::Config(format!(
                "empty grid id in selector '{selector}'"
            )));
        }
        match item.split_once("..") {
            Some((start, end)) => {
                let start = parse_id(start.trim(), selector)?;
                let end = parse_id(end.trim(), selector)?;
                if start > end {
                    return Err(GridVizError::Config(format!(
                        "grid id range {start}..{end} is empty"
                    )));
                }
                let span = u64::from(end - start) + 1;
                if ids.len() as u64 + span > MAX_SELECTED_GRIDS as u64 {
                    return Err(too_many_ids(selector));
                }
                ids.extend((start..=end).map(|id| id.to_string()));
            }
            None => {
                if ids.len() >= MAX_SELECTED_GRIDS {
                    return Err(too_many_ids(selector));
                }
                ids.push(parse_id(item, selector)?.to_string());
            }
        }
    }
    Ok(ids)
}

fn too_many_ids(selector: &str) -> GridVizError {
    GridVizError::Config(format!(
        "selector '{selector}' expands to more than {MAX_SELECTED_GRIDS} grid ids"
    ))
}

fn parse_id(text: &str, selector: &str) -> GridVizResult<u32> {
    text.parse().map_err(|_| {
        GridVizError::Config(format!("'{text}' in selector '{selector}' is not a grid id"))
    })
}
