//! ding0 CSV table loading.
//!
//! One directory per grid identifier, one file per entity type:
//!
//! ```text
//! <csv_root>/<id>/buses_<id>.csv
//! <csv_root>/<id>/transformers_<id>.csv
//! <csv_root>/<id>/generators_<id>.csv
//! <csv_root>/<id>/lines_<id>.csv
//! <csv_root>/<id>/loads_<id>.csv
//! ```
//!
//! Cells are typed with [`FieldValue::parse`], except in the identifier and
//! geometry columns listed in [`TEXT_COLUMNS`], which are kept verbatim with
//! [`FieldValue::text`]. Columns with an empty header (a pandas index written
//! without a name) are dropped.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use gridviz_core::join::BUS_KEY;
use gridviz_core::record::GEOM_KEY;
use gridviz_core::{FieldValue, GridVizError, RawTable, Record};
use tracing::debug;

/// Entity tables of one ding0 export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Buses,
    Transformers,
    Generators,
    Lines,
    Loads,
}

impl TableKind {
    pub const ALL: [TableKind; 5] = [
        TableKind::Buses,
        TableKind::Transformers,
        TableKind::Generators,
        TableKind::Lines,
        TableKind::Loads,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Buses => "buses",
            TableKind::Transformers => "transformers",
            TableKind::Generators => "generators",
            TableKind::Lines => "lines",
            TableKind::Loads => "loads",
        }
    }

    pub fn file_name(&self, grid_id: &str) -> String {
        format!("{}_{}.csv", self.as_str(), grid_id)
    }

    pub fn path(&self, csv_root: &Path, grid_id: &str) -> PathBuf {
        csv_root.join(grid_id).join(self.file_name(grid_id))
    }
}

/// All five tables for one grid identifier.
#[derive(Debug, Clone, Default)]
pub struct GridTables {
    pub buses: RawTable,
    pub transformers: RawTable,
    pub generators: RawTable,
    pub lines: RawTable,
    pub loads: RawTable,
}

/// Columns never typed as numbers: bus names, bus references and the
/// hex geometry payload.
pub const TEXT_COLUMNS: &[&str] = &[BUS_KEY, GEOM_KEY, "bus", "bus0", "bus1"];

/// CSV reader settings.
#[derive(Debug, Clone, Copy)]
pub struct TableReader {
    pub delimiter: u8,
    pub text_columns: &'static [&'static str],
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl TableReader {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            text_columns: TEXT_COLUMNS,
        }
    }

    /// Parse a table from any reader.
    pub fn read_from<R: Read>(&self, name: &str, reader: R) -> Result<RawTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| GridVizError::Parse(e.to_string()))
            .with_context(|| format!("reading header of table '{name}'"))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let kept: Vec<(usize, String, fn(&str) -> FieldValue)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| {
                let typer: fn(&str) -> FieldValue = if self.text_columns.contains(&h.as_str()) {
                    FieldValue::text
                } else {
                    FieldValue::parse
                };
                (i, h.clone(), typer)
            })
            .collect();

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let row = result
                .map_err(|e| GridVizError::Parse(e.to_string()))
                .with_context(|| format!("parsing row {} of table '{name}'", line + 1))?;
            let mut record = Record::new();
            for (i, column, typer) in &kept {
                let value = row.get(*i).map(*typer).unwrap_or_default();
                record.insert(column.clone(), value);
            }
            rows.push(record);
        }

        let columns = kept.into_iter().map(|(_, h, _)| h).collect();
        Ok(RawTable::new(name, columns, rows))
    }

    pub fn read_path(&self, name: &str, path: &Path) -> Result<RawTable> {
        let file = File::open(path)
            .with_context(|| format!("opening table '{}'", path.display()))?;
        let table = self
            .read_from(name, file)
            .with_context(|| format!("reading table '{}'", path.display()))?;
        debug!(table = name, rows = table.len(), path = %path.display(), "loaded table");
        Ok(table)
    }

    /// Load every table for `grid_id` under `csv_root`.
    pub fn load_grid(&self, csv_root: &Path, grid_id: &str) -> Result<GridTables> {
        let load = |kind: TableKind| self.read_path(kind.as_str(), &kind.path(csv_root, grid_id));
        Ok(GridTables {
            buses: load(TableKind::Buses)?,
            transformers: load(TableKind::Transformers)?,
            generators: load(TableKind::Generators)?,
            lines: load(TableKind::Lines)?,
            loads: load(TableKind::Loads)?,
        })
    }
}
