//! In-memory tables as loaded from ding0 CSV exports.

use crate::error::{GridVizError, GridVizResult};
use crate::record::Record;

/// A named table: header order plus rows in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Build a table whose header is the key order of the first row.
    pub fn from_records(name: impl Into<String>, rows: Vec<Record>) -> Self {
        let columns = rows
            .first()
            .map(|r| r.fields.keys().cloned().collect())
            .unwrap_or_default();
        Self::new(name, columns, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fail with a schema violation when a required column is absent.
    pub fn require_columns(&self, columns: &[&str]) -> GridVizResult<()> {
        let missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| !self.has_column(c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GridVizError::schema(
                &self.name,
                format!("missing required column(s): {}", missing.join(", ")),
            ))
        }
    }
}

/// Label for a row in diagnostics: its `name` cell, or its position.
pub(crate) fn row_label(record: &Record, position: usize) -> String {
    record
        .get("name")
        .and_then(|v| v.key())
        .unwrap_or_else(|| format!("row {}", position + 1))
}
