//! Diagnostics collected while reformatting one grid.
//!
//! Rows dropped by design (undecodable bus geometry, dangling foreign keys)
//! are not errors. They are counted here per table so the batch summary can
//! report how much of each table made it into the map.

use indexmap::IndexMap;
use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Row kept or skipped, run continues
    Warning,
    /// Row could not be processed
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping ("geometry", "join", ...)
    pub category: String,
    pub message: String,
    /// Entity reference, e.g. a bus or line name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }

        Ok(())
    }
}

/// Kept / dropped row counts for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub rows: usize,
    pub kept: usize,
    pub dropped: usize,
}

/// Issues plus per-table statistics for one grid identifier.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub tables: IndexMap<String, TableStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn record_table(&mut self, table: &str, rows: usize, kept: usize) {
        self.tables.insert(
            table.to_string(),
            TableStats {
                rows,
                kept,
                dropped: rows.saturating_sub(kept),
            },
        );
    }

    pub fn table(&self, table: &str) -> Option<&TableStats> {
        self.tables.get(table)
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn dropped_rows(&self) -> usize {
        self.tables.values().map(|t| t.dropped).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_table_stats() {
        let mut diag = Diagnostics::new();
        diag.add_warning_with_entity("join", "bus has no coordinates", "trafo_1");
        diag.add_error_with_entity("geometry", "payload truncated", "bus_2");
        diag.record_table("transformers", 5, 3);
        diag.record_table("lines", 4, 4);

        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.table("transformers").unwrap().dropped, 2);
        assert_eq!(diag.dropped_rows(), 2);
    }

    #[test]
    fn test_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Warning, "join", "dangling bus0")
            .with_entity("line_7");
        assert_eq!(issue.to_string(), "[warning:join] dangling bus0 (line_7)");
    }
}
