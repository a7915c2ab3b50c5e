use gridviz_core::GridVizError;
use serde::{Deserialize, Serialize};

use crate::pipeline::GridReport;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Ok,
    Error,
}

/// Manifest entry for one grid identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridJobRecord {
    pub grid_id: String,
    pub status: JobStatus,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    /// Files written for this grid, including those written before a failure.
    pub outputs: Vec<String>,
    pub dropped_rows: usize,
    pub warnings: usize,
}

impl GridJobRecord {
    pub fn from_report(report: &GridReport) -> Self {
        let (status, error_kind, error) = match &report.result {
            Ok(()) => (JobStatus::Ok, None, None),
            Err(err) => (
                JobStatus::Error,
                Some(failure_kind(err).to_string()),
                Some(format!("{err:#}")),
            ),
        };
        Self {
            grid_id: report.grid_id.clone(),
            status,
            error_kind,
            error,
            outputs: report
                .written
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            dropped_rows: report.diagnostics.dropped_rows(),
            warnings: report.diagnostics.warning_count(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == JobStatus::Ok
    }
}

/// Stable label for a grid failure, taken from the first typed error in the chain.
pub fn failure_kind(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<GridVizError>() {
            return e.kind();
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return "IoError";
        }
    }
    "Error"
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn kind_is_found_behind_context() {
        let err = Err::<(), _>(GridVizError::RemoteFetch("status 503".into()))
            .context("grid 645")
            .unwrap_err();
        assert_eq!(failure_kind(&err), "RemoteFetchError");

        let io = Err::<(), _>(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
            .context("opening table")
            .unwrap_err();
        assert_eq!(failure_kind(&io), "IoError");

        assert_eq!(failure_kind(&anyhow::anyhow!("plain")), "Error");
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JobStatus::Ok).unwrap(), "\"ok\"");
        assert_eq!(serde_json::to_string(&JobStatus::Error).unwrap(), "\"error\"");
    }
}
