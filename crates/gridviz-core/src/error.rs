//! Unified error types for the gridviz pipeline
//!
//! [`GridVizError`] covers every failure the core can raise while turning
//! ding0 tables into feature collections. Record-local problems (an
//! undecodable bus geometry) never surface here as errors: they are absorbed
//! by filtering and reported through [`crate::diagnostics::Diagnostics`].
//! Everything that does surface aborts the grid identifier being processed.
//!
//! # Example
//!
//! ```ignore
//! use gridviz_core::{GridVizError, GridVizResult};
//!
//! fn process(grid_id: &str) -> GridVizResult<()> {
//!     let index = BusIndex::build(&buses, &mut diag)?;
//!     let transformers = index.join_single(&raw, "bus0", &mut diag)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::wkb::DecodeError;

/// Unified error type for all gridviz operations.
#[derive(Error, Debug)]
pub enum GridVizError {
    /// Malformed geometry payload
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Duplicate join key or missing required column
    #[error("Schema violation in {table}: {message}")]
    SchemaViolation { table: String, message: String },

    /// A value could not be rounded per its rounding rule
    #[error("Normalization error for '{field}': {message}")]
    Normalization { field: String, message: String },

    /// Geometry kind outside Point / LineString / MultiPolygon
    #[error("Unsupported geometry kind: {0}")]
    UnsupportedGeometryKind(String),

    /// A record's coordinates do not fit the declared geometry kind
    #[error("Geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// Network or malformed-response failure on the district polygon lookup
    #[error("Remote fetch error: {0}")]
    RemoteFetch(String),

    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GridVizError {
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        GridVizError::SchemaViolation {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn normalization(field: impl Into<String>, message: impl Into<String>) -> Self {
        GridVizError::Normalization {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable label used in logs and the batch manifest.
    pub fn kind(&self) -> &'static str {
        match self {
            GridVizError::Decode(_) => "DecodeError",
            GridVizError::SchemaViolation { .. } => "SchemaViolation",
            GridVizError::Normalization { .. } => "NormalizationError",
            GridVizError::UnsupportedGeometryKind(_) => "UnsupportedGeometryKind",
            GridVizError::GeometryMismatch(_) => "GeometryMismatch",
            GridVizError::RemoteFetch(_) => "RemoteFetchError",
            GridVizError::Io(_) => "IoError",
            GridVizError::Parse(_) => "ParseError",
            GridVizError::Config(_) => "ConfigError",
        }
    }
}

/// Convenience type alias for Results using GridVizError.
pub type GridVizResult<T> = Result<T, GridVizError>;

impl From<serde_json::Error> for GridVizError {
    fn from(err: serde_json::Error) -> Self {
        GridVizError::Parse(err.to_string())
    }
}
