//! # gridviz-core: ding0 tables to map features
//!
//! Data model and algorithms for turning ding0 medium-voltage grid exports
//! into GeoJSON feature collections. No file or network I/O happens here;
//! see `gridviz-io` for readers and writers and `gridviz-batch` for the
//! per-grid driver.
//!
//! ## Pipeline
//!
//! ```text
//! buses ──wkb──► BusIndex ──join──► records ──normalize──► assemble ──► FeatureCollection
//!                                      │
//!                                      └──aggregate──► DistrictAggregate ──enrich(+polygon)──► district feature
//! ```
//!
//! ```rust,no_run
//! use gridviz_core::*;
//!
//! fn transformers(buses: &RawTable, raw: &RawTable) -> GridVizResult<FeatureCollection> {
//!     let mut diag = Diagnostics::new();
//!     let index = BusIndex::build(buses, &mut diag)?;
//!     let joined = index.join_single(raw, "bus0", &mut diag)?;
//!     let normalized = FieldNormalizer::default().normalize_all(&joined)?;
//!     assemble(&normalized, GeometryKind::Point)
//! }
//! ```
//!
//! ## Modules
//!
//! - [`wkb`] - hex WKB / EWKB decoding
//! - [`record`] - typed cells, the `Missing` sentinel, ordered records
//! - [`table`] - raw tables as loaded from CSV
//! - [`join`] - bus index and foreign-key joins
//! - [`normalize`] - display names and rounding
//! - [`aggregate`] - district totals
//! - [`feature`] - GeoJSON feature collections
//! - [`district`] - district feature enrichment
//! - [`diagnostics`] - dropped-row accounting

pub mod aggregate;
pub mod diagnostics;
pub mod district;
pub mod error;
pub mod feature;
pub mod join;
pub mod normalize;
pub mod record;
pub mod table;
pub mod units;
pub mod wkb;

pub use aggregate::{Aggregator, DistrictAggregate, MV_THRESHOLD};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity, TableStats};
pub use district::{base_record, enrich_district, merge_district, DistrictPolygon};
pub use error::{GridVizError, GridVizResult};
pub use feature::{assemble, Feature, FeatureCollection, Geometry, GeometryKind};
pub use join::{BusIndex, IndexedBus};
pub use normalize::{round_half_even, DisplayTables, FieldNormalizer};
pub use record::{Coordinates, FieldValue, Record};
pub use table::RawTable;
pub use units::{Kilovolts, Kilowatts, Megawatts};
pub use wkb::{DecodeError, DecodedGeometry, Position, Ring};
