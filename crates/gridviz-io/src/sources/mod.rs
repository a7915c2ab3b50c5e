//! District polygon sources.

use gridviz_core::{DistrictPolygon, GridVizResult};

pub mod oep;

pub use oep::{parse_district_rows, OepPolygonSource};

/// Looks up the district polygon for a substation identifier.
///
/// Failures surface as [`gridviz_core::GridVizError::RemoteFetch`].
pub trait PolygonSource: Send + Sync {
    fn fetch_district(&self, subst_id: &str) -> GridVizResult<DistrictPolygon>;
}
