use std::time::Duration;

use gridviz_core::wkb::decode_rings;
use gridviz_core::{DistrictPolygon, GridVizError, GridVizResult};
use serde_json::Value;
use tracing::{debug, info};

use super::PolygonSource;

pub const DEFAULT_BASE_URL: &str = "https://openenergy-platform.org/api/v0";
pub const DEFAULT_SCHEMA: &str = "grid";
pub const DEFAULT_TABLE: &str = "ego_dp_mv_griddistrict";

/// District polygon lookup against the OpenEnergy Platform REST API.
///
/// Issues one blocking GET per substation:
/// `<base_url>/schema/<schema>/tables/<table>/rows/?where=version=<v>&where=subst_id=<id>`.
#[derive(Debug, Clone)]
pub struct OepPolygonSource {
    pub base_url: String,
    pub schema: String,
    pub table: String,
    pub version: String,
    pub timeout: Duration,
}

impl OepPolygonSource {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            table: DEFAULT_TABLE.to_string(),
            version: version.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn rows_url(&self) -> String {
        format!(
            "{}/schema/{}/tables/{}/rows/",
            self.base_url.trim_end_matches('/'),
            self.schema,
            self.table
        )
    }
}

impl PolygonSource for OepPolygonSource {
    fn fetch_district(&self, subst_id: &str) -> GridVizResult<DistrictPolygon> {
        let url = self.rows_url();
        debug!(url = %url, subst_id, version = %self.version, "requesting district polygon");

        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let response = agent
            .get(&url)
            .query("where", &format!("version={}", self.version))
            .query("where", &format!("subst_id={subst_id}"))
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => {
                    GridVizError::RemoteFetch(format!("{url} returned status {code}"))
                }
                other => GridVizError::RemoteFetch(format!("request to {url} failed: {other}")),
            })?;

        let body: Value = response
            .into_json()
            .map_err(|e| GridVizError::RemoteFetch(format!("invalid JSON from {url}: {e}")))?;

        let polygon = parse_district_rows(&body, subst_id)?;
        info!(subst_id, area_km2 = polygon.area_km2, parts = polygon.rings.len(), "fetched district polygon");
        Ok(polygon)
    }
}

/// Interpret the registry's row array. The first row is used.
pub fn parse_district_rows(body: &Value, subst_id: &str) -> GridVizResult<DistrictPolygon> {
    let fail = |msg: String| GridVizError::RemoteFetch(format!("district {subst_id}: {msg}"));

    let rows = body
        .as_array()
        .ok_or_else(|| fail("response is not a JSON array".to_string()))?;
    let row = rows.first().ok_or_else(|| fail("no rows returned".to_string()))?;

    let area_ha = match &row["area_ha"] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| fail("missing or non-numeric area_ha".to_string()))?;

    let geom = row["geom"]
        .as_str()
        .ok_or_else(|| fail("missing geom".to_string()))?;
    let rings = decode_rings(geom).map_err(|e| fail(format!("undecodable geom: {e}")))?;

    Ok(DistrictPolygon::from_hectares(subst_id, area_ha, rings))
}
