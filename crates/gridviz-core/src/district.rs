//! District feature: table aggregates plus the registry polygon.

use serde::Serialize;

use crate::aggregate::DistrictAggregate;
use crate::error::GridVizResult;
use crate::feature::{assemble, FeatureCollection, GeometryKind};
use crate::normalize::FieldNormalizer;
use crate::record::{Coordinates, FieldValue, Record};
use crate::wkb::Ring;

pub const SUBST_ID_KEY: &str = "subst_id";
/// Keyed `area_ha` to match the registry column; the value is in km².
pub const AREA_KEY: &str = "area_ha";

/// Polygon and area of one district as returned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictPolygon {
    pub subst_id: String,
    pub area_km2: f64,
    /// One exterior ring per polygon part.
    pub rings: Vec<Ring>,
}

impl DistrictPolygon {
    pub fn from_hectares(subst_id: impl Into<String>, area_ha: f64, rings: Vec<Ring>) -> Self {
        Self {
            subst_id: subst_id.into(),
            area_km2: area_ha / 100.0,
            rings,
        }
    }

    fn to_record(&self) -> Record {
        Record::from_fields([
            (SUBST_ID_KEY, FieldValue::parse(&self.subst_id)),
            (AREA_KEY, FieldValue::from(self.area_km2)),
        ])
        .with_coordinates(Coordinates::Rings(self.rings.clone()))
    }
}

/// Raw-key district record built from the local tables alone.
pub fn base_record(grid_id: &str, aggregate: &DistrictAggregate) -> Record {
    let mut base = Record::from_fields([(SUBST_ID_KEY, FieldValue::parse(grid_id))]);
    for (key, value) in aggregate.to_record().fields {
        base.insert(key, value);
    }
    base
}

/// Merge a base district record with registry data.
///
/// The registry's area always wins; every other colliding key keeps the
/// base value.
pub fn merge_district(base: Record, polygon: &DistrictPolygon) -> Record {
    let mut merged = base;
    let remote = polygon.to_record();
    for (key, value) in remote.fields {
        if key == AREA_KEY || !merged.contains(&key) {
            merged.insert(key, value);
        }
    }
    merged.coordinates = remote.coordinates;
    merged
}

/// Build the single-feature district collection.
pub fn enrich_district(
    grid_id: &str,
    aggregate: &DistrictAggregate,
    polygon: &DistrictPolygon,
    normalizer: &FieldNormalizer,
) -> GridVizResult<FeatureCollection> {
    let merged = merge_district(base_record(grid_id, aggregate), polygon);
    let record = normalizer.normalize(&merged)?;
    assemble(&[record], GeometryKind::MultiPolygon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Geometry;
    use crate::units::Kilowatts;

    fn square() -> Ring {
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]
    }

    fn aggregate() -> DistrictAggregate {
        DistrictAggregate {
            mv_generation: Kilowatts(1200.4),
            lv_generation: Kilowatts(300.6),
            peak_load: Kilowatts(850.25),
            annual_consumption: 2_000_000.0,
        }
    }

    #[test]
    fn area_converts_hectares_to_square_kilometres() {
        let polygon = DistrictPolygon::from_hectares("645", 12_345.0, vec![square()]);
        assert_eq!(polygon.area_km2, 123.45);
    }

    #[test]
    fn merged_record_combines_both_sources() {
        let polygon = DistrictPolygon::from_hectares("645", 5000.0, vec![square()]);
        let record = merge_district(base_record("645", &aggregate()), &polygon);
        let keys: Vec<&str> = record.fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "subst_id",
                "mv_dea_capacity",
                "lv_dea_capacity",
                "peak_load",
                "annual_consumption",
                "area_ha"
            ]
        );
        assert_eq!(record.get(AREA_KEY), Some(&FieldValue::Float(50.0)));
        assert_eq!(record.get(SUBST_ID_KEY), Some(&FieldValue::Integer(645)));
    }

    #[test]
    fn registry_area_wins_on_collision_other_keys_do_not() {
        let polygon = DistrictPolygon::from_hectares("999", 5000.0, vec![square()]);
        let mut base = base_record("645", &aggregate());
        base.insert(AREA_KEY, 1.0);
        let record = merge_district(base, &polygon);
        assert_eq!(record.get(AREA_KEY), Some(&FieldValue::Float(50.0)));
        assert_eq!(record.get(SUBST_ID_KEY), Some(&FieldValue::Integer(645)));
    }

    #[test]
    fn enriched_district_is_one_normalized_multipolygon() {
        let polygon = DistrictPolygon::from_hectares("645", 12_345.0, vec![square()]);
        let collection =
            enrich_district("645", &aggregate(), &polygon, &FieldNormalizer::default()).unwrap();

        assert_eq!(collection.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(feature.geometry, Geometry::MultiPolygon(vec![vec![square()]]));
        assert_eq!(
            feature.properties.get("MV generation capacity in kW"),
            Some(&FieldValue::Float(1200.0))
        );
        assert_eq!(
            feature.properties.get("LV generation capacity in kW"),
            Some(&FieldValue::Float(301.0))
        );
        assert_eq!(
            feature.properties.get("Peak load in kW"),
            Some(&FieldValue::Float(850.2))
        );
        assert_eq!(
            feature.properties.get("Area in km²"),
            Some(&FieldValue::Float(123.0))
        );
        assert_eq!(
            feature.properties.get("Substation id"),
            Some(&FieldValue::Integer(645))
        );
    }
}
