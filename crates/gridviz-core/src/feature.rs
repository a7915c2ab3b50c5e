//! GeoJSON feature collections.
//!
//! Map layers draw features in array order, so [`assemble`] never reorders:
//! feature `i` is built from record `i`.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{GridVizError, GridVizResult};
use crate::record::{Coordinates, FieldValue, Record, GEOMETRY_KEYS};
use crate::wkb::{Position, Ring};

/// Geometry kinds a layer can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    LineString,
    MultiPolygon,
}

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryKind {
    type Err = GridVizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Point" => Ok(GeometryKind::Point),
            "LineString" => Ok(GeometryKind::LineString),
            "MultiPolygon" => Ok(GeometryKind::MultiPolygon),
            other => Err(GridVizError::UnsupportedGeometryKind(other.to_string())),
        }
    }
}

/// GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    /// Polygons, each a list of rings (exterior only here).
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Interpret record coordinates as `kind`.
    pub fn from_coordinates(coordinates: &Coordinates, kind: GeometryKind) -> Option<Self> {
        match (kind, coordinates) {
            (GeometryKind::Point, Coordinates::Position(p)) => Some(Geometry::Point(*p)),
            (GeometryKind::LineString, Coordinates::Path(path)) if path.len() >= 2 => {
                Some(Geometry::LineString(path.clone()))
            }
            (GeometryKind::MultiPolygon, Coordinates::Rings(rings)) if !rings.is_empty() => Some(
                Geometry::MultiPolygon(rings.iter().map(|ring| vec![ring.clone()]).collect()),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: IndexMap<String, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_json(&self) -> GridVizResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Build one feature from a normalized record.
pub fn feature_from_record(record: &Record, kind: GeometryKind) -> GridVizResult<Feature> {
    let geometry = record
        .coordinates
        .as_ref()
        .and_then(|c| Geometry::from_coordinates(c, kind))
        .ok_or_else(|| {
            GridVizError::GeometryMismatch(format!(
                "record {} has no {kind} coordinates",
                record
                    .get("name")
                    .and_then(FieldValue::key)
                    .unwrap_or_else(|| "<unnamed>".to_string())
            ))
        })?;

    let properties = record
        .fields
        .iter()
        .filter(|(key, _)| !GEOMETRY_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Feature {
        geometry,
        properties,
    })
}

/// Wrap records into a collection, preserving record order.
pub fn assemble(records: &[Record], kind: GeometryKind) -> GridVizResult<FeatureCollection> {
    let features = records
        .iter()
        .map(|record| feature_from_record(record, kind))
        .collect::<GridVizResult<Vec<_>>>()?;
    Ok(FeatureCollection { features })
}
