//! Typed cells and ordered records.
//!
//! ding0 tables are loosely typed: numbers, identifiers and free text share
//! columns, and absent values show up as empty cells or `NaN`. [`FieldValue`]
//! keeps those apart, with [`FieldValue::Missing`] as the single explicit
//! "unknown" sentinel. It serializes as JSON `null`, never as `0` or `""`.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::wkb::{Position, Ring};

/// Raw key of the geometry payload column.
pub const GEOM_KEY: &str = "geom";
/// Key under which coordinates travel when a record is flattened.
pub const COORDINATES_KEY: &str = "coordinates";
/// Internal geometry-type tag some exports carry.
pub const GEOM_TYPE_KEY: &str = "geom_type";

/// Keys that never reach feature properties.
pub const GEOMETRY_KEYS: [&str; 3] = [GEOM_KEY, COORDINATES_KEY, GEOM_TYPE_KEY];

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Missing,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Parse one CSV cell, guessing integer, float or text.
    pub fn parse(cell: &str) -> Self {
        let cell = cell.trim();
        if is_missing_marker(cell) {
            return FieldValue::Missing;
        }
        if let Ok(i) = cell.parse::<i64>() {
            return FieldValue::Integer(i);
        }
        match cell.parse::<f64>() {
            Ok(f) if f.is_nan() => FieldValue::Missing,
            Ok(f) => FieldValue::Float(f),
            Err(_) => FieldValue::Text(cell.to_string()),
        }
    }

    /// Keep one CSV cell verbatim. Identifiers such as `007` and hex
    /// geometry payloads such as `...E610...` must not go through
    /// number parsing.
    pub fn text(cell: &str) -> Self {
        let cell = cell.trim();
        if is_missing_marker(cell) {
            FieldValue::Missing
        } else {
            FieldValue::Text(cell.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Numeric view; text is coerced when it parses as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
            FieldValue::Missing => None,
        }
    }

    /// Numeric view where anything absent or non-numeric counts as zero.
    pub fn as_f64_or_zero(&self) -> f64 {
        self.as_f64().unwrap_or(0.0)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Key form used for joins: integers and text compare by their display.
    pub fn key(&self) -> Option<String> {
        match self {
            FieldValue::Missing => None,
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{}", *f as i64))
            }
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Text(s) => Some(s.clone()),
        }
    }
}

fn is_missing_marker(cell: &str) -> bool {
    cell.is_empty() || matches!(cell, "nan" | "NaN" | "NAN" | "None" | "null")
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            FieldValue::Missing
        } else {
            FieldValue::Float(value)
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Missing => serializer.serialize_none(),
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            FieldValue::Float(_) => serializer.serialize_none(),
            FieldValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Coordinates attached to a record after joining.
///
/// The shape is untyped until the feature assembler interprets it for a
/// declared geometry kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinates {
    Position(Position),
    Path(Vec<Position>),
    Rings(Vec<Ring>),
}

/// One table row: ordered fields plus optional coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub fields: IndexMap<String, FieldValue>,
    pub coordinates: Option<Coordinates>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Insert or overwrite, keeping the original position on overwrite.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Numeric value of a field; absent, missing or non-numeric yields zero.
    pub fn number_or_zero(&self, key: &str) -> f64 {
        self.get(key).map(FieldValue::as_f64_or_zero).unwrap_or(0.0)
    }
}
