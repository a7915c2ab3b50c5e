//! Display names and rounding for feature properties.
//!
//! The map front end shows properties verbatim, so raw ding0 column keys are
//! renamed to display names and numbers are rounded to a fixed precision per
//! display name. Both tables are plain data handed to [`FieldNormalizer`];
//! [`DisplayTables::ding0`] holds the set used for ding0 exports.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{GridVizError, GridVizResult};
use crate::record::{FieldValue, Record};

/// Rename and rounding tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayTables {
    /// Raw column key → display name.
    pub display_names: IndexMap<String, String>,
    /// Display name → number of decimal places.
    pub roundings: HashMap<String, u32>,
}

impl DisplayTables {
    pub fn new(
        display_names: impl IntoIterator<Item = (String, String)>,
        roundings: impl IntoIterator<Item = (String, u32)>,
    ) -> Self {
        Self {
            display_names: display_names.into_iter().collect(),
            roundings: roundings.into_iter().collect(),
        }
    }

    /// Tables for ding0 grid exports and district aggregates.
    pub fn ding0() -> Self {
        const NAMES: &[(&str, &str)] = &[
            ("p_nom", "Nominal power in kW"),
            ("s_nom", "Nominal apparent power in kVA"),
            ("bus", "Bus"),
            ("bus0", "Bus 0"),
            ("bus1", "Bus 1"),
            ("mv_grid_id", "MV grid id"),
            ("lv_grid_id", "LV grid id"),
            ("v_nom", "Nominal voltage in kV"),
            ("lat", "Latitude"),
            ("lon", "Longitude"),
            ("control", "Type of control"),
            ("type", "Technology"),
            ("subtype", "Specific technology"),
            ("weather_cell_id", "Weather cell id"),
            ("length", "Length in km"),
            ("num_parallel", "Parallel lines"),
            ("subst_id", "Substation id"),
            ("zensus_sum", "Population"),
            ("area_ha", "Area in km²"),
            ("consumption", "Annual consumption in MWh"),
            ("annual_consumption", "Annual consumption in kWh"),
            ("peak_load", "Peak load in kW"),
            ("sector", "Sector"),
            ("dea_capacity", "Generation capacity in kW"),
            ("mv_dea_capacity", "MV generation capacity in kW"),
            ("lv_dea_capacity", "LV generation capacity in kW"),
        ];
        // Nominal power stays unrounded: ding0 reports it in MW, so a
        // zero-decimal rule would flatten small generators to 0.
        const ROUNDINGS: &[(&str, u32)] = &[
            ("Annual consumption in MWh", 0),
            ("Annual consumption in kWh", 0),
            ("Nominal apparent power in kVA", 0),
            ("Area in km²", 0),
            ("Generation capacity in kW", 0),
            ("MV generation capacity in kW", 0),
            ("LV generation capacity in kW", 0),
            ("Peak load in kW", 1),
            ("x", 5),
            ("r", 5),
            ("Length in km", 3),
            ("Latitude", 6),
            ("Longitude", 6),
        ];

        Self::new(
            NAMES
                .iter()
                .map(|(raw, display)| (raw.to_string(), display.to_string())),
            ROUNDINGS
                .iter()
                .map(|(display, places)| (display.to_string(), *places)),
        )
    }

    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.display_names
            .get(key)
            .map(String::as_str)
            .unwrap_or(key)
    }
}

/// Round to `places` decimals, ties to even.
pub fn round_half_even(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / factor
}

/// Renames then rounds record fields according to a [`DisplayTables`].
#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    tables: DisplayTables,
}

impl Default for FieldNormalizer {
    fn default() -> Self {
        Self::new(DisplayTables::ding0())
    }
}

impl FieldNormalizer {
    pub fn new(tables: DisplayTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &DisplayTables {
        &self.tables
    }

    /// Normalize one record. Coordinates pass through untouched.
    pub fn normalize(&self, record: &Record) -> GridVizResult<Record> {
        let mut fields = IndexMap::with_capacity(record.fields.len());
        for (key, value) in &record.fields {
            let display = self.tables.display_name(key);
            fields.insert(display.to_string(), value.clone());
        }

        // Rounding looks up display names, so it runs after every rename
        for (display, value) in fields.iter_mut() {
            if let Some(places) = self.tables.roundings.get(display) {
                *value = round_value(display, value, *places)?;
            }
        }

        Ok(Record {
            fields,
            coordinates: record.coordinates.clone(),
        })
    }

    /// Normalize a record set, stopping at the first failing record.
    pub fn normalize_all(&self, records: &[Record]) -> GridVizResult<Vec<Record>> {
        records.iter().map(|r| self.normalize(r)).collect()
    }
}

fn round_value(field: &str, value: &FieldValue, places: u32) -> GridVizResult<FieldValue> {
    match value {
        FieldValue::Missing => Ok(FieldValue::Missing),
        FieldValue::Integer(i) => Ok(FieldValue::Integer(*i)),
        FieldValue::Float(f) => Ok(FieldValue::Float(round_half_even(*f, places))),
        FieldValue::Text(text) => match value.as_f64() {
            Some(f) => Ok(FieldValue::Float(round_half_even(f, places))),
            None => Err(GridVizError::normalization(
                field,
                format!("cannot round non-numeric value '{text}'"),
            )),
        },
    }
}
