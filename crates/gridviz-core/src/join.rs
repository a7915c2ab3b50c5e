//! Bus index and foreign-key joins.
//!
//! Buses are the only spatially positioned entity in a ding0 export;
//! transformers, generators, loads and lines inherit positions through their
//! bus references. The bus table is decoded and indexed once per grid
//! ([`BusIndex::build`]) and every dependent table is looked up against that index.
//!
//! Joins are inner joins: a dependent row whose bus is unknown or has no
//! decodable geometry is dropped and counted in [`Diagnostics`]. That is
//! data-quality filtering, not an error.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::diagnostics::Diagnostics;
use crate::error::{GridVizError, GridVizResult};
use crate::record::{Coordinates, FieldValue, Record, GEOM_KEY};
use crate::table::{row_label, RawTable};
use crate::wkb::{decode_point, Position};

/// Column holding the bus identifier.
pub const BUS_KEY: &str = "name";
/// Derived latitude column (y of the decoded point).
pub const LAT_KEY: &str = "lat";
/// Derived longitude column (x of the decoded point).
pub const LON_KEY: &str = "lon";

/// Bus columns never copied onto dependent rows.
const BUS_ONLY_KEYS: [&str; 2] = [BUS_KEY, GEOM_KEY];

/// One bus row with its decoded position.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedBus {
    /// Raw bus fields plus `lat` / `lon` when the position resolved.
    pub record: Record,
    pub position: Option<Position>,
}

/// Arena of bus rows plus a name → slot map.
#[derive(Debug, Clone, Default)]
pub struct BusIndex {
    buses: Vec<IndexedBus>,
    by_name: HashMap<String, usize>,
}

impl BusIndex {
    /// Decode bus geometries and index buses by name.
    ///
    /// Duplicate bus names are a schema violation: the index never picks one
    /// of several candidates.
    pub fn build(table: &RawTable, diag: &mut Diagnostics) -> GridVizResult<Self> {
        table.require_columns(&[BUS_KEY, GEOM_KEY])?;

        let mut buses = Vec::with_capacity(table.len());
        let mut by_name = HashMap::with_capacity(table.len());

        for (position, row) in table.rows.iter().enumerate() {
            let name = row.get(BUS_KEY).and_then(FieldValue::key).ok_or_else(|| {
                GridVizError::schema(
                    &table.name,
                    format!("row {} has no bus name", position + 1),
                )
            })?;

            if by_name.insert(name.clone(), buses.len()).is_some() {
                return Err(GridVizError::schema(
                    &table.name,
                    format!("duplicate bus name '{name}'"),
                ));
            }

            buses.push(index_bus(row, &name, diag));
        }

        let index = Self { buses, by_name };
        diag.record_table(&table.name, table.len(), index.resolved_count());
        debug!(
            table = %table.name,
            buses = index.len(),
            resolved = index.resolved_count(),
            "indexed buses"
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    /// Number of buses with a usable position.
    pub fn resolved_count(&self) -> usize {
        self.buses.iter().filter(|b| b.position.is_some()).count()
    }

    pub fn get(&self, name: &str) -> Option<&IndexedBus> {
        self.by_name.get(name).map(|&slot| &self.buses[slot])
    }

    /// Buses in table order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexedBus> {
        self.buses.iter()
    }

    /// Look up a bus that has a position.
    pub fn resolve(&self, key: &FieldValue) -> Option<(&IndexedBus, Position)> {
        let bus = self.get(&key.key()?)?;
        bus.position.map(|p| (bus, p))
    }

    /// Inner join of a single-reference table (transformers, generators,
    /// loads) on `foreign_key`. Output keeps the dependent table's order.
    pub fn join_single(
        &self,
        table: &RawTable,
        foreign_key: &str,
        diag: &mut Diagnostics,
    ) -> GridVizResult<Vec<Record>> {
        table.require_columns(&[foreign_key])?;

        let mut joined = Vec::with_capacity(table.len());
        for (position, row) in table.rows.iter().enumerate() {
            let reference = row.get(foreign_key).cloned().unwrap_or_default();
            match self.resolve(&reference) {
                Some((bus, pos)) => {
                    let record = merge_bus_fields(row, bus).with_coordinates(Coordinates::Position(pos));
                    joined.push(record);
                }
                None => {
                    let entity = row_label(row, position);
                    diag.add_warning_with_entity(
                        "join",
                        &format!("{foreign_key} '{}' has no resolved bus", display_key(&reference)),
                        &entity,
                    );
                }
            }
        }

        diag.record_table(&table.name, table.len(), joined.len());
        log_join(&table.name, table.len(), joined.len());
        Ok(joined)
    }

    /// Join lines on both endpoints, keeping a line only when `bus0` and
    /// `bus1` both resolve. Coordinates are `[origin, destination]`; bus
    /// fields are taken from the `bus0` endpoint.
    pub fn join_lines(&self, table: &RawTable, diag: &mut Diagnostics) -> GridVizResult<Vec<Record>> {
        table.require_columns(&["bus0", "bus1"])?;

        let mut joined = Vec::with_capacity(table.len());
        for (position, row) in table.rows.iter().enumerate() {
            let bus0 = row.get("bus0").cloned().unwrap_or_default();
            let bus1 = row.get("bus1").cloned().unwrap_or_default();

            match (self.resolve(&bus0), self.resolve(&bus1)) {
                (Some((origin, from)), Some((_, to))) => {
                    let record =
                        merge_bus_fields(row, origin).with_coordinates(Coordinates::Path(vec![from, to]));
                    joined.push(record);
                }
                (first, _) => {
                    let (endpoint, reference) = if first.is_none() {
                        ("bus0", &bus0)
                    } else {
                        ("bus1", &bus1)
                    };
                    diag.add_warning_with_entity(
                        "join",
                        &format!("{endpoint} '{}' has no resolved bus", display_key(reference)),
                        &row_label(row, position),
                    );
                }
            }
        }

        diag.record_table(&table.name, table.len(), joined.len());
        log_join(&table.name, table.len(), joined.len());
        Ok(joined)
    }
}

fn index_bus(row: &Record, name: &str, diag: &mut Diagnostics) -> IndexedBus {
    let position = match row.get(GEOM_KEY) {
        None | Some(FieldValue::Missing) => None,
        Some(FieldValue::Text(payload)) => match decode_point(payload) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(bus = name, error = %e, "undecodable bus geometry, bus excluded from joins");
                diag.add_error_with_entity("geometry", &e.to_string(), name);
                None
            }
        },
        Some(other) => {
            diag.add_error_with_entity(
                "geometry",
                &format!("geometry cell is not a hex payload: {other:?}"),
                name,
            );
            None
        }
    };

    let mut record = row.clone();
    if let Some([x, y]) = position {
        record.insert(LAT_KEY, y);
        record.insert(LON_KEY, x);
        record.coordinates = Some(Coordinates::Position([x, y]));
    }
    IndexedBus { record, position }
}

/// Dependent fields first, then bus fields the row does not already carry.
fn merge_bus_fields(row: &Record, bus: &IndexedBus) -> Record {
    let mut merged = row.clone();
    for (key, value) in &bus.record.fields {
        if BUS_ONLY_KEYS.contains(&key.as_str()) || merged.contains(key) {
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn display_key(value: &FieldValue) -> String {
    value.key().unwrap_or_else(|| "<missing>".to_string())
}

fn log_join(table: &str, rows: usize, kept: usize) {
    if kept < rows {
        debug!(table, rows, kept, dropped = rows - kept, "joined with dropped rows");
    } else {
        debug!(table, rows, "joined");
    }
}
