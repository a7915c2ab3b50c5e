//! # gridviz-io: ding0 table input and GeoJSON output
//!
//! File and network plumbing around `gridviz-core`: reading a grid's CSV
//! tables, writing its GeoJSON layers atomically, listing available grids,
//! and fetching district polygons from the OpenEnergy Platform.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use gridviz_io::TableReader;
//!
//! fn main() -> anyhow::Result<()> {
//!     let tables = TableReader::default().load_grid(Path::new("data/csv"), "645")?;
//!     println!("buses: {}", tables.buses.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Layout
//!
//! | Path | Content |
//! |------|---------|
//! | `<csv_root>/<id>/buses_<id>.csv` (and four more tables) | ding0 export |
//! | `<geojson_root>/<id>/mv_visualization_*_data_<id>.geojson` | table layers |
//! | `<geojson_root>/<id>/mv_grid_district_<id>.geojson` | district layer |
//! | `<geojson_root>/available_grid_data.txt` | grid listing |

pub mod geojson;
pub mod listing;
pub mod sources;
pub mod tables;

pub use geojson::{grid_output_dir, remove_layers, write_collection, write_layer, OutputLayer};
pub use listing::{list_grid_ids, write_grid_listing, LISTING_FILE};
pub use sources::{OepPolygonSource, PolygonSource};
pub use tables::{GridTables, TableKind, TableReader};
