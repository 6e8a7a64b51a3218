//! Spherical nearest-neighbor search core over an S2 cell index.
//!
//! This crate implements the query side of a geospatial index: given a
//! point on the Earth's sphere, an optional annular distance range and an
//! optional filter shape, it yields matching documents in strictly
//! increasing or decreasing angular distance, driving range scans against
//! an external sorted index that maps space-filling-curve cell ids to
//! document ids.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          NearIterator                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ring bounds + delta  │  priority buffer  │  seen-set  │ scanned │
//! └──────────────────────────────────────────────────────────────────┘
//!            │ intervals()                          ▲ report_found()
//!            ▼                                      │
//!   covering (cap / annulus) ──► scan Intervals ──► CellScanner
//!                                                (sorted cell index)
//! ```
//!
//! The iterator sweeps an annulus outward (or inward for descending
//! queries) across the distance range, covers each ring with cells,
//! subtracts everything already scanned, and hands the resulting id
//! intervals to the caller. Documents reported back are distance-sorted
//! in a priority buffer and released only once the ring frontier has
//! moved past them, which is what makes the emission order correct under
//! cell-granular scans.
//!
//! Filter shapes come from GeoJSON via [`geojson::parse_region`] and
//! support exact point containment and conservative cell pre-filtering.
//!
//! # Modules
//!
//! - [`config`]: query parameters and covering configuration
//! - [`coord`]: coordinates and unit-sphere points
//! - [`covering`]: cell coverings, scan intervals, scanned-cell set
//! - [`loops`]: spherical loops (validation, orientation, containment)
//! - [`shape`]: the shape container and its cell pre-filter
//! - [`geojson`]: GeoJSON ingestion
//! - [`near`]: the near iterator
//! - [`index`]: storage adapter seam and in-memory reference index
//! - [`error`]: error types

pub mod config;
pub mod coord;
pub mod covering;
pub mod error;
pub mod geojson;
pub mod index;
pub mod loops;
pub mod near;
pub mod shape;

pub use config::{
    CoveringConfig, FilterMode, QueryParams, SortOrder, EARTH_RADIUS_METERS,
    MAX_RADIANS_BETWEEN_POINTS,
};
pub use coord::{Coordinate, UnitPoint};
pub use covering::{scan_intervals, CellRangeSet, Interval};
pub use error::{GeoError, Result};
pub use geojson::{geojson_type, parse_region, GeoJsonType};
pub use index::{index_cell, near_search, CellScanner, MemoryCellIndex};
pub use loops::SphereLoop;
pub use near::{Document, NearIterator};
pub use shape::{LatLngRect, ShapeContainer, SpherePolygon};
