//! Query and covering configuration.

use crate::coord::Coordinate;
use crate::error::{GeoError, Result};
use crate::shape::ShapeContainer;
use s2::region::RegionCoverer;
use serde::{Deserialize, Serialize};

/// Mean Earth radius, for converting unit-sphere radians to meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Maximum angular distance between two points on the sphere.
pub const MAX_RADIANS_BETWEEN_POINTS: f64 = std::f64::consts::PI;

/// Finest S2 cell level (leaf cells).
pub const MAX_CELL_LEVEL: u8 = 30;

/// How a filter shape constrains the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterMode {
    /// No geometric filter.
    #[default]
    None,
    /// Only documents whose point lies inside the filter shape.
    Contains,
    /// Documents whose geometry may intersect the filter shape. The
    /// iterator only prunes cells here; exact intersection testing is the
    /// caller's responsibility.
    Intersects,
}

/// Output ordering of the near iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Nearest first (non-decreasing distance).
    Ascending,
    /// Farthest first (non-increasing distance).
    Descending,
}

/// Cell-covering parameters.
///
/// `worst_indexed_level` and `best_indexed_level` bound the coverer
/// (coarsest and finest cells it may emit); `max_cells` bounds the size
/// of each covering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveringConfig {
    /// Coarsest level present in the index.
    pub worst_indexed_level: u8,
    /// Finest level present in the index.
    pub best_indexed_level: u8,
    /// Covering cell budget per region.
    pub max_cells: usize,
}

impl Default for CoveringConfig {
    fn default() -> Self {
        Self {
            worst_indexed_level: 4,
            best_indexed_level: 23,
            max_cells: 8,
        }
    }
}

impl CoveringConfig {
    /// Build a region coverer with these bounds.
    pub fn region_coverer(&self) -> RegionCoverer {
        RegionCoverer {
            min_level: self.worst_indexed_level,
            max_level: self.best_indexed_level,
            level_mod: 1,
            max_cells: self.max_cells,
        }
    }
}

/// Immutable configuration of a near query.
///
/// Distances are angular, in radians on the unit sphere; multiply by
/// [`EARTH_RADIUS_METERS`] for meters. The default annulus is the whole
/// sphere (`0` to `π`).
#[derive(Debug, Clone)]
pub struct QueryParams {
    /// Search center.
    pub origin: Coordinate,
    /// Inner annulus bound in radians.
    pub min_rad: f64,
    /// Outer annulus bound in radians.
    pub max_rad: f64,
    /// Must be true; the unsorted scan is a different code path.
    pub sorted: bool,
    /// Result ordering.
    pub order: SortOrder,
    /// Geometric filter mode.
    pub filter_mode: FilterMode,
    /// Filter shape; required when `filter_mode != None`.
    pub filter_shape: Option<ShapeContainer>,
    /// Covering bounds and budget.
    pub cover: CoveringConfig,
}

impl QueryParams {
    pub fn new(origin: Coordinate) -> Self {
        Self {
            origin,
            min_rad: 0.0,
            max_rad: MAX_RADIANS_BETWEEN_POINTS,
            sorted: true,
            order: SortOrder::Ascending,
            filter_mode: FilterMode::None,
            filter_shape: None,
            cover: CoveringConfig::default(),
        }
    }

    /// Set the outer bound from a distance in meters.
    pub fn with_max_distance_meters(mut self, meters: f64) -> Self {
        self.max_rad = (meters / EARTH_RADIUS_METERS).min(MAX_RADIANS_BETWEEN_POINTS);
        self
    }

    /// Set the inner bound from a distance in meters.
    pub fn with_min_distance_meters(mut self, meters: f64) -> Self {
        self.min_rad = (meters / EARTH_RADIUS_METERS).min(MAX_RADIANS_BETWEEN_POINTS);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Attach a filter shape.
    pub fn with_filter(mut self, shape: ShapeContainer, mode: FilterMode) -> Self {
        self.filter_shape = Some(shape);
        self.filter_mode = mode;
        self
    }

    /// Validate the parameter set for use with the near iterator.
    pub fn validate(&self) -> Result<()> {
        if !self.origin.is_valid() {
            return Err(GeoError::bad(format!(
                "invalid origin coordinate ({}, {})",
                self.origin.latitude, self.origin.longitude
            )));
        }
        if !(0.0 <= self.min_rad
            && self.min_rad <= self.max_rad
            && self.max_rad <= MAX_RADIANS_BETWEEN_POINTS)
        {
            return Err(GeoError::bad(format!(
                "invalid distance range [{}, {}]",
                self.min_rad, self.max_rad
            )));
        }
        if !self.sorted {
            return Err(GeoError::bad("near iterator requires sorted = true"));
        }
        if self.filter_mode != FilterMode::None && self.filter_shape.is_none() {
            return Err(GeoError::bad("filter mode set without a filter shape"));
        }
        Ok(())
    }
}
