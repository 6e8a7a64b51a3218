//! Cell coverings, scan intervals, and the scanned-cell set.
//!
//! The near iterator turns each search ring into a cell covering, then
//! into closed `[min, max]` cell-id intervals suitable for range scans on
//! a sorted index. S2 cell ids are Hilbert-curve ordered, so nearby cells
//! produce nearby id ranges and coverings merge into few intervals.
//!
//! The scanned-cell set tracks which cells earlier rings already covered,
//! as a normalized set of disjoint leaf-id ranges. Subtracting it from a
//! new covering keeps every ring's scan disjoint from its predecessors.

use crate::config::{CoveringConfig, MAX_CELL_LEVEL};
use s2::cap::Cap;
use s2::cell::Cell;
use s2::cellid::CellID;
use s2::point::Point;
use s2::rect::Rect;
use s2::region::Region;
use s2::s1::angle::Angle;
use s2::s1::Rad;

/// Derivative of the S2 maximum-diagonal metric (dimension 1).
const MAX_DIAG_DERIV: f64 = 2.438654594434021;

/// Derivative of the S2 average-diagonal metric (dimension 1).
const AVG_DIAG_DERIV: f64 = 2.060422738998471;

/// Maximum diagonal (radians) of a cell at `level`.
pub(crate) fn max_diag_value(level: u8) -> f64 {
    MAX_DIAG_DERIV * 2.0_f64.powi(-(level as i32))
}

/// Average diagonal (radians) of a cell at `level`.
pub(crate) fn avg_diag_value(level: u8) -> f64 {
    AVG_DIAG_DERIV * 2.0_f64.powi(-(level as i32))
}

/// Level whose maximum diagonal is closest to the given arc length.
pub(crate) fn max_diag_closest_level(radians: f64) -> u8 {
    let v = std::f64::consts::SQRT_2 * radians;
    if v <= 0.0 {
        return MAX_CELL_LEVEL;
    }
    let level = (MAX_DIAG_DERIV / v).log2().ceil() as i64;
    level.clamp(0, MAX_CELL_LEVEL as i64) as u8
}

/// A closed range `[min, max]` of cell ids for one index range scan.
///
/// Endpoints are leaf-level ids; every id between them (in cell-id order)
/// lies under the covering cells the interval was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub min: CellID,
    pub max: CellID,
}

/// Cover a spherical cap around `center` with cells.
pub fn cover_cap(center: &Point, radius_rad: f64, config: &CoveringConfig) -> Vec<CellID> {
    let angle = Angle::from(Rad(radius_rad));
    let cap = Cap::from_center_angle(center, &angle);
    config.region_coverer().covering(&cap).0
}

/// Cover an annulus (outer cap minus inner cap) around `center`.
pub fn cover_annulus(
    center: &Point,
    inner_rad: f64,
    outer_rad: f64,
    config: &CoveringConfig,
) -> Vec<CellID> {
    let ring = Annulus::new(center, inner_rad, outer_rad);
    config.region_coverer().covering(&ring).0
}

/// Difference of two concentric caps, as a coverable region.
struct Annulus {
    inner: Cap,
    outer: Cap,
}

impl Annulus {
    fn new(center: &Point, inner_rad: f64, outer_rad: f64) -> Self {
        Self {
            inner: Cap::from_center_angle(center, &Angle::from(Rad(inner_rad))),
            outer: Cap::from_center_angle(center, &Angle::from(Rad(outer_rad))),
        }
    }
}

impl Region for Annulus {
    fn cap_bound(&self) -> Cap {
        self.outer.clone()
    }

    fn rect_bound(&self) -> Rect {
        self.outer.rect_bound()
    }

    fn contains_cell(&self, cell: &Cell) -> bool {
        self.outer.contains_cell(cell) && !self.inner.intersects_cell(cell)
    }

    fn intersects_cell(&self, cell: &Cell) -> bool {
        self.outer.intersects_cell(cell) && !self.inner.contains_cell(cell)
    }
}

/// Expand covering cells into sorted, disjoint scan intervals.
///
/// Each cell becomes the closed range of its leaf-level descendants
/// (equivalently, of its descendants at `worst_indexed_level` for cells
/// coarser than that; the coverer never emits such cells). Ranges whose
/// successor ids touch are merged, so disjoint input cells produce
/// disjoint intervals.
pub fn scan_intervals(worst_indexed_level: u8, cells: &[CellID]) -> Vec<Interval> {
    debug_assert!(worst_indexed_level > 0);
    if cells.is_empty() {
        return Vec::new();
    }

    let mut ranges: Vec<(CellID, CellID)> = cells
        .iter()
        .map(|&c| (c.range_min(), c.range_max()))
        .collect();

    ranges.sort_by_key(|r| (r.0).0);

    let mut intervals = Vec::with_capacity(ranges.len());
    let mut current = ranges[0];

    for range in ranges.into_iter().skip(1) {
        if (range.0).0 <= current.1.next().0 {
            // overlapping or adjacent along the curve
            if (range.1).0 > (current.1).0 {
                current.1 = range.1;
            }
        } else {
            intervals.push(Interval {
                min: current.0,
                max: current.1,
            });
            current = range;
        }
    }
    intervals.push(Interval {
        min: current.0,
        max: current.1,
    });

    intervals
}

/// A normalized set of cells, stored as disjoint leaf-id ranges.
///
/// Serves as the iterator's already-scanned cell union: supports adding a
/// covering and subtracting itself from the next covering. Adjacent leaf
/// ids differ by two, so ranges whose endpoints are two apart merge.
#[derive(Debug, Default)]
pub struct CellRangeSet {
    /// Sorted, disjoint, non-adjacent closed ranges of leaf ids.
    ranges: Vec<(u64, u64)>,
}

impl CellRangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Add the leaf ranges of the given cells.
    pub fn add_cells(&mut self, cells: &[CellID]) {
        if cells.is_empty() {
            return;
        }
        self.ranges
            .extend(cells.iter().map(|c| (c.range_min().0, c.range_max().0)));
        self.normalize();
    }

    fn normalize(&mut self) {
        self.ranges.sort_by_key(|r| r.0);
        let mut merged: Vec<(u64, u64)> = Vec::with_capacity(self.ranges.len());
        for &(min, max) in self.ranges.iter() {
            match merged.last_mut() {
                Some(last) if min <= last.1 + 2 => {
                    last.1 = last.1.max(max);
                }
                _ => merged.push((min, max)),
            }
        }
        self.ranges = merged;
    }

    /// True if any leaf id in `[min, max]` is in the set.
    fn intersects(&self, min: u64, max: u64) -> bool {
        let idx = self.ranges.partition_point(|r| r.1 < min);
        idx < self.ranges.len() && self.ranges[idx].0 <= max
    }

    /// True if every leaf id in `[min, max]` is in the set.
    fn covers(&self, min: u64, max: u64) -> bool {
        let idx = self.ranges.partition_point(|r| r.1 < min);
        idx < self.ranges.len() && self.ranges[idx].0 <= min && max <= self.ranges[idx].1
    }

    /// Subtract this set from a covering, returning the cells (possibly
    /// subdivided) that remain uncovered.
    pub fn difference(&self, cells: &[CellID]) -> Vec<CellID> {
        let mut out = Vec::new();
        for &cell in cells {
            self.difference_into(cell, &mut out);
        }
        out
    }

    fn difference_into(&self, cell: CellID, out: &mut Vec<CellID>) {
        let min = cell.range_min().0;
        let max = cell.range_max().0;
        if !self.intersects(min, max) {
            out.push(cell);
            return;
        }
        if self.covers(min, max) {
            return;
        }
        if cell.level() >= MAX_CELL_LEVEL as u64 {
            // a partially-covered leaf is already in the set
            return;
        }
        let mut child = cell.child_begin_at_level(cell.level() + 1);
        for _ in 0..4 {
            self.difference_into(child, out);
            child = child.next();
        }
    }
}
