//! The adaptive annular near iterator.
//!
//! Yields documents in order of angular distance from a query origin by
//! sweeping a spherical annulus outward (ascending) or inward
//! (descending) across `[min_rad, max_rad]`:
//!
//! ```text
//!  intervals()  ──► ring advance ──► covering ──► minus scanned ──► Intervals
//!                                                                      │
//!  caller range-scans the sorted index over each interval              ▼
//!  report_found(id, coord) ──► reject / dedup / filter ──► priority buffer
//!                                                                      │
//!  has_nearest() releases the top only once the ring frontier          ▼
//!  has moved past its distance ──► nearest() / pop_nearest()       Documents
//! ```
//!
//! Correctness never depends on the ring width: a document can only be
//! emitted once the frontier guarantees nothing closer (respectively
//! farther) can still be found. The width heuristic only affects how many
//! index scans the sweep needs.

use std::collections::BinaryHeap;

use rustc_hash::FxHashSet;
use s2::point::Point;
use tracing::{debug, trace};

use crate::config::{
    FilterMode, QueryParams, SortOrder, EARTH_RADIUS_METERS, MAX_CELL_LEVEL,
};
use crate::coord::{Coordinate, UnitPoint};
use crate::covering::{self, CellRangeSet, Interval};
use crate::error::Result;

/// One result of a near query: a document id and its angular distance
/// from the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Document {
    pub doc_id: u64,
    pub dist_rad: f64,
}

/// Buffer entry with a pre-signed heap key, so the std max-heap pops the
/// next emittable document for either sort order.
struct HeapDoc {
    key: f64,
    doc: Document,
}

impl PartialEq for HeapDoc {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for HeapDoc {}

impl PartialOrd for HeapDoc {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapDoc {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key
            .partial_cmp(&other.key)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Expanding/contracting annulus scanner over a sorted cell index.
///
/// Construct with [`NearIterator::new`], then alternate
/// [`intervals`](Self::intervals) (and index scans feeding
/// [`report_found`](Self::report_found)) with draining via
/// [`has_nearest`](Self::has_nearest) / [`pop_nearest`](Self::pop_nearest)
/// until [`is_done`](Self::is_done).
pub struct NearIterator {
    params: QueryParams,

    /// Origin as a unit point, for distance computation.
    origin: UnitPoint,
    /// Origin as an s2 point, for cap coverings.
    origin_s2: Point,

    /// Annulus bounds in radians.
    min_bound: f64,
    max_bound: f64,

    /// Current ring width.
    bound_delta: f64,
    /// Inner edge of the current ring.
    inner_bound: f64,
    /// Outer edge of the current ring.
    outer_bound: f64,

    /// Distinct documents reported against the last interval batch.
    stats_found_last_interval: usize,

    /// Buffered results, best-first for the configured order.
    buffer: BinaryHeap<HeapDoc>,

    /// Document ids already reported.
    seen: FxHashSet<u64>,
    /// When false, the seen-set is bypassed (callers that guarantee
    /// unique reports).
    deduplicate: bool,

    /// Cells handed out by earlier interval batches.
    scanned: CellRangeSet,
}

impl NearIterator {
    /// Build an iterator over the given parameters. Fails if the
    /// parameters do not validate (`sorted` must be true, bounds must be
    /// an annulus, origin must be a real coordinate).
    pub fn new(params: QueryParams, deduplicate: bool) -> Result<Self> {
        params.validate()?;
        let origin = params.origin.to_unit_point();
        let origin_s2 = params.origin.to_s2_point();
        let mut near = Self {
            min_bound: params.min_rad,
            max_bound: params.max_rad,
            params,
            origin,
            origin_s2,
            bound_delta: 0.0,
            inner_bound: 0.0,
            outer_bound: 0.0,
            stats_found_last_interval: 0,
            buffer: BinaryHeap::new(),
            seen: FxHashSet::default(),
            deduplicate,
            scanned: CellRangeSet::new(),
        };
        near.reset();
        Ok(near)
    }

    /// The query origin on the unit sphere.
    pub fn origin(&self) -> &UnitPoint {
        &self.origin
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.params.filter_mode
    }

    fn is_ascending(&self) -> bool {
        self.params.order == SortOrder::Ascending
    }

    /// Return to the initial state: buffer, seen-set, scanned cells and
    /// bounds are cleared; an already-adapted ring width is retained.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.buffer.clear();
        self.scanned.clear();

        if self.bound_delta <= 0.0 {
            let level = (self.params.cover.best_indexed_level as i32 - 2).max(1);
            // never start below ~500m of arc
            let floor = covering::max_diag_closest_level(500.0 / EARTH_RADIUS_METERS);
            let level = level.min(floor as i32) as u8;
            self.bound_delta = covering::max_diag_value(level);
        }
        debug_assert!(self.bound_delta > 0.0);

        let near_end = if self.is_ascending() {
            self.min_bound
        } else {
            self.max_bound
        };
        self.inner_bound = near_end;
        self.outer_bound = near_end;
        self.stats_found_last_interval = 0;
    }

    /// All intervals are covered and no buffered results remain.
    pub fn is_done(&self) -> bool {
        debug_assert!(self.min_bound <= self.inner_bound);
        debug_assert!(self.inner_bound <= self.outer_bound);
        debug_assert!(self.outer_bound <= self.max_bound);
        self.buffer.is_empty() && self.all_intervals_covered()
    }

    fn all_intervals_covered(&self) -> bool {
        if self.is_ascending() {
            self.inner_bound == self.max_bound && self.outer_bound == self.max_bound
        } else {
            self.inner_bound == self.min_bound && self.outer_bound == self.min_bound
        }
    }

    /// Whether the buffer top is safe to emit: its distance must lie
    /// behind the ring frontier, otherwise a closer (resp. farther)
    /// document could still appear in an unscanned cell.
    pub fn has_nearest(&self) -> bool {
        if self.all_intervals_covered() {
            return !self.buffer.is_empty();
        }
        match self.buffer.peek() {
            None => false,
            Some(top) => {
                if self.is_ascending() {
                    top.doc.dist_rad <= self.inner_bound
                } else {
                    top.doc.dist_rad >= self.outer_bound
                }
            }
        }
    }

    /// Peek the best buffered document. Meaningful only after
    /// [`has_nearest`](Self::has_nearest) returned true.
    pub fn nearest(&self) -> Option<Document> {
        self.buffer.peek().map(|h| h.doc)
    }

    /// Remove and return the best buffered document.
    pub fn pop_nearest(&mut self) -> Option<Document> {
        self.buffer.pop().map(|h| h.doc)
    }

    /// Advance the ring and return the cell intervals the caller must now
    /// scan. Empty once the ring has exhausted `[min_rad, max_rad]`.
    pub fn intervals(&mut self) -> Vec<Interval> {
        if self.all_intervals_covered() {
            return Vec::new();
        }
        self.estimate_delta();

        if self.is_ascending() {
            self.inner_bound = self.outer_bound;
            self.outer_bound = (self.outer_bound + self.bound_delta).min(self.max_bound);
            if self.inner_bound == self.max_bound && self.outer_bound == self.max_bound {
                return Vec::new();
            }
        } else {
            self.outer_bound = self.inner_bound;
            self.inner_bound = (self.inner_bound - self.bound_delta).max(self.min_bound);
            if self.outer_bound == self.min_bound && self.inner_bound == self.min_bound {
                return Vec::new();
            }
        }
        debug_assert!(self.inner_bound < self.outer_bound);

        trace!(
            inner_m = (self.inner_bound * EARTH_RADIUS_METERS) as u64,
            outer_m = (self.outer_bound * EARTH_RADIUS_METERS) as u64,
            delta_m = (self.bound_delta * EARTH_RADIUS_METERS) as u64,
            "advancing search ring"
        );

        let mut cover = if self.inner_bound == self.min_bound {
            covering::cover_cap(&self.origin_s2, self.outer_bound, &self.params.cover)
        } else {
            covering::cover_annulus(
                &self.origin_s2,
                self.inner_bound,
                self.outer_bound,
                &self.params.cover,
            )
        };

        if !self.scanned.is_empty() {
            let mut remaining = self.scanned.difference(&cover);
            if self.params.filter_mode != FilterMode::None {
                if let Some(shape) = &self.params.filter_shape {
                    remaining.retain(|c| shape.may_intersect(*c));
                }
            }
            cover = remaining;
        }

        if cover.is_empty() {
            return Vec::new();
        }
        let intervals = covering::scan_intervals(self.params.cover.worst_indexed_level, &cover);
        self.scanned.add_cells(&cover);
        intervals
    }

    /// Report a candidate document at `center`. Applies cheap distance
    /// rejection, deduplication and the containment filter, then buffers
    /// the document for ordered emission.
    pub fn report_found(&mut self, doc_id: u64, center: &Coordinate) {
        let rad = self.origin.angle(&center.to_unit_point());

        // cheap rejection on distance; intersect queries keep everything
        // the cell scan produced
        if self.params.filter_mode != FilterMode::Intersects {
            let early = if self.is_ascending() {
                rad < self.inner_bound
            } else {
                rad > self.outer_bound
            };
            if early || rad < self.min_bound || rad > self.max_bound {
                return;
            }
        }

        if self.deduplicate && !self.seen.insert(doc_id) {
            return;
        }
        self.stats_found_last_interval += 1;

        // possibly expensive point rejection, but saves materializing the
        // document
        if self.params.filter_mode == FilterMode::Contains {
            if let Some(shape) = &self.params.filter_shape {
                if !shape.contains(center) {
                    return;
                }
            }
        }

        let key = if self.is_ascending() { -rad } else { rad };
        self.buffer.push(HeapDoc {
            key,
            doc: Document { doc_id, dist_rad: rad },
        });
    }

    /// One-shot density hint: seed the ring width from a known-nearby
    /// document, before the first `intervals` call. Performance only;
    /// emission order does not depend on it.
    pub fn estimate_density(&mut self, sample: &Coordinate) {
        let min_delta = covering::avg_diag_value(MAX_CELL_LEVEL - 3);
        let delta = self.origin.angle(&sample.to_unit_point()) * 4.0;
        if min_delta < delta && delta < std::f64::consts::PI {
            self.bound_delta = delta;
            debug!(
                delta_m = (self.bound_delta * EARTH_RADIUS_METERS) as u64,
                "estimated search density"
            );
        }
    }

    /// Adapt the ring width to the density observed in the last ring:
    /// grow fast through empty space, shrink when an interval floods the
    /// buffer.
    fn estimate_delta(&mut self) {
        let advanced = if self.is_ascending() {
            self.inner_bound > self.min_bound
        } else {
            self.inner_bound < self.max_bound
        };
        if !advanced {
            return;
        }

        let min_delta = covering::max_diag_value(MAX_CELL_LEVEL - 3);
        if self.stats_found_last_interval < 256 {
            self.bound_delta *= if self.stats_found_last_interval == 0 {
                4.0
            } else {
                2.0
            };
        } else if self.stats_found_last_interval > 1024 && self.bound_delta > min_delta {
            self.bound_delta /= 2.0;
        }
        self.bound_delta = self.bound_delta.max(min_delta);
        self.stats_found_last_interval = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoveringConfig;

    fn params(origin: Coordinate) -> QueryParams {
        QueryParams::new(origin)
    }

    #[test]
    fn test_requires_sorted() {
        let mut p = params(Coordinate::new(0.0, 0.0));
        p.sorted = false;
        assert!(NearIterator::new(p, true).is_err());
    }

    #[test]
    fn test_initial_state() {
        let near = NearIterator::new(params(Coordinate::new(0.0, 0.0)), true).unwrap();
        assert!(!near.is_done());
        assert!(!near.has_nearest());
        assert_eq!(near.nearest(), None);
    }

    #[test]
    fn test_degenerate_annulus_is_done() {
        let mut p = params(Coordinate::new(0.0, 0.0));
        p.min_rad = 0.25;
        p.max_rad = 0.25;
        let near = NearIterator::new(p, true).unwrap();
        assert!(near.is_done());
    }

    #[test]
    fn test_report_and_gate() {
        let mut near = NearIterator::new(params(Coordinate::new(0.0, 0.0)), true).unwrap();
        let intervals = near.intervals();
        assert!(!intervals.is_empty());

        // roughly 0.6 degrees away, far beyond the initial ~500m ring
        near.report_found(1, &Coordinate::new(0.6, 0.0));
        // buffered but not yet emittable: the frontier has not passed it
        assert!(!near.has_nearest());
        assert!(!near.is_done());

        // advance rings until the frontier passes the document
        let mut guard = 0;
        while !near.has_nearest() {
            near.intervals();
            guard += 1;
            assert!(guard < 64, "frontier never passed the buffered document");
        }
        let doc = near.pop_nearest().unwrap();
        assert_eq!(doc.doc_id, 1);
        assert!((doc.dist_rad - 0.6_f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_deduplication() {
        let mut near = NearIterator::new(params(Coordinate::new(0.0, 0.0)), true).unwrap();
        near.intervals();
        let c = Coordinate::new(0.1, 0.1);
        near.report_found(7, &c);
        near.report_found(7, &c);
        near.report_found(7, &c);

        // drain the whole ring
        while !near.all_intervals_covered() {
            near.intervals();
        }
        assert!(near.has_nearest());
        assert_eq!(near.pop_nearest().unwrap().doc_id, 7);
        assert!(near.is_done());
    }

    #[test]
    fn test_dedup_disabled_buffers_duplicates() {
        let mut near = NearIterator::new(params(Coordinate::new(0.0, 0.0)), false).unwrap();
        near.intervals();
        let c = Coordinate::new(0.1, 0.1);
        near.report_found(7, &c);
        near.report_found(7, &c);
        while !near.all_intervals_covered() {
            near.intervals();
        }
        assert_eq!(near.pop_nearest().unwrap().doc_id, 7);
        assert_eq!(near.pop_nearest().unwrap().doc_id, 7);
    }

    #[test]
    fn test_out_of_annulus_rejected() {
        let mut p = params(Coordinate::new(0.0, 0.0));
        p.min_rad = 0.1;
        p.max_rad = 0.2;
        let mut near = NearIterator::new(p, true).unwrap();
        near.intervals();

        near.report_found(1, &Coordinate::new(0.0, 0.01)); // too close
        near.report_found(2, &Coordinate::new(0.0, 60.0)); // too far
        while !near.all_intervals_covered() {
            near.intervals();
        }
        assert!(near.is_done());
    }

    #[test]
    fn test_no_emission_after_done() {
        let mut p = params(Coordinate::new(0.0, 0.0));
        p.max_rad = 0.05;
        let mut near = NearIterator::new(p, true).unwrap();
        loop {
            near.intervals();
            if near.all_intervals_covered() {
                break;
            }
        }
        assert!(near.is_done());
        // late reports must not resurrect the iterator
        near.report_found(9, &Coordinate::new(0.0, 0.01));
        assert!(near.is_done() || near.has_nearest());
        // the cheap rejection drops it: inner bound reached max_rad
        assert!(near.nearest().is_none());
    }

    #[test]
    fn test_delta_retained_across_reset() {
        let mut near = NearIterator::new(params(Coordinate::new(0.0, 0.0)), true).unwrap();
        near.estimate_density(&Coordinate::new(0.0, 1.0));
        let seeded = near.bound_delta;
        assert!(seeded > 0.0);
        near.reset();
        assert_eq!(near.bound_delta, seeded);
    }

    #[test]
    fn test_intervals_shrink_with_custom_levels() {
        let mut p = params(Coordinate::new(45.0, 9.0));
        p.cover = CoveringConfig {
            worst_indexed_level: 6,
            best_indexed_level: 20,
            max_cells: 20,
        };
        let mut near = NearIterator::new(p, true).unwrap();
        let intervals = near.intervals();
        assert!(!intervals.is_empty());
        for iv in &intervals {
            assert!(iv.min.0 <= iv.max.0);
        }
        // successive batches never hand out overlapping ranges
        let second = near.intervals();
        for a in &intervals {
            for b in &second {
                assert!(b.max.0 < a.min.0 || b.min.0 > a.max.0);
            }
        }
    }
}
