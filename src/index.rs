//! Storage adapter and in-memory cell index.
//!
//! The near iterator is storage-agnostic: it emits [`Interval`]s and
//! consumes `report_found` calls. [`CellScanner`] is the seam a storage
//! engine implements: a range scan over a sorted `(cell_id, doc_id)`
//! keyspace. [`MemoryCellIndex`] is the reference implementation backing
//! tests and benchmarks, and [`near_search`] is the canonical drive loop
//! connecting the two.

use std::collections::BTreeMap;

use s2::cellid::CellID;
use s2::latlng::LatLng;

use crate::coord::Coordinate;
use crate::covering::Interval;
use crate::near::{Document, NearIterator};

/// Map a coordinate to the leaf-level cell it is indexed under.
pub fn index_cell(coord: &Coordinate) -> CellID {
    CellID::from(LatLng::from_degrees(coord.latitude, coord.longitude))
}

/// Range-scan seam over a sorted cell index.
pub trait CellScanner {
    /// All documents whose cell id lies in the closed interval, in
    /// cell-id order.
    fn scan_interval(&self, interval: &Interval) -> Vec<(u64, Coordinate)>;
}

/// In-memory sorted cell index: `(cell_id, doc_id) -> coordinate`.
#[derive(Debug, Default)]
pub struct MemoryCellIndex {
    entries: BTreeMap<(u64, u64), Coordinate>,
}

impl MemoryCellIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a document's point under its leaf cell.
    pub fn insert(&mut self, doc_id: u64, coord: Coordinate) {
        self.entries.insert((index_cell(&coord).0, doc_id), coord);
    }

    pub fn remove(&mut self, doc_id: u64, coord: &Coordinate) {
        self.entries.remove(&(index_cell(coord).0, doc_id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CellScanner for MemoryCellIndex {
    fn scan_interval(&self, interval: &Interval) -> Vec<(u64, Coordinate)> {
        self.entries
            .range((interval.min.0, 0)..=(interval.max.0, u64::MAX))
            .map(|(&(_, doc_id), &coord)| (doc_id, coord))
            .collect()
    }
}

/// Drive a near iterator against a storage adapter until `limit` results
/// are emitted or the search space is exhausted.
pub fn near_search<S: CellScanner + ?Sized>(
    scanner: &S,
    near: &mut NearIterator,
    limit: usize,
) -> Vec<Document> {
    let mut result = Vec::new();
    while !near.is_done() {
        for interval in near.intervals() {
            for (doc_id, coord) in scanner.scan_interval(&interval) {
                near.report_found(doc_id, &coord);
            }
        }
        while near.has_nearest() {
            if let Some(doc) = near.pop_nearest() {
                result.push(doc);
            }
            if result.len() >= limit {
                return result;
            }
        }
    }
    result
}
