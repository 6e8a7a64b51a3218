//! End-to-end near-query scenarios over a global grid of integer
//! lat/lng points, driven through the in-memory cell index.

use geonear::{
    near_search, parse_region, Coordinate, FilterMode, MemoryCellIndex, NearIterator, QueryParams,
    ShapeContainer, SortOrder,
};
use serde_json::json;

/// One document per integer lat/lng pair across the whole globe.
fn build_grid() -> (MemoryCellIndex, Vec<Coordinate>) {
    let mut index = MemoryCellIndex::new();
    let mut coords = Vec::new();
    for lat in -90..=90 {
        for lng in -180..=180 {
            let c = Coordinate::new(lat as f64, lng as f64);
            index.insert(coords.len() as u64, c);
            coords.push(c);
        }
    }
    assert_eq!(coords.len(), 65_341);
    (index, coords)
}

/// Resolve result ids to coordinates, sorted by (lat, lng).
fn sorted_coords(docs: &[geonear::Document], coords: &[Coordinate]) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = docs
        .iter()
        .map(|d| {
            let c = coords[d.doc_id as usize];
            (c.latitude, c.longitude)
        })
        .collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap());
    out
}

#[test]
fn query_all_sorted_ascending() {
    let (index, coords) = build_grid();
    let params = QueryParams::new(Coordinate::new(0.0, 0.0));
    let mut near = NearIterator::new(params, false).unwrap();

    let result = near_search(&index, &mut near, usize::MAX);
    assert_eq!(result.len(), coords.len());

    let mut unique = std::collections::HashSet::new();
    let mut last_rad: f64 = 0.0;
    for doc in &result {
        assert!(unique.insert(doc.doc_id), "document emitted twice");
        assert!(doc.dist_rad >= last_rad, "ascending order violated");
        last_rad = doc.dist_rad;
    }
    assert!(last_rad > 0.0);
}

#[test]
fn query_ascending_with_limit() {
    let (index, coords) = build_grid();
    let params = QueryParams::new(Coordinate::new(0.0, 0.0));
    let mut near = NearIterator::new(params, false).unwrap();

    let result = near_search(&index, &mut near, 5);
    assert_eq!(result.len(), 5);

    let got = sorted_coords(&result, &coords);
    assert_eq!(
        got,
        vec![(-1.0, 0.0), (0.0, -1.0), (0.0, 0.0), (0.0, 1.0), (1.0, 0.0)]
    );
}

#[test]
fn query_ascending_with_max_distance() {
    let (index, coords) = build_grid();
    // ~111.2km: the four 1-degree neighbors sit just inside
    let params =
        QueryParams::new(Coordinate::new(0.0, 0.0)).with_max_distance_meters(111_200.0);
    let mut near = NearIterator::new(params, false).unwrap();

    let result = near_search(&index, &mut near, 1000);
    assert_eq!(result.len(), 5);

    let got = sorted_coords(&result, &coords);
    assert_eq!(
        got,
        vec![(-1.0, 0.0), (0.0, -1.0), (0.0, 0.0), (0.0, 1.0), (1.0, 0.0)]
    );
}

#[test]
fn query_ascending_with_density_estimate() {
    let (index, coords) = build_grid();
    let params =
        QueryParams::new(Coordinate::new(0.0, 0.0)).with_max_distance_meters(111_200.0);
    let mut near = NearIterator::new(params, false).unwrap();

    // seeding the ring width must not change the result set
    near.estimate_density(&Coordinate::new(0.0, 1.0));

    let result = near_search(&index, &mut near, 1000);
    assert_eq!(result.len(), 5);
    let got = sorted_coords(&result, &coords);
    assert_eq!(
        got,
        vec![(-1.0, 0.0), (0.0, -1.0), (0.0, 0.0), (0.0, 1.0), (1.0, 0.0)]
    );
}

#[test]
fn query_all_sorted_descending() {
    let (index, coords) = build_grid();
    let params =
        QueryParams::new(Coordinate::new(0.0, 0.0)).with_order(SortOrder::Descending);
    let mut near = NearIterator::new(params, false).unwrap();

    let result = near_search(&index, &mut near, usize::MAX);
    assert_eq!(result.len(), coords.len());

    let mut unique = std::collections::HashSet::new();
    let mut last_rad = std::f64::consts::PI;
    for doc in &result {
        assert!(unique.insert(doc.doc_id), "document emitted twice");
        assert!(doc.dist_rad <= last_rad, "descending order violated");
        last_rad = doc.dist_rad;
    }
    assert_eq!(last_rad, 0.0, "closest grid point is the origin itself");
}

#[test]
fn query_descending_with_limit() {
    let (index, coords) = build_grid();
    let params =
        QueryParams::new(Coordinate::new(0.0, 0.0)).with_order(SortOrder::Descending);
    let mut near = NearIterator::new(params, false).unwrap();

    let result = near_search(&index, &mut near, 5);
    assert_eq!(result.len(), 5);

    // the two antipodal entries (0, 180) and (0, -180) come first
    for doc in &result[..2] {
        let c = coords[doc.doc_id as usize];
        assert_eq!(c.latitude, 0.0);
        assert_eq!(c.longitude.abs(), 180.0);
    }
}

#[test]
fn query_descending_with_max_distance() {
    let (index, coords) = build_grid();
    let params = QueryParams::new(Coordinate::new(0.0, 0.0))
        .with_order(SortOrder::Descending)
        .with_max_distance_meters(111_200.0);
    let mut near = NearIterator::new(params, false).unwrap();

    let result = near_search(&index, &mut near, 1000);
    assert_eq!(result.len(), 5);

    // farthest first; the origin itself comes last
    let last = coords[result[4].doc_id as usize];
    assert_eq!((last.latitude, last.longitude), (0.0, 0.0));
    for doc in &result[..4] {
        let c = coords[doc.doc_id as usize];
        assert_eq!(c.latitude.abs() + c.longitude.abs(), 1.0);
    }
}

#[test]
fn query_with_polygon_contains_filter() {
    let (index, coords) = build_grid();

    let polygon = json!({
        "type": "Polygon",
        "coordinates": [[[-11.5, 23.5], [-6.0, 26.0], [-10.5, 26.1], [-11.5, 23.5]]]
    });
    let shape = parse_region(&polygon).unwrap();
    assert!(matches!(shape, ShapeContainer::Polygon(_)));

    let params = QueryParams::new(Coordinate::new(0.0, 0.0))
        .with_filter(shape, FilterMode::Contains);
    let mut near = NearIterator::new(params, false).unwrap();

    let result = near_search(&index, &mut near, usize::MAX);
    let got = sorted_coords(&result, &coords);
    assert_eq!(
        got,
        vec![
            (24.0, -11.0),
            (25.0, -10.0),
            (25.0, -9.0),
            (26.0, -10.0),
            (26.0, -9.0),
            (26.0, -8.0),
            (26.0, -7.0),
        ]
    );
}

#[test]
fn rectangle_fast_path_parses_to_rect() {
    let polygon = json!({
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
    });
    match parse_region(&polygon).unwrap() {
        ShapeContainer::Rect(rect) => {
            assert_eq!((rect.lat_lo, rect.lng_lo), (0.0, 0.0));
            assert_eq!((rect.lat_hi, rect.lng_hi), (1.0, 1.0));
        }
        other => panic!("expected rectangle fast-path, got {:?}", other),
    }
}

#[test]
fn reset_then_replay_gives_same_sequence() {
    let (index, _) = build_grid();
    let params = QueryParams::new(Coordinate::new(-83.2, 19.2));
    let mut near = NearIterator::new(params, false).unwrap();

    let first: Vec<u64> = near_search(&index, &mut near, 50)
        .iter()
        .map(|d| d.doc_id)
        .collect();
    near.reset();
    let second: Vec<u64> = near_search(&index, &mut near, 50)
        .iter()
        .map(|d| d.doc_id)
        .collect();

    assert_eq!(first.len(), 50);
    assert_eq!(first, second);
}

#[test]
fn ascending_order_holds_for_offset_origin() {
    let (index, coords) = build_grid();
    let params = QueryParams::new(Coordinate::new(-83.2, 19.2));
    let mut near = NearIterator::new(params, false).unwrap();

    let result = near_search(&index, &mut near, 120);
    assert_eq!(result.len(), 120);

    let origin = Coordinate::new(-83.2, 19.2).to_unit_point();
    let mut last_rad: f64 = 0.0;
    for doc in &result {
        let rad = origin.angle(&coords[doc.doc_id as usize].to_unit_point());
        assert!((rad - doc.dist_rad).abs() < 1e-12);
        assert!(rad >= last_rad);
        last_rad = rad;
    }
    assert!(last_rad > 0.0);
}

#[test]
fn deduplication_survives_duplicate_reports() {
    // Drive the iterator by hand and report each document twice; with
    // deduplication enabled every id must still be emitted exactly once.
    let mut index = MemoryCellIndex::new();
    let mut coords = Vec::new();
    for lng in 0..10 {
        let c = Coordinate::new(0.0, lng as f64 / 10.0);
        index.insert(coords.len() as u64, c);
        coords.push(c);
    }

    let params = QueryParams::new(Coordinate::new(0.0, 0.0));
    let mut near = NearIterator::new(params, true).unwrap();

    let mut result = Vec::new();
    while !near.is_done() {
        for interval in near.intervals() {
            use geonear::CellScanner;
            for (doc_id, coord) in index.scan_interval(&interval) {
                near.report_found(doc_id, &coord);
                near.report_found(doc_id, &coord);
            }
        }
        while near.has_nearest() {
            result.push(near.pop_nearest().unwrap());
        }
    }

    assert_eq!(result.len(), coords.len());
    let unique: std::collections::HashSet<u64> = result.iter().map(|d| d.doc_id).collect();
    assert_eq!(unique.len(), coords.len());
}
