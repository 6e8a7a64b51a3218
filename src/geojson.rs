//! GeoJSON ingestion.
//!
//! Parses GeoJSON geometry objects (RFC 7946 subset) into
//! [`ShapeContainer`]s, enforcing the loop invariants the spherical types
//! need: rings must close, adjacent duplicates are dropped, loops keep at
//! least three distinct vertices, holes must lie inside the outer ring.
//!
//! Positions are `[longitude, latitude]` arrays. Each pair is normalized
//! (longitude wrapped into `(-180, 180]`, latitude clipped to
//! `[-90, 90]`) before conversion to a unit point. Geometry `type` tags
//! match case-insensitively. `parse_linestring` and the position readers
//! accept either a full geometry object or a bare coordinates array;
//! behavior on the coordinates payload is identical.

use crate::coord::{Coordinate, UnitPoint};
use crate::error::{GeoError, Result};
use crate::loops::SphereLoop;
use crate::shape::{LatLngRect, ShapeContainer, SpherePolygon};
use serde_json::Value;

/// Recognized GeoJSON geometry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoJsonType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

const KINDS: [(&str, GeoJsonType); 7] = [
    ("Point", GeoJsonType::Point),
    ("LineString", GeoJsonType::LineString),
    ("Polygon", GeoJsonType::Polygon),
    ("MultiPoint", GeoJsonType::MultiPoint),
    ("MultiLineString", GeoJsonType::MultiLineString),
    ("MultiPolygon", GeoJsonType::MultiPolygon),
    ("GeometryCollection", GeoJsonType::GeometryCollection),
];

/// The type tag of a GeoJSON object, if recognized (case-insensitive).
pub fn geojson_type(value: &Value) -> Option<GeoJsonType> {
    let tag = value.get("type")?.as_str()?;
    KINDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(tag))
        .map(|(_, kind)| *kind)
}

/// Parse any supported GeoJSON geometry object into a shape.
pub fn parse_region(value: &Value) -> Result<ShapeContainer> {
    if !value.is_object() {
        return Err(GeoError::bad("invalid GeoJSON geometry object"));
    }
    match geojson_type(value) {
        Some(GeoJsonType::Point) => {
            parse_point(value).map(|c| ShapeContainer::Point(c.to_unit_point()))
        }
        Some(GeoJsonType::MultiPoint) => {
            let positions = parse_positions(value)?;
            Ok(ShapeContainer::MultiPoint(
                positions.iter().map(|c| c.to_unit_point()).collect(),
            ))
        }
        Some(GeoJsonType::LineString) => parse_linestring(value).map(ShapeContainer::Polyline),
        Some(GeoJsonType::MultiLineString) => {
            parse_multi_linestring(value).map(ShapeContainer::MultiPolyline)
        }
        Some(GeoJsonType::Polygon) => parse_polygon(value),
        Some(GeoJsonType::MultiPolygon) | Some(GeoJsonType::GeometryCollection) => Err(
            GeoError::NotImplemented("GeoJSON type is not supported".into()),
        ),
        None => Err(GeoError::bad("invalid GeoJSON geometry object")),
    }
}

/// Point: exactly one `[lng, lat]` position.
pub fn parse_point(value: &Value) -> Result<Coordinate> {
    let coordinates = value
        .get("coordinates")
        .ok_or_else(|| GeoError::bad("coordinates missing"))?;
    match coordinates.as_array() {
        Some(arr) if arr.len() == 2 => parse_position(coordinates),
        _ => Err(GeoError::bad("invalid Point coordinates")),
    }
}

/// One `[lng, lat, ...]` position; extra components are ignored.
fn parse_position(value: &Value) -> Result<Coordinate> {
    let arr = value
        .as_array()
        .filter(|a| a.len() >= 2)
        .ok_or_else(|| GeoError::bad(format!("bad coordinate {}", value)))?;
    let lng = arr[0].as_f64();
    let lat = arr[1].as_f64();
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng).normalized()),
        _ => Err(GeoError::bad(format!("bad coordinate {}", value))),
    }
}

/// Positions from a geometry object or a bare array of positions.
fn parse_positions(value: &Value) -> Result<Vec<Coordinate>> {
    let coordinates = if value.is_object() {
        value
            .get("coordinates")
            .ok_or_else(|| GeoError::bad("coordinates missing"))?
    } else {
        value
    };
    let arr = coordinates
        .as_array()
        .ok_or_else(|| GeoError::bad("coordinates missing"))?;
    arr.iter().map(parse_position).collect()
}

/// Keep the first of each run of positions mapping to the same unit
/// point.
fn remove_adjacent_duplicates(positions: &mut Vec<Coordinate>) {
    positions.dedup_by(|a, b| a.to_unit_point() == b.to_unit_point());
}

fn verify_closed_loop(positions: &[Coordinate]) -> Result<()> {
    match (positions.first(), positions.last()) {
        (None, _) => Err(GeoError::bad("empty loop")),
        (Some(first), Some(last)) if first.to_unit_point() != last.to_unit_point() => {
            Err(GeoError::bad("loop not closed"))
        }
        _ => Ok(()),
    }
}

/// LineString: at least two distinct vertices after deduplication.
pub fn parse_linestring(value: &Value) -> Result<Vec<UnitPoint>> {
    let mut positions = parse_positions(value)?;
    remove_adjacent_duplicates(&mut positions);
    let vertices: Vec<_> = positions.iter().map(|c| c.to_unit_point()).collect();
    let degenerate = vertices.len() < 2
        || vertices
            .windows(2)
            .any(|pair| pair[0] == pair[1].neg());
    if degenerate {
        return Err(GeoError::bad(
            "invalid LineString, adjacent vertices must not be identical or antipodal",
        ));
    }
    Ok(vertices)
}

/// MultiLineString: an array of LineString coordinate arrays.
pub fn parse_multi_linestring(value: &Value) -> Result<Vec<Vec<UnitPoint>>> {
    if !value.is_object() {
        return Err(GeoError::bad("invalid MultiLineString"));
    }
    let coordinates = value
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| GeoError::bad("coordinates missing"))?;

    let mut lines = Vec::with_capacity(coordinates.len());
    for linestring in coordinates {
        if !linestring.is_array() {
            return Err(GeoError::bad("invalid MultiLineString"));
        }
        lines.push(parse_linestring(linestring)?);
    }
    Ok(lines)
}

/// Polygon: an array of linear rings, the first being the outer boundary
/// and the rest holes contained in it.
///
/// A single four-vertex ring that is axis-aligned in lat/lng (or a ring
/// collapsing to one distinct point) takes the rectangle fast-path and
/// yields a [`LatLngRect`]. The comparison is exact floating-point
/// equality, so rectangles supplied with rounding noise fall through to
/// the general polygon path.
pub fn parse_polygon(value: &Value) -> Result<ShapeContainer> {
    let coordinates = if value.is_object() {
        value
            .get("coordinates")
            .ok_or_else(|| GeoError::bad("coordinates missing"))?
    } else {
        value
    };
    let rings = coordinates
        .as_array()
        .ok_or_else(|| GeoError::bad("coordinates missing"))?;
    let single_ring = rings.len() == 1;

    let mut loops: Vec<SphereLoop> = Vec::new();
    for ring in rings {
        let mut positions = parse_positions(ring)?;
        verify_closed_loop(&positions)?;
        remove_adjacent_duplicates(&mut positions);

        if single_ring && positions.len() == 1 {
            // ring collapsed to one distinct point
            let v0 = positions[0];
            return Ok(ShapeContainer::Rect(LatLngRect::from_corners(&v0, &v0)));
        }
        if positions.len() < 4 {
            return Err(GeoError::bad(
                "invalid loop in polygon, must have at least 3 distinct vertices",
            ));
        }
        positions.pop(); // drop the redundant closing vertex

        if single_ring && positions.len() == 4 {
            let (v0, v1, v2, v3) = (positions[0], positions[1], positions[2], positions[3]);
            if v0.latitude == v1.latitude
                && v1.longitude == v2.longitude
                && v2.latitude == v3.latitude
                && v3.longitude == v0.longitude
            {
                return Ok(ShapeContainer::Rect(LatLngRect::from_corners(&v0, &v2)));
            }
        }

        let mut sloop = SphereLoop::new(positions.iter().map(|c| c.to_unit_point()).collect())?;
        sloop.normalize();

        if !loops.is_empty() && !loops[0].contains_loop(&sloop) {
            return Err(GeoError::bad("subsequent loop not a hole in polygon"));
        }
        loops.push(sloop);
    }

    if loops.is_empty() {
        return Err(GeoError::bad("empty polygons are not allowed"));
    }
    Ok(ShapeContainer::Polygon(SpherePolygon::new(loops)))
}
