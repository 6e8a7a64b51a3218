//! Shape container: tagged union of spherical primitives.
//!
//! Shapes answer two questions for the near iterator:
//! - `contains(coordinate)`: exact point membership (boundary counts as
//!   inside; point shapes only match exact equality), used by the
//!   `Contains` filter mode.
//! - `may_intersect(cell)`: a conservative cell pre-filter used to drop
//!   covering cells. False positives are allowed, false negatives are
//!   not.
//!
//! The pre-filter works on bounding caps: every shape is enclosed in a
//! cap (or the full sphere when no useful cap exists), and a cell whose
//! own bounding cap is disjoint from it cannot intersect the shape.

use crate::coord::{Coordinate, UnitPoint};
use crate::loops::SphereLoop;
use s2::cell::Cell;
use s2::cellid::CellID;
use s2::latlng::LatLng;

/// Padding added to computed bounding-cap radii, absorbing conversion
/// round-off so the pre-filter stays conservative.
const BOUND_PAD: f64 = 1e-9;

/// Tolerance for the on-edge polyline test.
const ON_EDGE_EPS: f64 = 1e-12;

fn s2_point_to_unit(p: s2::point::Point) -> UnitPoint {
    let ll = LatLng::from(p);
    Coordinate::new(ll.lat.deg(), ll.lng.deg()).to_unit_point()
}

/// Bounding cap of a cell: its center plus the largest vertex distance.
/// Cell edges are geodesics between vertices, so the cap covers the
/// whole cell.
fn cell_cap(id: CellID) -> (UnitPoint, f64) {
    let cell = Cell::from(id);
    let center = s2_point_to_unit(cell.center());
    let mut radius: f64 = 0.0;
    for k in 0..4 {
        radius = radius.max(center.angle(&s2_point_to_unit(cell.vertex(k))));
    }
    (center, radius + BOUND_PAD)
}

/// Conservative spherical bound of a shape.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ShapeBound {
    /// No useful bound; everything may intersect.
    Full,
    /// All of the shape lies within `radius` of `axis`.
    Cap { axis: UnitPoint, radius: f64 },
}

impl ShapeBound {
    /// Cap around the vertex centroid. Valid for point sets and geodesic
    /// edge chains: a cap of radius at most `π/2` is convex, so edges
    /// between contained vertices stay inside. Degenerate centroids and
    /// larger radii fall back to `Full`.
    fn from_vertices<'a>(points: impl Iterator<Item = &'a UnitPoint>) -> ShapeBound {
        let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
        let mut vertices: Vec<&UnitPoint> = Vec::new();
        for p in points {
            x += p.x;
            y += p.y;
            z += p.z;
            vertices.push(p);
        }
        let axis = UnitPoint::new(x, y, z);
        if vertices.is_empty() || axis.norm() < 1e-9 {
            return ShapeBound::Full;
        }
        let axis = axis.normalize();
        let mut radius: f64 = 0.0;
        for p in vertices {
            radius = radius.max(axis.angle(p));
        }
        radius += BOUND_PAD;
        if radius > std::f64::consts::FRAC_PI_2 {
            return ShapeBound::Full;
        }
        ShapeBound::Cap { axis, radius }
    }

    /// Whether the given cell could intersect anything inside this bound.
    pub(crate) fn may_intersect_cell(&self, cell: CellID) -> bool {
        match self {
            ShapeBound::Full => true,
            ShapeBound::Cap { axis, radius } => {
                let (center, cell_radius) = cell_cap(cell);
                axis.angle(&center) <= radius + cell_radius
            }
        }
    }
}

/// An axis-aligned latitude/longitude rectangle, in degrees.
///
/// `lng_lo > lng_hi` means the longitude interval crosses the
/// antimeridian. Produced by the GeoJSON polygon rectangle fast-path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngRect {
    pub lat_lo: f64,
    pub lat_hi: f64,
    pub lng_lo: f64,
    pub lng_hi: f64,
}

impl LatLngRect {
    /// Build from two opposite corners, taking the shorter longitude arc
    /// between them.
    pub fn from_corners(a: &Coordinate, b: &Coordinate) -> Self {
        let lat_lo = a.latitude.min(b.latitude);
        let lat_hi = a.latitude.max(b.latitude);
        let (lng_min, lng_max) = if a.longitude <= b.longitude {
            (a.longitude, b.longitude)
        } else {
            (b.longitude, a.longitude)
        };
        if lng_max - lng_min <= 180.0 {
            Self {
                lat_lo,
                lat_hi,
                lng_lo: lng_min,
                lng_hi: lng_max,
            }
        } else {
            // shorter arc wraps through the antimeridian
            Self {
                lat_lo,
                lat_hi,
                lng_lo: lng_max,
                lng_hi: lng_min,
            }
        }
    }

    pub fn is_point(&self) -> bool {
        self.lat_lo == self.lat_hi && self.lng_lo == self.lng_hi
    }

    fn wraps(&self) -> bool {
        self.lng_lo > self.lng_hi
    }

    fn lng_span(&self) -> f64 {
        if self.wraps() {
            self.lng_hi - self.lng_lo + 360.0
        } else {
            self.lng_hi - self.lng_lo
        }
    }

    /// Point membership; boundary counts as inside.
    pub fn contains(&self, c: &Coordinate) -> bool {
        if c.latitude < self.lat_lo || c.latitude > self.lat_hi {
            return false;
        }
        if self.wraps() {
            c.longitude >= self.lng_lo || c.longitude <= self.lng_hi
        } else {
            c.longitude >= self.lng_lo && c.longitude <= self.lng_hi
        }
    }

    fn center(&self) -> Coordinate {
        let lat = (self.lat_lo + self.lat_hi) / 2.0;
        let lng = if self.wraps() {
            Coordinate::new(0.0, (self.lng_lo + self.lng_hi) / 2.0 + 180.0)
                .normalized()
                .longitude
        } else {
            (self.lng_lo + self.lng_hi) / 2.0
        };
        Coordinate::new(lat, lng)
    }

    fn bound(&self) -> ShapeBound {
        // With at most 180 degrees of longitude span, the boundary point
        // farthest from the rectangle center is one of the corners.
        if self.lng_span() > 180.0 {
            return ShapeBound::Full;
        }
        let axis = self.center().to_unit_point();
        let corners = [
            Coordinate::new(self.lat_lo, self.lng_lo),
            Coordinate::new(self.lat_lo, self.lng_hi),
            Coordinate::new(self.lat_hi, self.lng_lo),
            Coordinate::new(self.lat_hi, self.lng_hi),
        ];
        let mut radius: f64 = 0.0;
        for c in &corners {
            radius = radius.max(axis.angle(&c.to_unit_point()));
        }
        ShapeBound::Cap {
            axis,
            radius: radius + BOUND_PAD,
        }
    }
}

/// A polygon: one outer loop plus zero or more holes, all normalized.
#[derive(Debug, Clone)]
pub struct SpherePolygon {
    loops: Vec<SphereLoop>,
}

impl SpherePolygon {
    /// Assemble from validated loops; `loops[0]` is the outer boundary.
    pub(crate) fn new(loops: Vec<SphereLoop>) -> Self {
        debug_assert!(!loops.is_empty());
        Self { loops }
    }

    pub fn outer(&self) -> &SphereLoop {
        &self.loops[0]
    }

    pub fn num_loops(&self) -> usize {
        self.loops.len()
    }

    /// Inside the outer loop and outside every hole: a point is contained
    /// when an odd number of loops contain it.
    pub fn contains(&self, p: &UnitPoint) -> bool {
        let mut count = 0;
        for l in &self.loops {
            if l.contains(p) {
                count += 1;
            }
        }
        count % 2 == 1
    }

    fn bound(&self) -> ShapeBound {
        // The vertex cap encloses the boundary; the interior can still be
        // the far side of it. The cap complement is connected, so probing
        // the antipode of the axis decides which side the interior is on.
        match ShapeBound::from_vertices(self.outer().vertices().iter()) {
            ShapeBound::Full => ShapeBound::Full,
            ShapeBound::Cap { axis, radius } => {
                if self.outer().contains(&axis.neg()) {
                    ShapeBound::Full
                } else {
                    ShapeBound::Cap { axis, radius }
                }
            }
        }
    }
}

/// True if `p` lies on the edge chain `vertices` (inclusive of
/// endpoints).
fn polyline_contains(vertices: &[UnitPoint], p: &UnitPoint) -> bool {
    for pair in vertices.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if p == a || p == b {
            return true;
        }
        // coplanar with the edge's great circle and between its endpoints
        let normal = a.cross(b);
        if normal.norm() == 0.0 {
            continue;
        }
        if (normal.normalize().dot(p)).abs() > ON_EDGE_EPS {
            continue;
        }
        let span = a.angle(b);
        if a.angle(p) <= span + ON_EDGE_EPS && b.angle(p) <= span + ON_EDGE_EPS {
            return true;
        }
    }
    false
}

/// Tagged union of the spherical primitives a query can filter by.
#[derive(Debug, Clone)]
pub enum ShapeContainer {
    Point(UnitPoint),
    MultiPoint(Vec<UnitPoint>),
    Polyline(Vec<UnitPoint>),
    MultiPolyline(Vec<Vec<UnitPoint>>),
    Polygon(SpherePolygon),
    Rect(LatLngRect),
}

impl ShapeContainer {
    /// Exact point membership. Boundary counts as inside; point shapes
    /// are degenerate and only match exact equality.
    pub fn contains(&self, coord: &Coordinate) -> bool {
        let p = coord.to_unit_point();
        match self {
            ShapeContainer::Point(q) => *q == p,
            ShapeContainer::MultiPoint(qs) => qs.iter().any(|q| *q == p),
            ShapeContainer::Polyline(vs) => polyline_contains(vs, &p),
            ShapeContainer::MultiPolyline(ls) => ls.iter().any(|vs| polyline_contains(vs, &p)),
            ShapeContainer::Polygon(poly) => poly.contains(&p),
            ShapeContainer::Rect(rect) => rect.contains(&coord.normalized()),
        }
    }

    /// Conservative cell pre-filter: false only when the cell certainly
    /// does not intersect the shape.
    pub fn may_intersect(&self, cell: CellID) -> bool {
        match self {
            ShapeContainer::Point(q) => cell_contains_unit(cell, q),
            ShapeContainer::MultiPoint(qs) => qs.iter().any(|q| cell_contains_unit(cell, q)),
            ShapeContainer::Polyline(vs) => {
                ShapeBound::from_vertices(vs.iter()).may_intersect_cell(cell)
            }
            ShapeContainer::MultiPolyline(ls) => ls
                .iter()
                .any(|vs| ShapeBound::from_vertices(vs.iter()).may_intersect_cell(cell)),
            ShapeContainer::Polygon(poly) => poly.bound().may_intersect_cell(cell),
            ShapeContainer::Rect(rect) => rect.bound().may_intersect_cell(cell),
        }
    }
}

/// Whether a cell contains the given unit point, by leaf-id range.
fn cell_contains_unit(cell: CellID, p: &UnitPoint) -> bool {
    let c = p.to_coordinate();
    let leaf = CellID::from(LatLng::from_degrees(c.latitude, c.longitude));
    cell.range_min().0 <= leaf.0 && leaf.0 <= cell.range_max().0
}
