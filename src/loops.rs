//! Spherical loops: simple closed polygons on the unit sphere.
//!
//! A loop is an ordered ring of at least three distinct unit points whose
//! interior lies to the left of its edges (counterclockwise seen from
//! outside the sphere). Containment is decided by edge-crossing parity
//! against a fixed reference point, the classic cell-geometry approach;
//! the crossing and orientation predicates below mirror the shape-index
//! edge crosser.
//!
//! Predicates use plain floating-point determinants. Points exactly on an
//! edge are resolved by the crossing rules deterministically, not
//! symmetrically; callers treat the boundary as inside on a best-effort
//! basis.

use crate::coord::UnitPoint;
use crate::error::{GeoError, Result};

/// Fixed reference point for crossing parity. An arbitrary direction
/// chosen to be unlikely to lie on any real edge; the predicates are
/// scale-invariant, so it need not be exactly unit length.
const REFERENCE: UnitPoint = UnitPoint {
    x: 0.0053,
    y: -0.0087,
    z: 0.99995,
};

/// Sign of the determinant |a b c|: positive when the triangle a, b, c is
/// counterclockwise seen from outside the sphere.
#[inline]
fn det(a: &UnitPoint, b: &UnitPoint, c: &UnitPoint) -> f64 {
    a.dot(&b.cross(c))
}

/// True when a, b, c appear in counterclockwise order around `o`.
fn ordered_ccw(a: &UnitPoint, b: &UnitPoint, c: &UnitPoint, o: &UnitPoint) -> bool {
    let mut sum = 0;
    if det(b, o, a) >= 0.0 {
        sum += 1;
    }
    if det(c, o, b) >= 0.0 {
        sum += 1;
    }
    if det(a, o, c) > 0.0 {
        sum += 1;
    }
    sum >= 2
}

/// True when edge AB crosses edge CD at an interior point of both.
fn simple_crossing(a: &UnitPoint, b: &UnitPoint, c: &UnitPoint, d: &UnitPoint) -> bool {
    let ab = a.cross(b);
    let acb = -ab.dot(c);
    let bda = ab.dot(d);
    if acb * bda <= 0.0 {
        return false;
    }
    let cd = c.cross(d);
    let cbd = -cd.dot(b);
    let dac = cd.dot(a);
    acb * cbd > 0.0 && acb * dac > 0.0
}

/// Crossing rule for edges sharing a vertex, chosen so that summing
/// crossings along an edge chain gives consistent parity.
fn vertex_crossing(a: &UnitPoint, b: &UnitPoint, c: &UnitPoint, d: &UnitPoint) -> bool {
    if a == b || c == d {
        return false;
    }
    if a == d {
        return ordered_ccw(&a.ortho(), c, b, a);
    }
    if b == c {
        return ordered_ccw(&b.ortho(), d, a, b);
    }
    if a == c {
        return ordered_ccw(&a.ortho(), d, b, a);
    }
    if b == d {
        return ordered_ccw(&b.ortho(), c, a, b);
    }
    false
}

fn edge_or_vertex_crossing(a: &UnitPoint, b: &UnitPoint, c: &UnitPoint, d: &UnitPoint) -> bool {
    if simple_crossing(a, b, c, d) {
        return true;
    }
    if a == c || a == d || b == c || b == d {
        return vertex_crossing(a, b, c, d);
    }
    false
}

/// A validated spherical loop.
#[derive(Debug, Clone)]
pub struct SphereLoop {
    vertices: Vec<UnitPoint>,
    /// Whether the fixed reference point lies inside this loop.
    reference_inside: bool,
}

impl SphereLoop {
    /// Build and validate a loop from distinct vertices (no closing
    /// duplicate). Fails on fewer than three vertices, identical or
    /// antipodal adjacent vertices, or self-intersecting edges.
    pub fn new(vertices: Vec<UnitPoint>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(GeoError::bad(
                "invalid loop, must have at least 3 distinct vertices",
            ));
        }
        let n = vertices.len();
        for i in 0..n {
            let a = &vertices[i];
            let b = &vertices[(i + 1) % n];
            if a == b {
                return Err(GeoError::bad("invalid loop, duplicate adjacent vertices"));
            }
            if *a == b.neg() {
                return Err(GeoError::bad("invalid loop, antipodal adjacent vertices"));
            }
        }
        for i in 0..n {
            for j in (i + 1)..n {
                // skip edges sharing a vertex
                if j == i + 1 || (i == 0 && j == n - 1) {
                    continue;
                }
                if simple_crossing(
                    &vertices[i],
                    &vertices[(i + 1) % n],
                    &vertices[j],
                    &vertices[(j + 1) % n],
                ) {
                    return Err(GeoError::bad("invalid loop, edges cross"));
                }
            }
        }

        let mut sloop = Self {
            vertices,
            reference_inside: false,
        };
        sloop.init_reference_inside();
        Ok(sloop)
    }

    /// Fix up the reference-point containment bit. The wedge test at
    /// vertex 1 gives the ground truth for one probe point; any
    /// disagreement with the parity walk means the reference point is
    /// inside.
    fn init_reference_inside(&mut self) {
        let probe = self.vertices[1].ortho();
        let v1_inside = ordered_ccw(&probe, &self.vertices[0], &self.vertices[2], &self.vertices[1]);
        self.reference_inside = false;
        if v1_inside != self.contains(&probe) {
            self.reference_inside = true;
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[UnitPoint] {
        &self.vertices
    }

    /// Point containment by crossing parity along the arc from the
    /// reference point to `p`.
    pub fn contains(&self, p: &UnitPoint) -> bool {
        let mut inside = self.reference_inside;
        let n = self.vertices.len();
        for i in 0..n {
            inside ^= edge_or_vertex_crossing(
                &REFERENCE,
                p,
                &self.vertices[i],
                &self.vertices[(i + 1) % n],
            );
        }
        inside
    }

    /// Sum of signed turning angles at each vertex. Positive for a
    /// counterclockwise loop enclosing less than half the sphere
    /// (spherical area is `2π` minus this sum).
    pub fn turning_angle(&self) -> f64 {
        let n = self.vertices.len();
        let mut sum = 0.0;
        for i in 0..n {
            let a = &self.vertices[(i + n - 1) % n];
            let b = &self.vertices[i];
            let c = &self.vertices[(i + 1) % n];
            let angle = a.cross(b).angle(&b.cross(c));
            sum += if det(a, b, c) > 0.0 { angle } else { -angle };
        }
        sum
    }

    /// Whether the loop encloses at most half the sphere.
    pub fn is_normalized(&self) -> bool {
        // tolerate accumulated error on near-hemisphere loops
        self.turning_angle() >= -1e-10
    }

    /// Invert the loop if needed so its interior is the smaller side.
    pub fn normalize(&mut self) {
        if !self.is_normalized() {
            self.invert();
        }
    }

    /// Swap interior and exterior.
    fn invert(&mut self) {
        self.vertices.reverse();
        self.reference_inside = !self.reference_inside;
    }

    /// True if `other` lies entirely within this loop (boundaries may
    /// touch at vertices but edges must not cross).
    pub fn contains_loop(&self, other: &SphereLoop) -> bool {
        other.vertices.iter().all(|v| self.contains(v)) && !self.boundary_crosses(other)
    }

    fn boundary_crosses(&self, other: &SphereLoop) -> bool {
        let n = self.vertices.len();
        let m = other.vertices.len();
        for i in 0..n {
            for j in 0..m {
                if simple_crossing(
                    &self.vertices[i],
                    &self.vertices[(i + 1) % n],
                    &other.vertices[j],
                    &other.vertices[(j + 1) % m],
                ) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;

    fn pt(lat: f64, lng: f64) -> UnitPoint {
        Coordinate::new(lat, lng).to_unit_point()
    }

    /// Counterclockwise quad around (0, 0).
    fn ccw_quad() -> Vec<UnitPoint> {
        vec![pt(-1.0, 1.0), pt(1.0, 1.0), pt(1.0, -1.0), pt(-1.0, -1.0)]
    }

    #[test]
    fn test_too_few_vertices() {
        assert!(SphereLoop::new(vec![pt(0.0, 0.0), pt(1.0, 1.0)]).is_err());
    }

    #[test]
    fn test_duplicate_adjacent_rejected() {
        let v = vec![pt(0.0, 0.0), pt(0.0, 0.0), pt(1.0, 1.0)];
        assert!(SphereLoop::new(v).is_err());
    }

    #[test]
    fn test_self_intersection_rejected() {
        // bowtie
        let v = vec![pt(0.0, 0.0), pt(1.0, 1.0), pt(1.0, 0.0), pt(0.0, 1.0)];
        assert!(SphereLoop::new(v).is_err());
    }

    #[test]
    fn test_contains_center() {
        let sloop = SphereLoop::new(ccw_quad()).unwrap();
        assert!(sloop.is_normalized());
        assert!(sloop.contains(&pt(0.0, 0.0)));
        assert!(!sloop.contains(&pt(5.0, 0.0)));
        assert!(!sloop.contains(&pt(0.0, 179.0)));
    }

    #[test]
    fn test_normalize_inverts_clockwise() {
        let mut cw = ccw_quad();
        cw.reverse();
        let mut sloop = SphereLoop::new(cw).unwrap();
        assert!(!sloop.is_normalized());
        sloop.normalize();
        assert!(sloop.is_normalized());
        assert!(sloop.contains(&pt(0.0, 0.0)));
    }

    #[test]
    fn test_contains_loop() {
        let outer = SphereLoop::new(ccw_quad()).unwrap();
        let inner = SphereLoop::new(vec![
            pt(-0.5, 0.5),
            pt(0.5, 0.5),
            pt(0.5, -0.5),
            pt(-0.5, -0.5),
        ])
        .unwrap();
        assert!(outer.contains_loop(&inner));
        assert!(!inner.contains_loop(&outer));

        let disjoint = SphereLoop::new(vec![
            pt(9.0, 10.0),
            pt(11.0, 10.0),
            pt(11.0, 8.0),
            pt(9.0, 8.0),
        ])
        .unwrap();
        assert!(!outer.contains_loop(&disjoint));
    }

    #[test]
    fn test_turning_angle_sign() {
        let ccw = SphereLoop::new(ccw_quad()).unwrap();
        assert!(ccw.turning_angle() > 0.0);

        let mut cw = ccw_quad();
        cw.reverse();
        let cw = SphereLoop::new(cw).unwrap();
        assert!(cw.turning_angle() < 0.0);
    }

    #[test]
    fn test_contains_matches_over_grid() {
        // A larger irregular triangle; compare containment with a coarse
        // lat/lng sweep against the expected interior box.
        let tri = SphereLoop::new(vec![pt(0.0, 0.0), pt(0.0, 20.0), pt(20.0, 10.0)]).unwrap();
        assert!(tri.is_normalized());
        assert!(tri.contains(&pt(5.0, 10.0)));
        assert!(!tri.contains(&pt(15.0, 0.5)));
        assert!(!tri.contains(&pt(-1.0, 10.0)));
    }
}
