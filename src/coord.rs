//! Latitude/longitude coordinates and unit-sphere points.
//!
//! All geometric math in this crate happens on [`UnitPoint`]s (3-D
//! Cartesian vectors on the unit sphere). [`Coordinate`] is the
//! degrees-based surface type used at the API boundary; it converts to a
//! unit point on entry.

use s2::latlng::LatLng;
use s2::point::Point;

/// A latitude/longitude pair in degrees.
///
/// Valid coordinates have latitude in `[-90, 90]` and longitude in
/// `[-180, 180]`. Use [`Coordinate::normalized`] to bring arbitrary
/// values into range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }

    /// Clamp latitude to `[-90, 90]` and wrap longitude into `(-180, 180]`.
    pub fn normalized(&self) -> Coordinate {
        let lat = self.latitude.clamp(-90.0, 90.0);
        let mut lng = self.longitude % 360.0;
        if lng <= -180.0 {
            lng += 360.0;
        } else if lng > 180.0 {
            lng -= 360.0;
        }
        Coordinate::new(lat, lng)
    }

    /// Convert to a unit-sphere point.
    pub fn to_unit_point(&self) -> UnitPoint {
        UnitPoint::from_lat_lng_radians(self.latitude.to_radians(), self.longitude.to_radians())
    }

    /// Convert to an `s2` point (for cap and coverer interop).
    pub(crate) fn to_s2_point(&self) -> Point {
        Point::from(LatLng::from_degrees(self.latitude, self.longitude))
    }
}

/// A point on the unit sphere, as a 3-D Cartesian vector.
///
/// Produced from coordinates by the standard spherical mapping
/// (`x = cos φ cos λ`, `y = cos φ sin λ`, `z = sin φ`), the same mapping
/// the S2 cell decomposition uses, so unit points and cell ids agree on
/// where a coordinate lies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl UnitPoint {
    pub(crate) fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn from_lat_lng_radians(lat: f64, lng: f64) -> Self {
        Self {
            x: lat.cos() * lng.cos(),
            y: lat.cos() * lng.sin(),
            z: lat.sin(),
        }
    }

    /// Back to degrees.
    pub fn to_coordinate(&self) -> Coordinate {
        let lat = self.z.atan2((self.x * self.x + self.y * self.y).sqrt());
        let lng = self.y.atan2(self.x);
        Coordinate::new(lat.to_degrees(), lng.to_degrees())
    }

    /// Angular distance to `other`, in radians on the unit sphere.
    pub fn angle(&self, other: &UnitPoint) -> f64 {
        // atan2 form is stable for both tiny and near-antipodal angles,
        // where acos of a clamped dot product loses precision.
        let c = self.cross(other);
        c.norm().atan2(self.dot(other))
    }

    pub(crate) fn dot(&self, other: &UnitPoint) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub(crate) fn cross(&self, other: &UnitPoint) -> UnitPoint {
        UnitPoint::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub(crate) fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub(crate) fn normalize(&self) -> UnitPoint {
        let n = self.norm();
        if n == 0.0 {
            return *self;
        }
        UnitPoint::new(self.x / n, self.y / n, self.z / n)
    }

    pub(crate) fn neg(&self) -> UnitPoint {
        UnitPoint::new(-self.x, -self.y, -self.z)
    }

    /// An arbitrary unit vector orthogonal to this one.
    pub(crate) fn ortho(&self) -> UnitPoint {
        // Cross with the axis of the smallest component to avoid a
        // near-parallel product.
        let ax = self.x.abs();
        let ay = self.y.abs();
        let az = self.z.abs();
        let other = if ax < ay && ax < az {
            UnitPoint::new(1.0, 0.0, 0.0)
        } else if ay < az {
            UnitPoint::new(0.0, 1.0, 0.0)
        } else {
            UnitPoint::new(0.0, 0.0, 1.0)
        };
        self.cross(&other).normalize()
    }
}
