use glam::DVec3;

use super::Ray;
use crate::error::{Error, Result};
use crate::geo::LatLon;

/// WGS84 equatorial radius in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// A sphere centered at the origin, z toward the north pole.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Globe {
    radius: f64,
}

impl Globe {
    pub fn new(radius: f64) -> Result<Self> {
        if radius > 0.0 && radius.is_finite() {
            Ok(Self { radius })
        } else {
            Err(Error::InvalidRadius(radius))
        }
    }

    pub const fn earth() -> Self {
        Self { radius: EARTH_RADIUS }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Cartesian point `elevation` meters above `location`.
    #[inline(always)]
    pub fn compute_point(&self, location: LatLon, elevation: f64) -> DVec3 {
        location.to_unit_vector() * (self.radius + elevation)
    }

    /// Location and elevation of a cartesian point.
    pub fn compute_position(&self, point: DVec3) -> (LatLon, f64) {
        (LatLon::from_vector(point), point.length() - self.radius)
    }

    /// Nearest intersection of `ray` with the sphere in front of its origin.
    pub fn intersect(&self, ray: &Ray) -> Option<DVec3> {
        intersect_sphere(ray, self.radius)
    }
}

impl Default for Globe {
    fn default() -> Self {
        Self::earth()
    }
}

fn intersect_sphere(ray: &Ray, radius: f64) -> Option<DVec3> {
    // |o + t d|^2 = r^2 with |d| = 1
    let b = ray.origin.dot(ray.direction);
    let c = ray.origin.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let near = -b - root;
    let far = -b + root;
    let t = if near >= 0.0 {
        near
    } else if far >= 0.0 {
        far
    } else {
        return None;
    };
    Some(ray.point_at(t))
}

/// Elevation source used for screen-space decisions: nearest points during
/// subdivision and the terrain position under the cursor when picking.
pub trait Terrain: Send + Sync {
    fn surface_point(&self, globe: &Globe, location: LatLon) -> Option<DVec3>;

    fn intersect(&self, globe: &Globe, ray: &Ray) -> Option<DVec3>;
}

/// Terrain at a constant height above the globe.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmoothTerrain {
    pub elevation: f64,
}

impl SmoothTerrain {
    pub fn new(elevation: f64) -> Self {
        Self { elevation }
    }
}

impl Terrain for SmoothTerrain {
    fn surface_point(&self, globe: &Globe, location: LatLon) -> Option<DVec3> {
        Some(globe.compute_point(location, self.elevation))
    }

    fn intersect(&self, globe: &Globe, ray: &Ray) -> Option<DVec3> {
        intersect_sphere(ray, globe.radius() + self.elevation)
    }
}
