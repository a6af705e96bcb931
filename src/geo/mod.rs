//! Geographic primitives: locations, path types and navigation on the unit
//! sphere. Angles are stored in degrees; distances and azimuths are radians.

use glam::DVec3;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

pub mod sector;

pub use sector::Sector;

/// How consecutive locations of a shape are connected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PathType {
    #[default]
    GreatCircle,
    RhumbLine,
    /// Straight in lat/lon space, which is what a flat tile draws anyway.
    Linear,
}

/// A geographic location in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Wrap longitude into [-180, 180]
#[inline(always)]
pub fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Fold latitude back into [-90, 90] as if walking over the pole
#[inline(always)]
pub fn normalize_lat(lat: f64) -> f64 {
    let lat = lat % 180.0;
    if lat > 90.0 {
        180.0 - lat
    } else if lat < -90.0 {
        -180.0 - lat
    } else {
        lat
    }
}

#[inline(always)]
pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-90.0, 90.0)
}

#[inline(always)]
pub fn clamp_lon(lon: f64) -> f64 {
    lon.clamp(-180.0, 180.0)
}

/// Sign that treats zero as its own case, unlike `f64::signum`.
#[inline(always)]
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl LatLon {
    pub const ZERO: LatLon = LatLon { lat: 0.0, lon: 0.0 };

    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn from_radians(lat: f64, lon: f64) -> Self {
        Self::new(lat.to_degrees(), lon.to_degrees())
    }

    /// Unit vector with x toward (0, 0), y toward (0, 90) and z toward the north pole.
    #[inline(always)]
    pub fn to_unit_vector(self) -> DVec3 {
        let lon_rad = self.lon.to_radians();
        let lat_rad = self.lat.to_radians();
        DVec3::new(
            lat_rad.cos() * lon_rad.cos(),
            lat_rad.cos() * lon_rad.sin(),
            lat_rad.sin(),
        )
    }

    /// Inverse of [`LatLon::to_unit_vector`]; the input need not be normalized.
    pub fn from_vector(v: DVec3) -> Self {
        let len = v.length();
        if len == 0.0 {
            return Self::ZERO;
        }
        let lat = (v.z / len).clamp(-1.0, 1.0).asin().to_degrees();
        let lon = v.y.atan2(v.x).to_degrees();
        Self::new(lat, lon)
    }

    /// Haversine distance in radians.
    pub fn great_circle_distance(self, other: LatLon) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let distance = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();
        if distance.is_nan() {
            0.0
        } else {
            distance
        }
    }

    /// Initial bearing toward `other`, clockwise from north, in radians.
    pub fn great_circle_azimuth(self, other: LatLon) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let lon1 = self.lon.to_radians();
        let lon2 = other.lon.to_radians();

        if lat1 == lat2 && lon1 == lon2 {
            return 0.0;
        }
        if lon1 == lon2 {
            return if lat1 > lat2 { PI } else { 0.0 };
        }

        let y = lat2.cos() * (lon2 - lon1).sin();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * (lon2 - lon1).cos();
        let azimuth = y.atan2(x);
        if azimuth.is_nan() {
            0.0
        } else {
            azimuth
        }
    }

    /// Location reached by travelling `distance` radians along a great circle.
    pub fn great_circle_end_position(self, azimuth: f64, distance: f64) -> LatLon {
        if distance == 0.0 {
            return self;
        }
        let lat = self.lat.to_radians();
        let lon = self.lon.to_radians();

        let end_lat = (lat.sin() * distance.cos() + lat.cos() * distance.sin() * azimuth.cos()).asin();
        let end_lon = lon
            + (distance.sin() * azimuth.sin())
                .atan2(lat.cos() * distance.cos() - lat.sin() * distance.sin() * azimuth.cos());

        if end_lat.is_nan() || end_lon.is_nan() {
            return self;
        }
        LatLon::new(
            normalize_lat(end_lat.to_degrees()),
            normalize_lon(end_lon.to_degrees()),
        )
    }

    /// Rhumb line distance in radians.
    pub fn rhumb_distance(self, other: LatLon) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = wrap_delta_lon((other.lon - self.lon).to_radians());

        let d_phi = mercator_delta(lat1, lat2);
        let q = if d_phi.abs() > 1e-12 && d_phi.is_finite() {
            d_lat / d_phi
        } else {
            lat1.cos()
        };

        let distance = (d_lat * d_lat + q * q * d_lon * d_lon).sqrt();
        if distance.is_finite() {
            distance
        } else {
            self.great_circle_distance(other)
        }
    }

    /// Constant bearing toward `other`, clockwise from north, in radians.
    pub fn rhumb_azimuth(self, other: LatLon) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lon = wrap_delta_lon((other.lon - self.lon).to_radians());
        let d_phi = mercator_delta(lat1, lat2);
        let azimuth = d_lon.atan2(d_phi);
        if azimuth.is_nan() {
            0.0
        } else {
            azimuth
        }
    }

    /// Location reached by travelling `distance` radians at a constant bearing.
    pub fn rhumb_end_position(self, azimuth: f64, distance: f64) -> LatLon {
        if distance == 0.0 {
            return self;
        }
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();

        let mut lat2 = lat1 + distance * azimuth.cos();
        let d_phi = mercator_delta(lat1, lat2);
        let q = if d_phi.abs() > 1e-12 && d_phi.is_finite() {
            (lat2 - lat1) / d_phi
        } else {
            lat1.cos()
        };
        let d_lon = distance * azimuth.sin() / q;

        if lat2.abs() > FRAC_PI_2 {
            lat2 = if lat2 > 0.0 { PI - lat2 } else { -PI - lat2 };
        }
        let lon2 = (lon1 + d_lon + PI).rem_euclid(TAU) - PI;

        if lat2.is_nan() || lon2.is_nan() {
            return self;
        }
        LatLon::from_radians(lat2, lon2)
    }

    /// Point at fraction `t` of the great circle arc toward `other`.
    pub fn interpolate_great_circle(self, other: LatLon, t: f64) -> LatLon {
        if self == other {
            return self;
        }
        let azimuth = self.great_circle_azimuth(other);
        let distance = self.great_circle_distance(other);
        self.great_circle_end_position(azimuth, t * distance)
    }

    /// Point at fraction `t` of the rhumb line toward `other`.
    pub fn interpolate_rhumb(self, other: LatLon, t: f64) -> LatLon {
        if self == other {
            return self;
        }
        let azimuth = self.rhumb_azimuth(other);
        let distance = self.rhumb_distance(other);
        self.rhumb_end_position(azimuth, t * distance)
    }
}

/// Difference of Mercator-stretched latitudes, used by the rhumb formulas.
#[inline(always)]
fn mercator_delta(lat1: f64, lat2: f64) -> f64 {
    ((lat2 / 2.0 + FRAC_PI_4).tan() / (lat1 / 2.0 + FRAC_PI_4).tan()).ln()
}

/// Take the short way around when a longitude delta exceeds half a turn.
#[inline(always)]
fn wrap_delta_lon(d_lon: f64) -> f64 {
    if d_lon.abs() > PI {
        if d_lon > 0.0 {
            -(TAU - d_lon)
        } else {
            TAU + d_lon
        }
    } else {
        d_lon
    }
}

/// Minimum and maximum latitude reached on the great circle arc from `begin`
/// to `end`. Arcs bulge poleward, so this can exceed both endpoints.
pub fn great_circle_arc_extreme_latitudes(begin: LatLon, end: LatLon) -> (f64, f64) {
    let mut min_lat = begin.lat.min(end.lat);
    let mut max_lat = begin.lat.max(end.lat);

    let arc_length = begin.great_circle_distance(end);
    if arc_length <= 0.0 {
        return (min_lat, max_lat);
    }

    let azimuth = begin.great_circle_azimuth(end);
    // Arc length from the ascending node to `begin`; the two vertices of the
    // great circle sit a quarter turn either side of that node.
    let sigma = begin.lat.to_radians().tan().atan2(azimuth.cos());
    let first_vertex = (FRAC_PI_2 - sigma).rem_euclid(TAU);
    let second_vertex = (first_vertex + PI).rem_euclid(TAU);

    for distance in [first_vertex, second_vertex] {
        if distance > 0.0 && distance < arc_length {
            let vertex = begin.great_circle_end_position(azimuth, distance);
            min_lat = min_lat.min(vertex.lat);
            max_lat = max_lat.max(vertex.lat);
        }
    }

    (min_lat, max_lat)
}

/// Extreme latitudes over every great circle arc joining consecutive locations.
pub fn great_arc_extreme_latitudes<'a>(
    locations: impl IntoIterator<Item = &'a LatLon>,
) -> Option<(f64, f64)> {
    let mut bounds: Option<(f64, f64)> = None;
    let mut previous: Option<LatLon> = None;

    for &location in locations {
        let (lo, hi) = match previous {
            Some(prev) => great_circle_arc_extreme_latitudes(prev, location),
            None => (location.lat, location.lat),
        };
        bounds = Some(match bounds {
            Some((min, max)) => (min.min(lo), max.max(hi)),
            None => (lo, hi),
        });
        previous = Some(location);
    }

    bounds
}

/// True when `a -> b` jumps across the antimeridian rather than the prime meridian.
#[inline(always)]
pub fn segment_crosses_dateline(a: LatLon, b: LatLon) -> bool {
    if sign(a.lon) == sign(b.lon) {
        return false;
    }
    let delta = (a.lon - b.lon).abs();
    delta > 180.0 && delta < 360.0
}

/// True if any pair of consecutive locations crosses the ±180° meridian.
pub fn locations_cross_dateline<'a>(locations: impl IntoIterator<Item = &'a LatLon>) -> bool {
    let mut previous: Option<LatLon> = None;
    for &location in locations {
        if let Some(prev) = previous {
            if segment_crosses_dateline(prev, location) {
                return true;
            }
        }
        previous = Some(location);
    }
    false
}

/// Number of consecutive pairs whose longitudes differ by more than 180°.
pub fn count_dateline_crossings(locations: &[LatLon]) -> usize {
    locations
        .windows(2)
        .filter(|pair| (pair[0].lon - pair[1].lon).abs() > 180.0)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_normalize_lon() {
        assert_eq!(normalize_lon(190.0), -170.0);
        assert_eq!(normalize_lon(-190.0), 170.0);
        assert_eq!(normalize_lon(180.0), 180.0);
        assert_eq!(normalize_lon(-180.0), -180.0);
        assert_eq!(normalize_lon(45.0), 45.0);
    }

    #[test]
    fn test_normalize_lat_folds_over_pole() {
        assert_eq!(normalize_lat(95.0), 85.0);
        assert_eq!(normalize_lat(-100.0), -80.0);
        assert_eq!(normalize_lat(12.0), 12.0);
    }

    #[test]
    fn test_great_circle_distance_quarter_turn() {
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(0.0, 90.0);
        assert!((a.great_circle_distance(b) - FRAC_PI_2).abs() < EPS);
        assert!((a.great_circle_azimuth(b) - FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn test_end_position_inverts_distance_and_azimuth() {
        let a = LatLon::new(10.0, 20.0);
        let b = LatLon::new(-35.0, 70.0);
        let end = a.great_circle_end_position(a.great_circle_azimuth(b), a.great_circle_distance(b));
        assert!((end.lat - b.lat).abs() < 1e-6);
        assert!((end.lon - b.lon).abs() < 1e-6);
    }

    #[test]
    fn test_rhumb_end_position_reaches_target() {
        let a = LatLon::new(10.0, 20.0);
        let b = LatLon::new(30.0, 50.0);
        let end = a.rhumb_end_position(a.rhumb_azimuth(b), a.rhumb_distance(b));
        assert!((end.lat - b.lat).abs() < 1e-6);
        assert!((end.lon - b.lon).abs() < 1e-6);
    }

    #[test]
    fn test_rhumb_along_parallel_keeps_latitude() {
        let a = LatLon::new(40.0, 0.0);
        let b = LatLon::new(40.0, 30.0);
        let mid = a.interpolate_rhumb(b, 0.5);
        assert!((mid.lat - 40.0).abs() < 1e-6);
        assert!((mid.lon - 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_arc_along_parallel_bulges_poleward() {
        let (min, max) = great_circle_arc_extreme_latitudes(LatLon::new(20.0, 10.0), LatLon::new(20.0, 20.0));
        assert!((min - 20.0).abs() < EPS);
        assert!(max > 20.05 && max < 21.0, "max latitude {max}");

        let (min, _) = great_circle_arc_extreme_latitudes(LatLon::new(-20.0, 10.0), LatLon::new(-20.0, 20.0));
        assert!(min < -20.05 && min > -21.0, "min latitude {min}");
    }

    #[test]
    fn test_meridian_arc_has_no_bulge() {
        let (min, max) = great_circle_arc_extreme_latitudes(LatLon::new(-10.0, 5.0), LatLon::new(30.0, 5.0));
        assert!((min + 10.0).abs() < EPS);
        assert!((max - 30.0).abs() < EPS);
    }

    #[test]
    fn test_dateline_crossing_detection() {
        let crossing = [LatLon::new(0.0, 179.0), LatLon::new(0.0, -179.0)];
        assert!(locations_cross_dateline(crossing.iter()));

        let prime = [LatLon::new(0.0, 1.0), LatLon::new(0.0, -1.0)];
        assert!(!locations_cross_dateline(prime.iter()));

        let ring = [
            LatLon::new(0.0, 170.0),
            LatLon::new(0.0, -170.0),
            LatLon::new(10.0, -170.0),
            LatLon::new(10.0, 170.0),
            LatLon::new(0.0, 170.0),
        ];
        assert_eq!(count_dateline_crossings(&ring), 2);
    }

    #[test]
    fn test_unit_vector_round_trip() {
        let p = LatLon::new(-33.5, 151.25);
        let back = LatLon::from_vector(p.to_unit_vector() * 6_378_137.0);
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert!((back.lon - p.lon).abs() < 1e-9);
    }
}
