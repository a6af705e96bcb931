//! Antimeridian and pole handling for drawing into flat lat/lon tiles.
//!
//! A tile's pixel grid is a flat patch of longitude and latitude, so a path
//! that jumps from +179° to -179° would be drawn as a line across the whole
//! tile. These helpers rewrite longitudes so every path is continuous in the
//! frame it is drawn in.

use crate::geo::{count_dateline_crossings, segment_crosses_dateline, sign, LatLon, Sector};

/// Orientation of a ring as seen from outside the globe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WindingRule {
    Clockwise,
    #[default]
    CounterClockwise,
}

impl WindingRule {
    /// Orientation of `ring` around its own centroid direction.
    pub fn of_ring(ring: &[LatLon]) -> Self {
        if ring.len() < 3 {
            return WindingRule::default();
        }
        let points: Vec<_> = ring.iter().map(|ll| ll.to_unit_vector()).collect();
        let mut normal = glam::DVec3::ZERO;
        let mut mean = glam::DVec3::ZERO;
        for (i, &p) in points.iter().enumerate() {
            let q = points[(i + 1) % points.len()];
            normal += p.cross(q);
            mean += p;
        }
        if normal.dot(mean) >= 0.0 {
            WindingRule::CounterClockwise
        } else {
            WindingRule::Clockwise
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pole {
    North,
    South,
}

impl Pole {
    pub fn latitude(self) -> f64 {
        match self {
            Pole::North => 90.0,
            Pole::South => -90.0,
        }
    }
}

/// Stroke path of a shape, continuous in longitude.
#[derive(Clone, Debug, PartialEq)]
pub struct OutlinePath {
    pub locations: Vec<LatLon>,
    /// Longitude offset for a second, translated stroke when the path runs
    /// past ±180° and the translated copy reaches into the tile.
    pub second_pass_offset: Option<f64>,
}

/// Unwrap a path that crosses the antimeridian so consecutive longitudes
/// never jump by more than 180°.
///
/// Each crossing adds ±360° to everything after it, the same way the fill
/// contour is built. A copy shifted by ∓360° is requested only when the
/// unwrapped path leaves [-180°, 180°] and the copy overlaps `sector`.
/// Paths that do not cross are copied.
pub fn fix_dateline_crossing_locations(sector: &Sector, locations: &[LatLon]) -> OutlinePath {
    let mut unwrapped = Vec::with_capacity(locations.len());
    let mut offset = 0.0;
    let mut previous: Option<LatLon> = None;
    for &ll in locations {
        if let Some(prev) = previous {
            if segment_crosses_dateline(prev, ll) {
                offset += 360.0 * sign(prev.lon);
            }
        }
        unwrapped.push(LatLon::new(ll.lat, ll.lon + offset));
        previous = Some(ll);
    }

    let (min_lon, max_lon) = unwrapped
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), ll| (lo.min(ll.lon), hi.max(ll.lon)));
    let second_pass_offset = if max_lon > 180.0 {
        Some(-360.0)
    } else if min_lon < -180.0 {
        Some(360.0)
    } else {
        None
    }
    .filter(|offset| min_lon + offset <= sector.max_lon && max_lon + offset >= sector.min_lon);

    OutlinePath {
        locations: unwrapped,
        second_pass_offset,
    }
}

/// Fill contour of a ring, continuous in longitude.
#[derive(Clone, Debug, PartialEq)]
pub struct InteriorContour {
    pub locations: Vec<LatLon>,
    /// Pole the ring encloses, when it crosses the antimeridian an odd
    /// number of times.
    pub pole: Option<Pole>,
    /// Longitude offset for a second, translated fill pass when the contour
    /// runs past ±180°.
    pub second_pass_offset: Option<f64>,
}

impl InteriorContour {
    /// Fewer than three vertices cannot be filled.
    pub fn is_degenerate(&self) -> bool {
        self.locations.len() < 3
    }
}

/// Build the fill contour of a closed ring.
///
/// Crossings of the antimeridian are unwrapped by accumulating ±360° so the
/// contour stays continuous. A ring that crosses an odd number of times
/// encloses a pole: at the crossing nearest that pole the contour detours
/// along the seam to the pole, across, and back down the other side, which
/// closes the cap in the flat patch. Rings that wrap a pole more than once
/// produce an unspecified contour.
pub fn interior_contour(ring: &[LatLon], winding: WindingRule) -> InteriorContour {
    let crossings = dateline_crossings(ring);
    if crossings.is_empty() {
        return InteriorContour {
            locations: ring.to_vec(),
            pole: None,
            second_pass_offset: None,
        };
    }

    let pole = pole_of_crossings(ring, &crossings, winding);

    // The crossing whose departure point is closest to the pole carries the detour.
    let wrap_at = pole.and_then(|pole| {
        crossings.iter().copied().min_by(|&a, &b| {
            let da = (pole.latitude() - ring[a].lat).abs();
            let db = (pole.latitude() - ring[b].lat).abs();
            da.total_cmp(&db)
        })
    });

    let mut locations = Vec::with_capacity(ring.len() + 4);
    let mut offset = 0.0;
    for (i, &ll) in ring.iter().enumerate() {
        locations.push(LatLon::new(ll.lat, ll.lon + offset));
        if i + 1 >= ring.len() || !crossings.contains(&i) {
            continue;
        }
        let next = ring[i + 1];
        let side = sign(ll.lon);
        if Some(i) == wrap_at {
            if let Some(pole) = pole {
                let seam = 180.0 * side;
                let lat = seam_latitude(ll, next);
                locations.push(LatLon::new(lat, seam + offset));
                locations.push(LatLon::new(pole.latitude(), seam + offset));
                locations.push(LatLon::new(pole.latitude(), -seam + offset));
                locations.push(LatLon::new(lat, -seam + offset));
            }
        } else {
            offset += 360.0 * side;
        }
    }

    let (min_lon, max_lon) = locations
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), ll| (lo.min(ll.lon), hi.max(ll.lon)));
    let second_pass_offset = if max_lon > 180.0 {
        Some(-360.0)
    } else if min_lon < -180.0 {
        Some(360.0)
    } else {
        None
    };

    InteriorContour {
        locations,
        pole,
        second_pass_offset,
    }
}

/// Latitude where the segment `a -> b` meets the antimeridian, interpolated
/// linearly in the unwrapped longitude.
fn seam_latitude(a: LatLon, b: LatLon) -> f64 {
    let side = sign(a.lon);
    let seam = 180.0 * side;
    let b_lon = b.lon + 360.0 * side;
    let span = b_lon - a.lon;
    if span == 0.0 {
        return a.lat;
    }
    let t = (seam - a.lon) / span;
    a.lat + t * (b.lat - a.lat)
}

/// Indices `i` where `ring[i] -> ring[i + 1]` jumps across ±180°.
fn dateline_crossings(ring: &[LatLon]) -> Vec<usize> {
    ring.windows(2)
        .enumerate()
        .filter(|(_, pair)| (pair[0].lon - pair[1].lon).abs() > 180.0)
        .map(|(i, _)| i)
        .collect()
}

fn pole_of_crossings(ring: &[LatLon], crossings: &[usize], winding: WindingRule) -> Option<Pole> {
    if crossings.len() % 2 == 0 {
        return None;
    }
    let sign_sum: f64 = crossings.iter().map(|&i| sign(ring[i].lon)).sum();
    if (sign_sum < 0.0) == (winding == WindingRule::Clockwise) {
        Some(Pole::North)
    } else {
        Some(Pole::South)
    }
}

/// True when a ring crosses the antimeridian an odd number of times.
pub fn encloses_pole(ring: &[LatLon]) -> bool {
    count_dateline_crossings(ring) % 2 == 1
}

/// The pole a ring encloses, if any.
pub fn enclosed_pole(ring: &[LatLon], winding: WindingRule) -> Option<Pole> {
    pole_of_crossings(ring, &dateline_crossings(ring), winding)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ll(lat: f64, lon: f64) -> LatLon {
        LatLon::new(lat, lon)
    }

    fn ring_around_north(eastward: bool) -> Vec<LatLon> {
        let mut lons: Vec<f64> = (-3..=3)
            .map(|i| i as f64 * 60.0)
            .map(|l| if l == -180.0 { -179.0 } else { l })
            .collect();
        lons.retain(|l| *l != 180.0);
        if !eastward {
            lons.reverse();
        }
        let mut ring: Vec<LatLon> = lons.iter().map(|&lon| ll(80.0, lon)).collect();
        ring.push(ring[0]);
        ring
    }

    #[test]
    fn test_fix_dateline_unwraps_and_shifts_toward_tile() {
        let path = [ll(0.0, 170.0), ll(0.0, -170.0)];
        let west = Sector::new(-10.0, 10.0, -180.0, -170.0);
        let east = Sector::new(-10.0, 10.0, 170.0, 180.0);
        let fixed = fix_dateline_crossing_locations(&west, &path);
        assert_eq!(fixed.locations, vec![ll(0.0, 170.0), ll(0.0, 190.0)]);
        assert_eq!(fixed.second_pass_offset, Some(-360.0));
        let fixed = fix_dateline_crossing_locations(&east, &path);
        assert_eq!(fixed.locations, vec![ll(0.0, 170.0), ll(0.0, 190.0)]);
        assert_eq!(fixed.second_pass_offset, None);
    }

    #[test]
    fn test_fix_dateline_leaves_other_paths() {
        let path = [ll(0.0, -10.0), ll(0.0, 10.0)];
        let west = Sector::new(-10.0, 10.0, -180.0, -170.0);
        let fixed = fix_dateline_crossing_locations(&west, &path);
        assert_eq!(fixed.locations, path.to_vec());
        assert_eq!(fixed.second_pass_offset, None);
    }

    #[test]
    fn test_fix_dateline_keeps_prime_meridian_segments_contiguous() {
        let path = [ll(0.0, -10.0), ll(0.0, 5.0), ll(15.0, 170.0), ll(15.0, -170.0)];
        let tile = Sector::new(-18.0, 18.0, 0.0, 36.0);
        let fixed = fix_dateline_crossing_locations(&tile, &path);
        let lons: Vec<f64> = fixed.locations.iter().map(|l| l.lon).collect();
        assert_eq!(lons, vec![-10.0, 5.0, 170.0, 190.0]);
        assert_eq!(fixed.second_pass_offset, None);
    }

    #[test]
    fn test_fix_dateline_ring_around_pole_spans_one_turn() {
        let mut ring: Vec<LatLon> = (-180..180).step_by(20).map(|lon| ll(-65.0, lon as f64)).collect();
        ring.push(ring[0]);
        let tile = Sector::new(-90.0, -54.0, 0.0, 36.0);
        let fixed = fix_dateline_crossing_locations(&tile, &ring);
        assert!(fixed.locations.windows(2).all(|w| (w[1].lon - w[0].lon).abs() <= 20.0));
        assert_eq!(fixed.locations.last().map(|l| l.lon), Some(180.0));
        assert_eq!(fixed.second_pass_offset, None);
    }

    #[test]
    fn test_crossing_ring_is_unwrapped_with_second_pass() {
        let ring = [ll(-5.0, 175.0), ll(-5.0, -175.0), ll(5.0, -175.0), ll(5.0, 175.0), ll(-5.0, 175.0)];
        let contour = interior_contour(&ring, WindingRule::CounterClockwise);
        assert_eq!(contour.pole, None);
        assert_eq!(contour.locations[1].lon, 185.0);
        assert_eq!(contour.locations[2].lon, 185.0);
        assert_eq!(contour.locations[3].lon, 175.0);
        assert_eq!(contour.second_pass_offset, Some(-360.0));
    }

    #[test]
    fn test_westward_start_unwraps_negative() {
        let ring = [ll(-5.0, -175.0), ll(-5.0, 175.0), ll(5.0, 175.0), ll(5.0, -175.0), ll(-5.0, -175.0)];
        let contour = interior_contour(&ring, WindingRule::Clockwise);
        assert_eq!(contour.locations[1].lon, -185.0);
        assert_eq!(contour.second_pass_offset, Some(360.0));
    }

    #[test]
    fn test_plain_ring_untouched() {
        let ring = [ll(0.0, 0.0), ll(0.0, 10.0), ll(10.0, 10.0), ll(0.0, 0.0)];
        let contour = interior_contour(&ring, WindingRule::CounterClockwise);
        assert_eq!(contour.locations, ring.to_vec());
        assert_eq!(contour.second_pass_offset, None);
    }

    #[test]
    fn test_eastward_ring_encloses_north_pole() {
        let ring = ring_around_north(true);
        assert!(encloses_pole(&ring));
        let winding = WindingRule::of_ring(&ring);
        assert_eq!(winding, WindingRule::CounterClockwise);
        let contour = interior_contour(&ring, winding);
        assert_eq!(contour.pole, Some(Pole::North));
        assert!(contour.locations.iter().any(|l| l.lat == 90.0 && l.lon == 180.0));
        assert!(contour.locations.iter().any(|l| l.lat == 90.0 && l.lon == -180.0));
        assert!(contour.locations.iter().all(|l| l.lon >= -180.0 && l.lon <= 180.0));
        assert_eq!(contour.second_pass_offset, None);
    }

    #[test]
    fn test_westward_ring_still_encloses_north_pole() {
        let ring = ring_around_north(false);
        let winding = WindingRule::of_ring(&ring);
        assert_eq!(winding, WindingRule::Clockwise);
        assert_eq!(interior_contour(&ring, winding).pole, Some(Pole::North));
    }

    #[test]
    fn test_southern_ring_encloses_south_pole() {
        let ring: Vec<LatLon> = ring_around_north(true).iter().map(|l| ll(-l.lat, l.lon)).collect();
        let contour = interior_contour(&ring, WindingRule::of_ring(&ring));
        assert_eq!(contour.pole, Some(Pole::South));
        assert!(contour.locations.iter().any(|l| l.lat == -90.0));
    }

    #[test]
    fn test_seam_latitude_interpolates() {
        assert!((seam_latitude(ll(0.0, 170.0), ll(10.0, -170.0)) - 5.0).abs() < 1e-12);
    }
}
