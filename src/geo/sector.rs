use super::{clamp_lat, clamp_lon, sign, LatLon};

/// Axis-aligned lat/lon box in degrees.
///
/// Sectors are plain values. Algorithms in this crate never build a sector
/// whose `min_lon > max_lon`; a region crossing the antimeridian is split into
/// an eastern and a western sector instead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sector {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Sector {
    pub const FULL_SPHERE: Sector = Sector {
        min_lat: -90.0,
        max_lat: 90.0,
        min_lon: -180.0,
        max_lon: 180.0,
    };

    pub const fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self { min_lat, max_lat, min_lon, max_lon }
    }

    /// Bounding box of the locations, ignoring the antimeridian.
    pub fn bounding<'a>(locations: impl IntoIterator<Item = &'a LatLon>) -> Option<Sector> {
        let mut iter = locations.into_iter();
        let first = iter.next()?;
        let mut sector = Sector::new(first.lat, first.lat, first.lon, first.lon);
        for ll in iter {
            sector.min_lat = sector.min_lat.min(ll.lat);
            sector.max_lat = sector.max_lat.max(ll.lat);
            sector.min_lon = sector.min_lon.min(ll.lon);
            sector.max_lon = sector.max_lon.max(ll.lon);
        }
        Some(sector)
    }

    /// Bounding sectors for locations known to cross the antimeridian: an
    /// eastern sector ending at +180 and a western sector starting at -180.
    /// When the two halves would cover every longitude (the path also crosses
    /// the prime meridian) a single full-longitude sector is returned.
    pub fn split_bounding<'a>(locations: impl IntoIterator<Item = &'a LatLon>) -> Vec<Sector> {
        let mut min_lat = 90.0_f64;
        let mut max_lat = -90.0_f64;
        // Smallest non-negative and largest non-positive longitude seen.
        let mut east_min = 180.0_f64;
        let mut west_max = -180.0_f64;
        let mut previous: Option<LatLon> = None;
        let mut any = false;

        for &ll in locations {
            any = true;
            min_lat = min_lat.min(ll.lat);
            max_lat = max_lat.max(ll.lat);
            if ll.lon >= 0.0 && ll.lon < east_min {
                east_min = ll.lon;
            }
            if ll.lon <= 0.0 && ll.lon > west_max {
                west_max = ll.lon;
            }
            if let Some(prev) = previous {
                if sign(ll.lon) != sign(prev.lon) && (ll.lon - prev.lon).abs() < 180.0 {
                    // Crossed the prime meridian.
                    east_min = 0.0;
                    west_max = 0.0;
                }
            }
            previous = Some(ll);
        }

        if !any {
            return Vec::new();
        }
        if east_min <= west_max {
            return vec![Sector::new(min_lat, max_lat, -180.0, 180.0)];
        }
        vec![
            Sector::new(min_lat, max_lat, east_min, 180.0),
            Sector::new(min_lat, max_lat, -180.0, west_max),
        ]
    }

    /// Sectors enclosing a circle of `radius` radians around `center`, split
    /// at the antimeridian when the circle reaches over it.
    pub fn bounding_circle(center: LatLon, radius: f64) -> Vec<Sector> {
        let radius_deg = radius.to_degrees();
        let min_lat = center.lat - radius_deg;
        let max_lat = center.lat + radius_deg;

        if min_lat <= -90.0 || max_lat >= 90.0 {
            return vec![Sector::new(clamp_lat(min_lat), clamp_lat(max_lat), -180.0, 180.0)];
        }

        // Widest longitude offset is reached where the circle's tangent runs north-south.
        let ratio = radius.sin() / center.lat.to_radians().cos();
        if ratio >= 1.0 {
            return vec![Sector::new(min_lat, max_lat, -180.0, 180.0)];
        }
        let d_lon = ratio.asin().to_degrees();
        let min_lon = center.lon - d_lon;
        let max_lon = center.lon + d_lon;

        if min_lon < -180.0 {
            vec![
                Sector::new(min_lat, max_lat, min_lon + 360.0, 180.0),
                Sector::new(min_lat, max_lat, -180.0, max_lon),
            ]
        } else if max_lon > 180.0 {
            vec![
                Sector::new(min_lat, max_lat, min_lon, 180.0),
                Sector::new(min_lat, max_lat, -180.0, max_lon - 360.0),
            ]
        } else {
            vec![Sector::new(min_lat, max_lat, min_lon, max_lon)]
        }
    }

    /// Smallest sector holding every input sector.
    pub fn union_all<'a>(sectors: impl IntoIterator<Item = &'a Sector>) -> Option<Sector> {
        sectors.into_iter().copied().reduce(|a, b| a.union(&b))
    }

    pub fn union(&self, other: &Sector) -> Sector {
        Sector::new(
            self.min_lat.min(other.min_lat),
            self.max_lat.max(other.max_lat),
            self.min_lon.min(other.min_lon),
            self.max_lon.max(other.max_lon),
        )
    }

    /// Overlap test; sectors that only share an edge count as intersecting.
    #[inline(always)]
    pub fn intersects(&self, other: &Sector) -> bool {
        !(other.max_lon < self.min_lon
            || other.min_lon > self.max_lon
            || other.max_lat < self.min_lat
            || other.min_lat > self.max_lat)
    }

    /// True if any sector in the list intersects this one.
    pub fn intersects_any<'a>(&self, sectors: impl IntoIterator<Item = &'a Sector>) -> bool {
        sectors.into_iter().any(|s| self.intersects(s))
    }

    #[inline(always)]
    pub fn contains(&self, location: LatLon) -> bool {
        location.lat >= self.min_lat
            && location.lat <= self.max_lat
            && location.lon >= self.min_lon
            && location.lon <= self.max_lon
    }

    pub fn delta_lat(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn delta_lon(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn delta_lat_radians(&self) -> f64 {
        self.delta_lat().to_radians()
    }

    pub fn delta_lon_radians(&self) -> f64 {
        self.delta_lon().to_radians()
    }

    pub fn centroid(&self) -> LatLon {
        LatLon::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Corners in order south-west, south-east, north-east, north-west.
    pub fn corners(&self) -> [LatLon; 4] {
        [
            LatLon::new(self.min_lat, self.min_lon),
            LatLon::new(self.min_lat, self.max_lon),
            LatLon::new(self.max_lat, self.max_lon),
            LatLon::new(self.max_lat, self.min_lon),
        ]
    }

    /// Corners plus edge midpoints and the centroid, a 3x3 sample grid.
    pub fn sample_points(&self) -> [LatLon; 9] {
        let mid_lat = (self.min_lat + self.max_lat) / 2.0;
        let mid_lon = (self.min_lon + self.max_lon) / 2.0;
        [
            LatLon::new(self.min_lat, self.min_lon),
            LatLon::new(self.min_lat, mid_lon),
            LatLon::new(self.min_lat, self.max_lon),
            LatLon::new(mid_lat, self.min_lon),
            LatLon::new(mid_lat, mid_lon),
            LatLon::new(mid_lat, self.max_lon),
            LatLon::new(self.max_lat, self.min_lon),
            LatLon::new(self.max_lat, mid_lon),
            LatLon::new(self.max_lat, self.max_lon),
        ]
    }

    /// Quadrants split at the centroid: south-west, south-east, north-west, north-east.
    pub fn subdivide(&self) -> [Sector; 4] {
        let c = self.centroid();
        [
            Sector::new(self.min_lat, c.lat, self.min_lon, c.lon),
            Sector::new(self.min_lat, c.lat, c.lon, self.max_lon),
            Sector::new(c.lat, self.max_lat, self.min_lon, c.lon),
            Sector::new(c.lat, self.max_lat, c.lon, self.max_lon),
        ]
    }

    /// Copy with every edge clamped to valid latitude and longitude ranges.
    pub fn clamped(&self) -> Sector {
        Sector::new(
            clamp_lat(self.min_lat),
            clamp_lat(self.max_lat),
            clamp_lon(self.min_lon),
            clamp_lon(self.max_lon),
        )
    }

    /// Translate longitudes by `offset` degrees.
    pub fn shifted_lon(&self, offset: f64) -> Sector {
        Sector::new(self.min_lat, self.max_lat, self.min_lon + offset, self.max_lon + offset)
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}] x [{:.4}, {:.4}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}
