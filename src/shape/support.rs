//! Sector and location assembly shared by every surface shape.

use crate::error::{Error, Result};
use crate::geo::{
    great_arc_extreme_latitudes, locations_cross_dateline, sign, LatLon, PathType, Sector,
};
use crate::render::Region;

/// Bounding sectors of a location list: one sector, or an eastern and a
/// western sector when consecutive locations jump across ±180°.
///
/// Great circle edges can bulge past their endpoints' latitudes, so for that
/// path type the latitude range is widened to the arcs' extremes.
pub fn compute_bounding_sectors(locations: &[LatLon], path_type: PathType) -> Vec<Sector> {
    if locations.is_empty() {
        return Vec::new();
    }

    let mut sectors = if locations_cross_dateline(locations) {
        Sector::split_bounding(locations)
    } else {
        Sector::bounding(locations).into_iter().collect()
    };

    if path_type == PathType::GreatCircle {
        if let Some((min_lat, max_lat)) = great_arc_extreme_latitudes(locations) {
            for sector in &mut sectors {
                sector.min_lat = sector.min_lat.min(min_lat).max(-90.0);
                sector.max_lat = sector.max_lat.max(max_lat).min(90.0);
            }
        }
    }

    sectors
}

/// Pad each sector by half of `line_width` texels so wide outlines are not
/// clipped at tile edges.
///
/// A sector whose corners straddle the antimeridian is padded inward in
/// longitude so the padding never reaches across the seam.
pub fn adjust_sectors_by_border_width(
    sectors: &[Sector],
    line_width: f64,
    texel_size: f64,
) -> Result<Vec<Sector>> {
    if !(line_width >= 0.0) {
        return Err(Error::InvalidLineWidth(line_width));
    }

    let pad = (texel_size * line_width / 2.0).to_degrees();
    Ok(sectors
        .iter()
        .map(|sector| {
            let (min_lon, max_lon) = if locations_cross_dateline(&sector.corners()) {
                (sector.min_lon + pad, sector.max_lon - pad)
            } else {
                (sector.min_lon - pad, sector.max_lon + pad)
            };
            Sector::new(sector.min_lat - pad, sector.max_lat + pad, min_lon, max_lon).clamped()
        })
        .collect())
}

/// Densify a location list along `path_type`.
///
/// Each edge receives `ceil(clamp(intervals_per_degree * length, min, max))`
/// evenly spaced interior points, but only when that count exceeds one.
/// Linear paths are left alone because the rasterizer already interpolates
/// straight lines in lat/lon. With `close_path`, an open list is closed by
/// densifying the edge from the last location back to the first and
/// repeating the first.
pub fn generate_intermediate_locations(
    locations: &[LatLon],
    path_type: PathType,
    intervals_per_degree: f64,
    min_intervals: u32,
    max_intervals: u32,
    close_path: bool,
) -> Vec<LatLon> {
    let mut out = Vec::with_capacity(locations.len());
    let mut previous: Option<LatLon> = None;

    for &location in locations {
        if let Some(prev) = previous {
            add_intermediate_locations(
                prev,
                location,
                path_type,
                intervals_per_degree,
                min_intervals,
                max_intervals,
                &mut out,
            );
        }
        out.push(location);
        previous = Some(location);
    }

    if close_path {
        if let (Some(&first), Some(last)) = (locations.first(), previous) {
            if first != last {
                add_intermediate_locations(
                    last,
                    first,
                    path_type,
                    intervals_per_degree,
                    min_intervals,
                    max_intervals,
                    &mut out,
                );
                out.push(first);
            }
        }
    }

    out
}

fn add_intermediate_locations(
    a: LatLon,
    b: LatLon,
    path_type: PathType,
    intervals_per_degree: f64,
    min_intervals: u32,
    max_intervals: u32,
    out: &mut Vec<LatLon>,
) {
    let (length, azimuth) = match path_type {
        PathType::GreatCircle => (a.great_circle_distance(b), a.great_circle_azimuth(b)),
        PathType::RhumbLine => (a.rhumb_distance(b), a.rhumb_azimuth(b)),
        PathType::Linear => return,
    };

    let intervals = (intervals_per_degree * length.to_degrees())
        .clamp(min_intervals as f64, max_intervals.max(min_intervals) as f64)
        .ceil() as u32;
    if intervals <= 1 {
        return;
    }

    let step = length / (intervals + 1) as f64;
    for i in 1..=intervals {
        let distance = i as f64 * step;
        out.push(match path_type {
            PathType::RhumbLine => a.rhumb_end_position(azimuth, distance),
            _ => a.great_circle_end_position(azimuth, distance),
        });
    }
}

/// Edge intervals per degree that keep one interval every
/// `texels_per_edge_interval` texels when drawing `sector` into `region`.
pub fn edge_intervals_per_degree(sector: &Sector, region: Region, texels_per_edge_interval: f64) -> f64 {
    let d_lon = sector.delta_lon();
    let d_lat = sector.delta_lat();
    if d_lon <= 0.0 || d_lat <= 0.0 || texels_per_edge_interval <= 0.0 {
        return 0.0;
    }
    let texels_per_degree = (region.width / d_lon).max(region.height / d_lat);
    texels_per_degree / texels_per_edge_interval
}

/// Bring a sector whose longitudes run past ±180° back into range: one
/// sector if it already fits, two sectors split at the seam, or a single
/// full-longitude sector when both ends overflow or the halves overlap.
pub fn compute_normalized_sectors(sector: &Sector) -> Vec<Sector> {
    let min_lat = sector.min_lat.max(-90.0);
    let max_lat = sector.max_lat.min(90.0);
    let mut min_lon = sector.min_lon;
    let mut max_lon = sector.max_lon;

    if min_lon >= -180.0 && max_lon <= 180.0 {
        return vec![Sector::new(min_lat, max_lat, min_lon, max_lon)];
    }
    if min_lon < -180.0 && max_lon > 180.0 {
        return vec![Sector::new(min_lat, max_lat, -180.0, 180.0)];
    }

    while min_lon < -180.0 {
        min_lon += 360.0;
    }
    while max_lon > 180.0 {
        max_lon -= 360.0;
    }

    if min_lon > max_lon {
        vec![
            Sector::new(min_lat, max_lat, min_lon, 180.0),
            Sector::new(min_lat, max_lat, -180.0, max_lon),
        ]
    } else {
        vec![Sector::new(min_lat, max_lat, -180.0, 180.0)]
    }
}

/// Longitude shift (0 or ±360) that moves `location` onto the same side of
/// the antimeridian as the centroid of `sector`.
pub fn compute_hemisphere_offset(sector: &Sector, location: LatLon) -> f64 {
    let sector_lon = sector.centroid().lon;
    let location_lon = location.lon;
    if (location_lon - sector_lon).abs() > 180.0 && sign(location_lon) != sign(sector_lon) {
        360.0 * sign(sector_lon)
    } else {
        0.0
    }
}
