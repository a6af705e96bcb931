//! Visible-sector search: which parts of the globe can the view see?
//!
//! The sphere is swept at progressively finer cell sizes. Each completed pass
//! replaces the previous answer, and the sweep stops early once the deadline
//! passes. The first pass always runs to completion, so a result is always
//! available even with an expired budget.

use std::time::{Duration, Instant};

use super::{Extent, View};
use crate::geo::Sector;

/// Cell sizes in degrees, coarsest first.
pub const SEARCH_RESOLUTIONS: [f64; 4] = [36.0, 18.0, 9.0, 4.5];

/// Cells larger than this are kept on the frustum test alone; their sample
/// grid is too sparse for the horizon test to be safe.
const HORIZON_TEST_MIN_DEGREES: f64 = 9.0;

/// Cells of the finest resolution that completed before `deadline`.
pub fn compute_visible_sectors(view: &View, deadline: Option<Instant>) -> Vec<Sector> {
    let mut result = Vec::new();
    for (pass, &resolution) in SEARCH_RESOLUTIONS.iter().enumerate() {
        if pass > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
            log::debug!("visible sector search stopped at {resolution} degrees");
            break;
        }
        match search_pass(view, resolution, if pass == 0 { None } else { deadline }) {
            Some(cells) => result = cells,
            None => break,
        }
    }
    result
}

/// Single bounding sector of everything visible, searched within `budget`.
pub fn visible_sector(view: &View, budget: Option<Duration>) -> Option<Sector> {
    let deadline = budget.map(|b| Instant::now() + b);
    let cells = compute_visible_sectors(view, deadline);
    Sector::union_all(&cells)
}

/// One sweep at `resolution`. `None` when the deadline passed mid-sweep.
fn search_pass(view: &View, resolution: f64, deadline: Option<Instant>) -> Option<Vec<Sector>> {
    let rows = (180.0 / resolution).ceil() as usize;
    let cols = (360.0 / resolution).ceil() as usize;
    let mut cells = Vec::new();
    for row in 0..rows {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return None;
        }
        let min_lat = -90.0 + row as f64 * resolution;
        let max_lat = (min_lat + resolution).min(90.0);
        for col in 0..cols {
            let min_lon = -180.0 + col as f64 * resolution;
            let max_lon = (min_lon + resolution).min(180.0);
            let cell = Sector::new(min_lat, max_lat, min_lon, max_lon);
            if is_cell_visible(view, &cell, resolution) {
                cells.push(cell);
            }
        }
    }
    Some(cells)
}

fn is_cell_visible(view: &View, cell: &Sector, resolution: f64) -> bool {
    let globe = view.globe();
    if !view.frustum().intersects(&Extent::from_sector(globe, cell)) {
        return false;
    }
    if resolution > HORIZON_TEST_MIN_DEGREES {
        return true;
    }
    // A surface point faces the eye when eye . p >= r^2.
    let eye = view.eye_point();
    let r2 = globe.radius() * globe.radius();
    cell.sample_points()
        .iter()
        .any(|&ll| eye.dot(globe.compute_point(ll, 0.0)) >= r2)
}
