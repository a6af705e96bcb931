use std::collections::HashMap;

use crate::geo::Sector;

/// Default cell edge, degrees: a quarter of a level-zero tile.
pub const DEFAULT_CELL_SIZE: f64 = 9.0;

/// Spatial index over object sectors using conservative approximation.
/// Each object is recorded in every cell one of its sectors overlaps, so a
/// query never misses an object but may return some that do not intersect;
/// the caller follows up with the exact sector test.
pub struct ObjectGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl ObjectGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size: if cell_size > 0.0 { cell_size } else { DEFAULT_CELL_SIZE },
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from `(object index, sector)` pairs. An object may appear with
    /// several sectors.
    pub fn build<'a>(sectors: impl IntoIterator<Item = (usize, &'a Sector)>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, sector) in sectors {
            let min_cell = grid.to_cell(sector.min_lon, sector.min_lat);
            let max_cell = grid.to_cell(sector.max_lon, sector.max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    let cell = grid.cells.entry((x, y)).or_default();
                    if cell.last() != Some(&idx) {
                        cell.push(idx);
                    }
                }
            }
        }
        grid
    }

    /// Append object indices for cells overlapping `sector` into `results`.
    /// May contain duplicates; dedup after all queries.
    pub fn query_into(&self, sector: &Sector, results: &mut Vec<usize>) {
        let min_cell = self.to_cell(sector.min_lon, sector.min_lat);
        let max_cell = self.to_cell(sector.max_lon, sector.max_lat);
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
    }

    /// Candidate object indices for `sector`, ascending and unique.
    pub fn candidates(&self, sector: &Sector) -> Vec<usize> {
        let mut results = Vec::new();
        self.query_into(sector, &mut results);
        results.sort_unstable();
        results.dedup();
        results
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
