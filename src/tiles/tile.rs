use super::level::Level;
use crate::geo::{LatLon, Sector};

/// Row and column of the single pick tile, outside any real tile grid.
pub const PICK_TILE_ROW: i32 = -1;
pub const PICK_TILE_COL: i32 = -1;

/// Identity of a tile. The dimension is part of the key so tiles of level
/// sets built for different texture sizes never alias.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub level: u32,
    pub row: i32,
    pub col: i32,
    pub dimension: u32,
}

impl TileKey {
    pub const fn new(level: u32, row: i32, col: i32, dimension: u32) -> Self {
        Self {
            level,
            row,
            col,
            dimension,
        }
    }

    pub fn pick(level: &Level) -> Self {
        Self::new(level.number, PICK_TILE_ROW, PICK_TILE_COL, level.dimension)
    }

    pub fn is_pick_tile(&self) -> bool {
        self.row == PICK_TILE_ROW && self.col == PICK_TILE_COL
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}/{}/{}@{}", self.level, self.row, self.col, self.dimension)
    }
}

/// A cell of the quadtree. Cheap to copy; textures live in the texture cache.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    pub key: TileKey,
    pub sector: Sector,
}

impl Tile {
    /// Tile at `row`, `col` of `level`, its sector derived from the origin.
    pub fn at(level: &Level, row: i32, col: i32, origin: LatLon) -> Self {
        let min_lat = row_latitude(row, level.tile_delta, origin.lat);
        let min_lon = col_longitude(col, level.tile_delta, origin.lon);
        Self {
            key: TileKey::new(level.number, row, col, level.dimension),
            sector: Sector::new(min_lat, min_lat + level.tile_delta, min_lon, min_lon + level.tile_delta),
        }
    }

    /// The pick tile takes over the sector of whichever tile is under the
    /// cursor.
    pub fn pick(level: &Level, sector: Sector) -> Self {
        Self {
            key: TileKey::pick(level),
            sector,
        }
    }

    /// The four tiles of `next` covering this one: south-west, south-east,
    /// north-west, north-east.
    pub fn child_keys(&self, next: &Level) -> [(i32, i32); 4] {
        let (row, col) = (self.key.row * 2, self.key.col * 2);
        debug_assert_eq!(next.number, self.key.level + 1);
        [(row, col), (row, col + 1), (row + 1, col), (row + 1, col + 1)]
    }

    pub fn children(&self, next: &Level, origin: LatLon) -> [Tile; 4] {
        self.child_keys(next).map(|(row, col)| Tile::at(next, row, col, origin))
    }

    /// Angular size of one texel of this tile, radians.
    pub fn texel_size(&self) -> f64 {
        self.sector.delta_lat_radians() / self.key.dimension.max(1) as f64
    }
}

/// Row of the tile containing `lat`. The northern edge belongs to the last row.
pub fn compute_row(delta: f64, lat: f64, origin_lat: f64) -> i32 {
    let offset = lat - origin_lat;
    let row = (offset / delta) as i32;
    if offset == 180.0 {
        row - 1
    } else {
        row
    }
}

/// Column of the tile containing `lon`. The eastern edge belongs to the last
/// column.
pub fn compute_col(delta: f64, lon: f64, origin_lon: f64) -> i32 {
    let offset = lon - origin_lon;
    let col = (offset / delta) as i32;
    if offset == 360.0 {
        col - 1
    } else {
        col
    }
}

pub fn row_latitude(row: i32, delta: f64, origin_lat: f64) -> f64 {
    origin_lat + row as f64 * delta
}

pub fn col_longitude(col: i32, delta: f64, origin_lon: f64) -> f64 {
    origin_lon + col as f64 * delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::level::{LevelSet, TILE_ORIGIN};

    #[test]
    fn test_row_col_edges() {
        assert_eq!(compute_row(36.0, -90.0, -90.0), 0);
        assert_eq!(compute_row(36.0, 90.0, -90.0), 4);
        assert_eq!(compute_row(36.0, 0.0, -90.0), 2);
        assert_eq!(compute_col(36.0, -180.0, -180.0), 0);
        assert_eq!(compute_col(36.0, 180.0, -180.0), 9);
        assert_eq!(compute_col(36.0, 0.0, -180.0), 5);
    }

    #[test]
    fn test_tile_sector_from_row_col() {
        let set = LevelSet::new(36.0, 3, 64).expect("valid");
        let tile = Tile::at(set.first_level(), 2, 5, TILE_ORIGIN);
        assert_eq!(tile.sector, Sector::new(-18.0, 18.0, 0.0, 36.0));
        assert_eq!(tile.key, TileKey::new(0, 2, 5, 64));
    }

    #[test]
    fn test_children_tile_parent_exactly() {
        let set = LevelSet::new(36.0, 3, 64).expect("valid");
        let parent = Tile::at(set.first_level(), 2, 5, TILE_ORIGIN);
        let next = set.level(1).expect("level 1");
        let children = parent.children(next, TILE_ORIGIN);
        assert_eq!(children.map(|c| c.sector), parent.sector.subdivide());
        assert_eq!(children[3].key, TileKey::new(1, 5, 11, 64));
    }

    #[test]
    fn test_pick_tile_key() {
        let set = LevelSet::new(36.0, 3, 64).expect("valid");
        let pick = Tile::pick(set.first_level(), Sector::new(0.0, 36.0, 0.0, 36.0));
        assert!(pick.key.is_pick_tile());
        assert!((pick.texel_size() - 36f64.to_radians() / 64.0).abs() < 1e-15);
    }
}
