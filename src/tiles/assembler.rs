//! Quadtree descent: which tiles, at which level, cover the surface objects
//! visible this frame.

use glam::DVec3;

use super::index::{ObjectGrid, DEFAULT_CELL_SIZE};
use super::level::{Level, LevelSet};
use super::tile::{compute_col, compute_row, Tile, TileKey};
use crate::cache::LruCache;
use crate::geo::{LatLon, Sector};
use crate::object::{object_id, SharedObject};
use crate::render::DrawContext;
use crate::view::{Extent, Globe};

/// A surface object taking part in this frame, with its sectors at the
/// first level's texel size.
pub(crate) struct CollectedObject {
    pub object: SharedObject,
    pub id: usize,
    pub first_level_sectors: Vec<Sector>,
}

impl CollectedObject {
    /// Exact test at `texel_size`; padding differs per level, so the object
    /// is queried again rather than reusing the first-level sectors.
    pub fn intersects(&self, globe: &Globe, texel_size: f64, sector: &Sector) -> bool {
        self.object
            .sectors(globe, texel_size)
            .is_some_and(|sectors| sector.intersects_any(&sectors))
    }
}

/// Everything collected for one frame: the contributing objects, an index
/// over their sectors and the union of those sectors.
pub(crate) struct FrameObjects {
    pub objects: Vec<CollectedObject>,
    pub grid: ObjectGrid,
    pub bounds: Sector,
}

impl FrameObjects {
    /// Query every visible object at the first level's texel size. `None`
    /// when nothing contributes geometry.
    pub fn collect(objects: &[SharedObject], globe: &Globe, levels: &LevelSet) -> Option<Self> {
        let texel_size = levels.first_level().texel_size;
        let collected: Vec<CollectedObject> = objects
            .iter()
            .filter(|object| object.is_visible())
            .filter_map(|object| {
                let sectors = object.sectors(globe, texel_size)?;
                Some(CollectedObject {
                    object: SharedObject::clone(object),
                    id: object_id(object),
                    first_level_sectors: sectors,
                })
            })
            .collect();

        let bounds = Sector::union_all(collected.iter().flat_map(|c| c.first_level_sectors.iter()))?;
        let grid = ObjectGrid::build(
            collected
                .iter()
                .enumerate()
                .flat_map(|(idx, c)| c.first_level_sectors.iter().map(move |s| (idx, s))),
            DEFAULT_CELL_SIZE,
        );
        log::debug!("collected {} of {} surface objects, bounds {}", collected.len(), objects.len(), bounds);
        Some(Self {
            objects: collected,
            grid,
            bounds,
        })
    }

    /// Indices of objects intersecting `sector` at `texel_size`, in the
    /// order the objects were given.
    pub fn intersecting(&self, globe: &Globe, texel_size: f64, sector: &Sector) -> Vec<usize> {
        let mut candidates = self.grid.candidates(sector);
        candidates.retain(|&idx| self.objects[idx].intersects(globe, texel_size, sector));
        candidates
    }

    pub fn any_intersecting(&self, globe: &Globe, texel_size: f64, sector: &Sector) -> bool {
        self.grid
            .candidates(sector)
            .into_iter()
            .any(|idx| self.objects[idx].intersects(globe, texel_size, sector))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

/// Walks the quadtree for one frame.
pub(crate) struct TileAssembler<'a> {
    dc: &'a DrawContext,
    levels: &'a LevelSet,
    scene: &'a FrameObjects,
    texel_to_pixel_ratio: f64,
    globe: Globe,
}

impl<'a> TileAssembler<'a> {
    pub fn new(dc: &'a DrawContext, levels: &'a LevelSet, scene: &'a FrameObjects, texel_to_pixel_ratio: f64) -> Self {
        Self {
            dc,
            levels,
            scene,
            texel_to_pixel_ratio,
            globe: dc.globe(),
        }
    }

    /// Tiles to draw this frame, coarsest that meet the texel/pixel ratio.
    pub fn assemble(&self, memo: &mut LruCache<TileKey, Tile>) -> Vec<Tile> {
        let mut tiles = Vec::new();
        for tile in self.top_level_tiles(memo) {
            self.add_tile_or_descendants(tile, memo, &mut tiles);
        }
        log::debug!("assembled {} tiles", tiles.len());
        tiles
    }

    /// Level-zero tiles covering the bounds. Works from the bounds' corners,
    /// so a point-sized bounds still seeds one tile.
    fn top_level_tiles(&self, memo: &mut LruCache<TileKey, Tile>) -> Vec<Tile> {
        let level = self.levels.first_level();
        let origin = self.levels.origin();
        let bounds = &self.scene.bounds;
        let delta = level.tile_delta;

        let first_row = compute_row(delta, bounds.min_lat, origin.lat);
        let last_row = compute_row(delta, bounds.max_lat, origin.lat);
        let first_col = compute_col(delta, bounds.min_lon, origin.lon);
        let last_col = compute_col(delta, bounds.max_lon, origin.lon);

        let mut tiles = Vec::with_capacity(((last_row - first_row + 1) * (last_col - first_col + 1)).max(0) as usize);
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                tiles.push(memoized(memo, level, row, col, origin));
            }
        }
        tiles
    }

    fn add_tile_or_descendants(&self, tile: Tile, memo: &mut LruCache<TileKey, Tile>, out: &mut Vec<Tile>) {
        if !self.is_tile_visible(&tile) {
            log::trace!("tile {} not visible", tile.key);
            return;
        }
        if !self.is_tile_needed(&tile) {
            log::trace!("tile {} not needed", tile.key);
            return;
        }
        if self.meets_render_criteria(&tile) {
            log::trace!("tile {} accepted", tile.key);
            out.push(tile);
            return;
        }

        let Some(next) = self.levels.level(tile.key.level + 1) else {
            out.push(tile);
            return;
        };
        let origin = self.levels.origin();
        for (row, col) in tile.child_keys(next) {
            let child = memoized(memo, next, row, col, origin);
            self.add_tile_or_descendants(child, memo, out);
        }
    }

    fn is_tile_visible(&self, tile: &Tile) -> bool {
        if let Some(visible) = self.dc.visible_sector() {
            if !visible.intersects(&tile.sector) {
                return false;
            }
        }
        let extent = Extent::from_sector(&self.globe, &tile.sector);
        self.dc.view().frustum().intersects(&extent)
    }

    fn is_tile_needed(&self, tile: &Tile) -> bool {
        if !tile.sector.intersects(&self.scene.bounds) {
            return false;
        }
        let texel_size = self
            .levels
            .level(tile.key.level)
            .map_or_else(|| tile.texel_size(), |level| level.texel_size);
        self.scene.any_intersecting(&self.globe, texel_size, &tile.sector)
    }

    fn meets_render_criteria(&self, tile: &Tile) -> bool {
        self.levels.is_final_level(tile.key.level) || !self.needs_subdivide(&tile.sector, tile.key.dimension)
    }

    /// Subdivide while a tile texel would cover more than the configured
    /// number of screen pixels at the tile's point nearest the eye.
    fn needs_subdivide(&self, sector: &Sector, height: u32) -> bool {
        let view = self.dc.view();
        let nearest = nearest_point_in_sector(self.dc, sector);
        let texel_size = nearest.length() * sector.delta_lat_radians() / height.max(1) as f64;
        let distance = view.eye_point().distance(nearest);
        let pixel_size = view.pixel_size_at_distance(distance);
        texel_size / pixel_size > self.texel_to_pixel_ratio
    }
}

fn memoized(memo: &mut LruCache<TileKey, Tile>, level: &Level, row: i32, col: i32, origin: LatLon) -> Tile {
    let key = TileKey::new(level.number, row, col, level.dimension);
    if let Some(tile) = memo.get(&key) {
        return *tile;
    }
    let tile = Tile::at(level, row, col, origin);
    memo.put(key, tile);
    tile
}

/// Surface point of `sector` nearest the eye: under the eye when the sector
/// contains it, otherwise the corner at the smallest great-circle distance.
pub(crate) fn nearest_point_in_sector(dc: &DrawContext, sector: &Sector) -> DVec3 {
    let eye = dc.view().eye_position();
    if sector.contains(eye) {
        return dc.surface_point(eye);
    }
    let nearest = sector
        .corners()
        .into_iter()
        .min_by(|a, b| a.great_circle_distance(eye).total_cmp(&b.great_circle_distance(eye)))
        .unwrap_or_else(|| sector.centroid());
    dc.surface_point(nearest)
}

/// The pick tile for this frame: the assembled tile under the terrain
/// position at the pick point.
pub(crate) fn pick_tile(dc: &DrawContext, levels: &LevelSet, tiles: &[Tile]) -> Option<Tile> {
    let point = dc.pick_point()?;
    let (position, _) = dc.pick_terrain_position(point)?;
    let under = tiles.iter().find(|tile| tile.sector.contains(position))?;
    log::trace!("pick tile over {} at {:?}", under.key, position);
    Some(Tile::pick(levels.first_level(), under.sector))
}
