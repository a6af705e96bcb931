//! Tile content: deciding which tiles are stale and re-rendering them.

use std::sync::Arc;

use glam::DVec2;
use rayon::prelude::*;

use super::assembler::FrameObjects;
use super::level::LevelSet;
use super::tile::{Tile, TileKey};
use super::RendererConfig;
use crate::cache::LruCache;
use crate::geo::Sector;
use crate::object::{SharedObject, Timestamp};
use crate::render::{
    Color, DrawContext, DrawMode, PickSupport, Region, RegionTransform, RenderToTexture, TextureFilter, TextureKey,
};
use crate::view::Globe;

/// What a tile's texture was last built from.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TileContentState {
    pub last_built: Timestamp,
    /// Identities of the objects drawn, sorted, compared as a set.
    pub object_ids: Vec<usize>,
}

/// Objects intersecting each tile, indexed like `tiles`. The work is
/// read-only, so tiles are processed in parallel.
pub(crate) fn intersecting_sets(
    globe: Globe,
    levels: &LevelSet,
    scene: &FrameObjects,
    tiles: &[Tile],
) -> Vec<Vec<usize>> {
    tiles
        .par_iter()
        .map(|tile| {
            let texel_size = levels
                .level(tile.key.level)
                .map_or_else(|| tile.texel_size(), |level| level.texel_size);
            scene.intersecting(&globe, texel_size, &tile.sector)
        })
        .collect()
}

fn sorted_ids(scene: &FrameObjects, indices: &[usize]) -> Vec<usize> {
    let mut ids: Vec<usize> = indices.iter().map(|&idx| scene.objects[idx].id).collect();
    ids.sort_unstable();
    ids
}

/// A tile needs no rebuild when its object set is unchanged, none of those
/// objects changed since the last build and its texture is still resident.
pub(crate) fn is_tile_current(
    previous: Option<&TileContentState>,
    scene: &FrameObjects,
    indices: &[usize],
    texture_resident: bool,
) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    if previous.object_ids != sorted_ids(scene, indices) {
        return false;
    }
    if indices
        .iter()
        .any(|&idx| scene.objects[idx].object.last_modified() > previous.last_built)
    {
        return false;
    }
    texture_resident
}

/// Brings display tiles up to date. Returns the keys of rebuilt tiles.
pub(crate) struct TileUpdater<'a> {
    pub config: &'a RendererConfig,
    pub cache_id: u64,
    pub levels: &'a LevelSet,
    pub scene: &'a FrameObjects,
}

impl TileUpdater<'_> {
    pub fn texture_key(&self, tile: &Tile) -> TextureKey {
        TextureKey::Tile {
            cache_id: self.cache_id,
            tile: tile.key,
        }
    }

    pub fn update_tiles(
        &self,
        dc: &mut DrawContext,
        tiles: &[Tile],
        states: &mut LruCache<TileKey, TileContentState>,
    ) -> Vec<TileKey> {
        let sets = intersecting_sets(dc.globe(), self.levels, self.scene, tiles);
        let mut rebuilt = Vec::new();
        for (tile, indices) in tiles.iter().zip(&sets) {
            let resident = dc.textures().contains(&self.texture_key(tile));
            if is_tile_current(states.get(&tile.key), self.scene, indices, resident) {
                continue;
            }
            self.update_tile_data(dc, tile, indices);
            states.put(
                tile.key,
                TileContentState {
                    last_built: Timestamp::now(),
                    object_ids: sorted_ids(self.scene, indices),
                },
            );
            rebuilt.push(tile.key);
        }
        if !rebuilt.is_empty() {
            log::debug!("rebuilt {} of {} tiles", rebuilt.len(), tiles.len());
        }
        rebuilt
    }

    fn update_tile_data(&self, dc: &mut DrawContext, tile: &Tile, indices: &[usize]) {
        let dimension = tile.key.dimension;
        let region = Region::full(dimension, dimension);
        let mut rt = RenderToTexture::begin(
            dc,
            self.texture_key(tile),
            dimension,
            dimension,
            TextureFilter::Linear,
            self.config.use_mipmaps,
            self.config.tile_background,
        );
        for &idx in indices {
            self.scene.objects[idx].object.render_to_region(&mut rt, &tile.sector, region);
        }
        if self.config.draw_bounding_sectors {
            let objects = indices.iter().map(|&idx| &self.scene.objects[idx].object);
            render_bounding_sectors(&mut rt, objects, &tile.sector, region);
        }
    }

    /// Redraw the pick tile in pick colors, registering each object's color
    /// with `pick_support`. Runs every frame.
    pub fn update_pick_tile(&self, dc: &mut DrawContext, tile: &Tile, pick_support: &mut PickSupport) {
        let dimension = tile.key.dimension;
        let region = Region::full(dimension, dimension);
        let texel_size = tile.texel_size();
        let globe = dc.globe();
        let indices = self.scene.intersecting(&globe, texel_size, &tile.sector);

        let clear_color = dc.pick_clear_color();
        let key = TextureKey::PickTile { cache_id: self.cache_id };
        let mut rt = RenderToTexture::begin(dc, key, dimension, dimension, TextureFilter::Nearest, false, clear_color);
        let was_picking = rt.is_picking_mode();
        let previous_color = rt.current_pick_color();
        rt.set_picking_mode(true);
        for idx in indices {
            let object = &self.scene.objects[idx].object;
            let color = rt.unique_pick_color();
            rt.set_current_pick_color(color);
            pick_support.add(color, Arc::clone(object));
            object.render_to_region(&mut rt, &tile.sector, region);
        }
        rt.set_current_pick_color(previous_color);
        rt.set_picking_mode(was_picking);
        log::trace!("pick tile drawn with {} candidates", pick_support.len());
    }
}

/// Diagnostic overlay: a green rectangle around every sector of each object,
/// at this tile's texel size.
pub(crate) fn render_bounding_sectors<'o>(
    dc: &mut DrawContext,
    objects: impl IntoIterator<Item = &'o SharedObject>,
    sector: &Sector,
    region: Region,
) {
    let Some(transform) = RegionTransform::new(*sector, region) else {
        return;
    };
    let globe = dc.globe();
    let texel_size = sector.delta_lat_radians() / region.height;
    let was_picking = dc.is_picking_mode();
    dc.set_picking_mode(false);
    for object in objects {
        for s in object.sectors(&globe, texel_size).unwrap_or_default() {
            let rect: [DVec2; 4] = [
                transform.to_pixel(s.min_lon, s.min_lat),
                transform.to_pixel(s.max_lon, s.min_lat),
                transform.to_pixel(s.max_lon, s.max_lat),
                transform.to_pixel(s.min_lon, s.max_lat),
            ];
            dc.draw(DrawMode::LineLoop, &rect, Color::GREEN, 1.0);
        }
    }
    dc.set_picking_mode(was_picking);
}
