use std::collections::hash_map::Entry;
use std::collections::HashMap;

use glam::DVec2;

use super::assembler::{self, FrameObjects, TileAssembler};
use super::level::LevelSet;
use super::tile::{Tile, TileKey};
use super::updater::{TileContentState, TileUpdater};
use super::{FrameStats, RendererConfig};
use crate::cache::LruCache;
use crate::error::{Error, Result};
use crate::object::SharedObject;
use crate::render::{Color, DrawContext, FrameKind, PickSupport, PickedObject, TextureKey};

/// Color of the per-tile outline drawn when tile outlines are on.
pub const TILE_OUTLINE_COLOR: Color = Color::CYAN;

/// Largest power of two not above `value`; zero stays zero.
#[inline(always)]
fn power_of_two_floor(value: u32) -> u32 {
    if value == 0 {
        0
    } else {
        1 << (31 - value.leading_zeros())
    }
}

/// Draws a collection of surface objects as view-adaptive texture tiles.
///
/// Call [`pre_render`](Self::pre_render) once per frame, then
/// [`render`](Self::render) and optionally [`pick`](Self::pick). Tiles whose
/// objects have not changed keep their textures between frames.
pub struct TiledSurfaceRenderer {
    config: RendererConfig,
    objects: Vec<SharedObject>,
    cache_id: Option<u64>,
    level_sets: HashMap<u32, LevelSet>,
    tile_memo: LruCache<TileKey, Tile>,
    tile_states: LruCache<TileKey, TileContentState>,
    current_tiles: Vec<Tile>,
    current_pick_tile: Option<Tile>,
    pick_support: PickSupport,
    stats: FrameStats,
}

impl Default for TiledSurfaceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TiledSurfaceRenderer {
    pub fn new() -> Self {
        Self::from_valid_config(RendererConfig::default())
    }

    pub fn with_config(config: RendererConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RendererConfig) -> Self {
        let capacity = config.tile_cache_capacity;
        Self {
            config,
            objects: Vec::new(),
            cache_id: None,
            level_sets: HashMap::new(),
            tile_memo: LruCache::new(capacity),
            tile_states: LruCache::new(capacity),
            current_tiles: Vec::new(),
            current_pick_tile: None,
            pick_support: PickSupport::new(),
            stats: FrameStats::default(),
        }
    }

    /// Replace the objects to draw. Order is draw order.
    pub fn set_surface_objects(&mut self, objects: Vec<SharedObject>) {
        self.objects = objects;
    }

    pub fn surface_objects(&self) -> &[SharedObject] {
        &self.objects
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Id namespacing this renderer's textures; assigned on first use.
    pub fn cache_id(&self) -> Option<u64> {
        self.cache_id
    }

    pub fn current_tiles(&self) -> &[Tile] {
        &self.current_tiles
    }

    pub fn pick_tile(&self) -> Option<&Tile> {
        self.current_pick_tile.as_ref()
    }

    pub fn set_texel_to_pixel_ratio(&mut self, ratio: f64) -> Result<()> {
        if !(ratio > 0.0 && ratio.is_finite()) {
            return Err(Error::InvalidTexelRatio(ratio));
        }
        self.config.texel_to_pixel_ratio = ratio;
        Ok(())
    }

    pub fn set_tile_size(&mut self, size: u32) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidTileSize);
        }
        self.config.tile_size = size;
        Ok(())
    }

    pub fn set_tile_background(&mut self, color: Color) {
        if self.config.tile_background != color {
            self.config.tile_background = color;
            self.invalidate_tiles();
        }
    }

    pub fn set_use_mipmaps(&mut self, use_mipmaps: bool) {
        if self.config.use_mipmaps != use_mipmaps {
            self.config.use_mipmaps = use_mipmaps;
            self.invalidate_tiles();
        }
    }

    pub fn set_draw_bounding_sectors(&mut self, draw: bool) {
        if self.config.draw_bounding_sectors != draw {
            self.config.draw_bounding_sectors = draw;
            self.invalidate_tiles();
        }
    }

    pub fn set_show_tile_outlines(&mut self, show: bool) {
        self.config.show_tile_outlines = show;
    }

    pub fn set_pick_enabled(&mut self, enabled: bool) {
        self.config.pick_enabled = enabled;
    }

    /// Settings baked into tile textures changed; rebuild everything.
    fn invalidate_tiles(&mut self) {
        self.tile_states.clear();
    }

    /// Tile edge for this frame and whether the backend limit reduced it.
    fn tile_dimension(&self, dc: &DrawContext) -> (u32, bool) {
        let viewport = dc.view().viewport();
        let preferred = self.config.tile_size.min(viewport.width).min(viewport.height);
        let max = dc.backend().max_texture_size();
        if preferred > max {
            (power_of_two_floor(max), true)
        } else {
            (power_of_two_floor(preferred), false)
        }
    }

    /// Assemble this frame's tiles and rebuild the stale ones.
    pub fn pre_render(&mut self, dc: &mut DrawContext) {
        self.current_tiles.clear();
        self.current_pick_tile = None;
        self.pick_support.clear();
        self.stats = FrameStats::default();

        if self.objects.is_empty() || dc.view().viewport().is_empty() {
            return;
        }
        let (dimension, clamped) = self.tile_dimension(dc);
        if dimension == 0 {
            return;
        }
        let cache_id = *self.cache_id.get_or_insert_with(|| dc.next_cache_id());

        let levels = match self.level_sets.entry(dimension) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if clamped {
                    log::warn!(
                        "tile size {} exceeds the backend limit; using {}px tiles",
                        self.config.tile_size,
                        dimension
                    );
                }
                match LevelSet::new(self.config.level_zero_tile_delta, self.config.num_levels, dimension) {
                    Ok(levels) => entry.insert(levels),
                    Err(err) => {
                        log::warn!("no level set for {}px tiles: {}", dimension, err);
                        return;
                    }
                }
            }
        };

        let Some(scene) = FrameObjects::collect(&self.objects, &dc.globe(), levels) else {
            return;
        };
        self.stats.object_count = scene.len();

        let tiles =
            TileAssembler::new(dc, levels, &scene, self.config.texel_to_pixel_ratio).assemble(&mut self.tile_memo);
        self.current_pick_tile = if self.config.pick_enabled {
            assembler::pick_tile(dc, levels, &tiles)
        } else {
            None
        };

        let updater = TileUpdater {
            config: &self.config,
            cache_id,
            levels,
            scene: &scene,
        };
        let rebuilt = updater.update_tiles(dc, &tiles, &mut self.tile_states);
        if let Some(pick_tile) = &self.current_pick_tile {
            updater.update_pick_tile(dc, pick_tile, &mut self.pick_support);
            self.stats.pick_tile_rebuilt = true;
        }

        self.stats.max_level = tiles.iter().map(|tile| tile.key.level).max();
        self.stats.tiles = tiles.iter().map(|tile| tile.key).collect();
        self.stats.rebuilt = rebuilt;
        self.current_tiles = tiles;
    }

    /// Drape the current tiles onto the display frame.
    pub fn render(&self, dc: &mut DrawContext) {
        let Some(cache_id) = self.cache_id else {
            return;
        };
        if self.objects.is_empty() {
            return;
        }
        let outline = self.config.show_tile_outlines.then_some(TILE_OUTLINE_COLOR);
        for tile in &self.current_tiles {
            let key = TextureKey::Tile { cache_id, tile: tile.key };
            if !dc.composite_tile(FrameKind::Display, &tile.sector, &key, outline) {
                log::warn!("tile {} texture evicted before it was drawn", tile.key);
            }
        }
    }

    /// Resolve the object under `point` from the pick tile drawn in
    /// `pre_render`. The hit, with its terrain position and `layer`, is also
    /// recorded on the context.
    pub fn pick(&mut self, dc: &mut DrawContext, point: DVec2, layer: Option<&str>) -> Option<PickedObject> {
        if self.objects.is_empty() || !self.config.pick_enabled {
            return None;
        }
        let picked = self.resolve_pick(dc, point, layer);
        self.pick_support.clear();
        picked
    }

    fn resolve_pick(&self, dc: &mut DrawContext, point: DVec2, layer: Option<&str>) -> Option<PickedObject> {
        let tile = self.current_pick_tile?;
        let cache_id = self.cache_id?;

        let clear_color = dc.pick_clear_color();
        dc.clear_frame(FrameKind::Pick, clear_color);
        if !dc.composite_tile(FrameKind::Pick, &tile.sector, &TextureKey::PickTile { cache_id }, None) {
            log::warn!("pick tile texture is not resident");
            return None;
        }

        let color = dc.read_pixel(FrameKind::Pick, point.x.floor() as i32, point.y.floor() as i32)?;
        if color.a == 0 {
            return None;
        }
        let object = self.pick_support.resolve(color)?;
        let position = dc.pick_terrain_position(point).map(|(location, _)| location);
        let picked = PickedObject {
            color,
            object,
            position,
            layer: layer.map(str::to_owned),
            on_top: true,
        };
        log::debug!("picked {:?}", picked);
        dc.add_picked_object(picked.clone());
        Some(picked)
    }
}
