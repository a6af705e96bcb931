//! Tiled rendering of surface objects: a view-adaptive quadtree of offscreen
//! textures draped over the globe, rebuilt only when their content changes.

use crate::error::{Error, Result};
use crate::render::Color;

pub(crate) mod assembler;
pub mod index;
pub mod level;
pub mod renderer;
pub mod tile;
pub(crate) mod updater;

pub use index::ObjectGrid;
pub use level::{Level, LevelSet};
pub use renderer::TiledSurfaceRenderer;
pub use tile::{Tile, TileKey};

pub const DEFAULT_TEXEL_TO_PIXEL_RATIO: f64 = 1.5;
pub const DEFAULT_TILE_SIZE: u32 = 512;
pub const DEFAULT_LEVEL_ZERO_TILE_DELTA: f64 = 36.0;
pub const DEFAULT_NUM_LEVELS: u32 = 17;
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 4096;

/// Tiling and display settings of one renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    /// Subdivide while one tile texel covers more screen pixels than this.
    pub texel_to_pixel_ratio: f64,
    /// Preferred tile edge in pixels; the effective size is a power of two
    /// that fits the viewport and the backend.
    pub tile_size: u32,
    pub tile_background: Color,
    pub use_mipmaps: bool,
    /// Outline each object's sectors inside the tiles (diagnostic).
    pub draw_bounding_sectors: bool,
    /// Outline every tile on the globe (diagnostic).
    pub show_tile_outlines: bool,
    pub pick_enabled: bool,
    pub level_zero_tile_delta: f64,
    pub num_levels: u32,
    pub tile_cache_capacity: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            texel_to_pixel_ratio: DEFAULT_TEXEL_TO_PIXEL_RATIO,
            tile_size: DEFAULT_TILE_SIZE,
            tile_background: Color::TRANSPARENT,
            use_mipmaps: false,
            draw_bounding_sectors: false,
            show_tile_outlines: false,
            pick_enabled: true,
            level_zero_tile_delta: DEFAULT_LEVEL_ZERO_TILE_DELTA,
            num_levels: DEFAULT_NUM_LEVELS,
            tile_cache_capacity: DEFAULT_TILE_CACHE_CAPACITY,
        }
    }
}

impl RendererConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.texel_to_pixel_ratio > 0.0 && self.texel_to_pixel_ratio.is_finite()) {
            return Err(Error::InvalidTexelRatio(self.texel_to_pixel_ratio));
        }
        if self.tile_size == 0 {
            return Err(Error::InvalidTileSize);
        }
        if !(self.level_zero_tile_delta > 0.0 && self.level_zero_tile_delta <= 180.0) {
            return Err(Error::InvalidTileDelta(self.level_zero_tile_delta));
        }
        if self.num_levels == 0 {
            return Err(Error::InvalidLevelCount);
        }
        Ok(())
    }

    pub fn toggle_bounding_sectors(&mut self) {
        self.draw_bounding_sectors = !self.draw_bounding_sectors;
    }

    pub fn toggle_tile_outlines(&mut self) {
        self.show_tile_outlines = !self.show_tile_outlines;
    }

    pub fn toggle_picking(&mut self) {
        self.pick_enabled = !self.pick_enabled;
    }
}

/// What the last `pre_render` did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Objects that contributed geometry.
    pub object_count: usize,
    pub tiles: Vec<TileKey>,
    pub rebuilt: Vec<TileKey>,
    pub pick_tile_rebuilt: bool,
    pub max_level: Option<u32>,
}

impl FrameStats {
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn rebuilt_count(&self) -> usize {
        self.rebuilt.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.texel_to_pixel_ratio, 1.5);
        assert_eq!(config.tile_size, 512);
        assert_eq!(config.tile_background, Color::TRANSPARENT);
        assert!(!config.use_mipmaps);
        assert!(config.pick_enabled);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_ratio = RendererConfig {
            texel_to_pixel_ratio: -1.0,
            ..RendererConfig::default()
        };
        assert_eq!(bad_ratio.validate(), Err(Error::InvalidTexelRatio(-1.0)));

        let bad_size = RendererConfig {
            tile_size: 0,
            ..RendererConfig::default()
        };
        assert_eq!(bad_size.validate(), Err(Error::InvalidTileSize));

        let bad_levels = RendererConfig {
            num_levels: 0,
            ..RendererConfig::default()
        };
        assert_eq!(bad_levels.validate(), Err(Error::InvalidLevelCount));
    }

    #[test]
    fn test_toggles() {
        let mut config = RendererConfig::default();
        config.toggle_bounding_sectors();
        config.toggle_tile_outlines();
        config.toggle_picking();
        assert!(config.draw_bounding_sectors);
        assert!(config.show_tile_outlines);
        assert!(!config.pick_enabled);
    }
}
