use crate::error::{Error, Result};
use crate::geo::LatLon;

/// Common tiling origin: the south-west corner of the globe.
pub const TILE_ORIGIN: LatLon = LatLon::new(-90.0, -180.0);

/// One resolution of the tile quadtree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Level {
    pub number: u32,
    /// Angular edge of a tile at this level, degrees. Tiles are square in
    /// lat/lon.
    pub tile_delta: f64,
    /// Texture edge of a tile at this level, pixels.
    pub dimension: u32,
    /// Angular size of one texel, radians.
    pub texel_size: f64,
}

/// Fixed level hierarchy for one tile dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelSet {
    origin: LatLon,
    levels: Vec<Level>,
}

impl LevelSet {
    /// Levels halve their tile delta from `level_zero_delta` down `num_levels`
    /// steps, all sharing `dimension`.
    pub fn new(level_zero_delta: f64, num_levels: u32, dimension: u32) -> Result<Self> {
        if !(level_zero_delta > 0.0 && level_zero_delta.is_finite()) {
            return Err(Error::InvalidTileDelta(level_zero_delta));
        }
        if num_levels == 0 {
            return Err(Error::InvalidLevelCount);
        }
        if dimension == 0 {
            return Err(Error::InvalidTileSize);
        }

        let levels = (0..num_levels)
            .map(|number| {
                let tile_delta = level_zero_delta / 2f64.powi(number as i32);
                Level {
                    number,
                    tile_delta,
                    dimension,
                    texel_size: tile_delta.to_radians() / dimension as f64,
                }
            })
            .collect();

        log::debug!(
            "level set: {} levels from {}° tiles at {}px",
            num_levels,
            level_zero_delta,
            dimension
        );
        Ok(Self {
            origin: TILE_ORIGIN,
            levels,
        })
    }

    pub fn origin(&self) -> LatLon {
        self.origin
    }

    pub fn level(&self, number: u32) -> Option<&Level> {
        self.levels.get(number as usize)
    }

    pub fn first_level(&self) -> &Level {
        // `new` rejects an empty hierarchy.
        &self.levels[0]
    }

    pub fn last_level(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }

    pub fn is_final_level(&self, number: u32) -> bool {
        number as usize + 1 >= self.levels.len()
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn dimension(&self) -> u32 {
        self.first_level().dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_halve() {
        let set = LevelSet::new(36.0, 17, 512).expect("valid");
        assert_eq!(set.num_levels(), 17);
        assert_eq!(set.first_level().tile_delta, 36.0);
        assert_eq!(set.level(1).map(|l| l.tile_delta), Some(18.0));
        assert_eq!(set.last_level().tile_delta, 36.0 / 65536.0);
        assert!(set.is_final_level(16));
        assert!(!set.is_final_level(15));
        assert!(set.level(17).is_none());
    }

    #[test]
    fn test_texel_size_follows_dimension() {
        let set = LevelSet::new(36.0, 2, 256).expect("valid");
        let expected = 36f64.to_radians() / 256.0;
        assert!((set.first_level().texel_size - expected).abs() < 1e-15);
        assert!((set.level(1).map(|l| l.texel_size).unwrap_or_default() - expected / 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert_eq!(LevelSet::new(0.0, 17, 512), Err(Error::InvalidTileDelta(0.0)));
        assert_eq!(LevelSet::new(36.0, 0, 512), Err(Error::InvalidLevelCount));
        assert_eq!(LevelSet::new(36.0, 17, 0), Err(Error::InvalidTileSize));
    }
}
