use std::collections::HashMap;

use super::Color;
use crate::tiles::TileKey;

/// How a texture is sampled when composited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureFilter {
    #[default]
    Linear,
    /// Required for pick textures: colors must never blend.
    Nearest,
}

/// RGBA image, row 0 at the top (north for tile textures).
#[derive(Clone, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
    pub filter: TextureFilter,
    pub mipmapped: bool,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("filter", &self.filter)
            .field("mipmapped", &self.mipmapped)
            .finish()
    }
}

impl Texture {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Color::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
            filter: TextureFilter::Linear,
            mipmapped: false,
        }
    }

    pub fn with_filter(mut self, filter: TextureFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_mipmaps(mut self, mipmapped: bool) -> Self {
        self.mipmapped = mipmapped;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Approximate resident size, counting a third extra for a mip chain.
    pub fn size_in_bytes(&self) -> usize {
        let base = self.pixels.len() * 4;
        if self.mipmapped {
            base + base / 3
        } else {
            base
        }
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    #[inline(always)]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Overwrite a pixel; out-of-bounds writes are ignored.
    #[inline(always)]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Source-over blend onto a pixel; out-of-bounds writes are ignored.
    #[inline(always)]
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = blend_over(color, self.pixels[i]);
        }
    }

    /// Write with or without blending; fully transparent sources are skipped
    /// either way.
    #[inline(always)]
    pub fn put(&mut self, x: i32, y: i32, color: Color, blend: bool) {
        if blend {
            if color.a > 0 {
                self.blend_pixel(x, y, color);
            }
        } else {
            self.set_pixel(x, y, color);
        }
    }

    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    /// Sample at normalized coordinates, `u` east and `v` south, each in [0, 1].
    pub fn sample(&self, u: f64, v: f64) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::TRANSPARENT;
        }
        match self.filter {
            TextureFilter::Nearest => self.sample_nearest(u, v),
            TextureFilter::Linear => self.sample_linear(u, v),
        }
    }

    fn sample_nearest(&self, u: f64, v: f64) -> Color {
        let x = ((u * self.width as f64) as i32).clamp(0, self.width as i32 - 1);
        let y = ((v * self.height as f64) as i32).clamp(0, self.height as i32 - 1);
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    fn sample_linear(&self, u: f64, v: f64) -> Color {
        let fx = (u * self.width as f64 - 0.5).clamp(0.0, self.width as f64 - 1.0);
        let fy = (v * self.height as f64 - 0.5).clamp(0.0, self.height as f64 - 1.0);
        let x0 = fx.floor() as i32;
        let y0 = fy.floor() as i32;
        let x1 = (x0 + 1).min(self.width as i32 - 1);
        let y1 = (y0 + 1).min(self.height as i32 - 1);
        let tx = fx - x0 as f64;
        let ty = fy - y0 as f64;

        // Accumulate premultiplied so transparent texels do not darken edges.
        let mut acc = [0.0_f64; 4];
        for (x, y, w) in [
            (x0, y0, (1.0 - tx) * (1.0 - ty)),
            (x1, y0, tx * (1.0 - ty)),
            (x0, y1, (1.0 - tx) * ty),
            (x1, y1, tx * ty),
        ] {
            let c = self.pixels[y as usize * self.width as usize + x as usize];
            let a = c.a as f64 / 255.0;
            acc[0] += c.r as f64 * a * w;
            acc[1] += c.g as f64 * a * w;
            acc[2] += c.b as f64 * a * w;
            acc[3] += a * w;
        }

        if acc[3] <= 0.0 {
            return Color::TRANSPARENT;
        }
        Color::rgba(
            (acc[0] / acc[3]).round().clamp(0.0, 255.0) as u8,
            (acc[1] / acc[3]).round().clamp(0.0, 255.0) as u8,
            (acc[2] / acc[3]).round().clamp(0.0, 255.0) as u8,
            (acc[3] * 255.0).round().clamp(0.0, 255.0) as u8,
        )
    }
}

/// Porter-Duff source-over for straight alpha.
#[inline(always)]
pub fn blend_over(src: Color, dst: Color) -> Color {
    if src.a == 255 {
        return src;
    }
    if src.a == 0 {
        return dst;
    }
    let sa = src.a as f32 / 255.0;
    let da = dst.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mix = |s: u8, d: u8| -> u8 {
        let value = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    Color::rgba(
        mix(src.r, dst.r),
        mix(src.g, dst.g),
        mix(src.b, dst.b),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    )
}

/// Identity of a resident texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKey {
    /// One display tile of one renderer.
    Tile { cache_id: u64, tile: TileKey },
    /// The single pick tile of one renderer.
    PickTile { cache_id: u64 },
    /// A non-tiled texture owned by one object.
    Object { cache_id: u64 },
}

/// Default texture budget: room for a few hundred 512px tiles.
pub const DEFAULT_TEXTURE_CACHE_BYTES: usize = 300 * 1024 * 1024;

struct Resident {
    texture: Texture,
    last_used: u64,
}

/// Byte-bounded texture pool with least-recently-used eviction.
pub struct TextureCache {
    entries: HashMap<TextureKey, Resident>,
    capacity_bytes: usize,
    used_bytes: usize,
    tick: u64,
}

impl TextureCache {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity_bytes,
            used_bytes: 0,
            tick: 0,
        }
    }

    pub fn contains(&self, key: &TextureKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a texture and mark it recently used.
    pub fn get(&mut self, key: &TextureKey) -> Option<&Texture> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|resident| {
            resident.last_used = tick;
            &resident.texture
        })
    }

    /// Remove and return a texture, e.g. to bind it as a render target.
    pub fn take(&mut self, key: &TextureKey) -> Option<Texture> {
        let resident = self.entries.remove(key)?;
        self.used_bytes -= resident.texture.size_in_bytes();
        Some(resident.texture)
    }

    /// Insert, evicting least recently used textures until the new one fits.
    /// A texture larger than the whole budget is still admitted alone.
    pub fn put(&mut self, key: TextureKey, texture: Texture) {
        self.take(&key);
        let size = texture.size_in_bytes();
        while self.used_bytes + size > self.capacity_bytes && !self.entries.is_empty() {
            self.evict_lru();
        }
        self.tick += 1;
        self.used_bytes += size;
        self.entries.insert(
            key,
            Resident {
                texture,
                last_used: self.tick,
            },
        );
    }

    pub fn remove(&mut self, key: &TextureKey) -> bool {
        self.take(key).is_some()
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, resident)| resident.last_used)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            log::debug!("evicting texture {:?}", key);
            self.take(&key);
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new(DEFAULT_TEXTURE_CACHE_BYTES)
    }
}
