//! The rendering side: colors, draw primitives, the backend seam and the
//! per-session draw context.

use glam::DVec2;

use crate::geo::{LatLon, Sector};
use crate::view::{Globe, View};

pub mod context;
pub mod pick;
pub mod raster;
pub mod software;
pub mod texture;

pub use context::{DrawContext, RenderToTexture};
pub use pick::{PickColorAllocator, PickSupport, PickedObject};
pub use software::SoftwareBackend;
pub use texture::{Texture, TextureCache, TextureFilter, TextureKey};

/// Straight (non-premultiplied) RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Scale alpha by `opacity` in [0, 1].
    pub fn with_opacity(self, opacity: f64) -> Self {
        let a = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// 24-bit RGB key, ignoring alpha.
    #[inline(always)]
    pub fn to_rgb_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Opaque color from a 24-bit RGB key.
    #[inline(always)]
    pub fn from_rgb_u32(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }
}

/// How a flat vertex list is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    /// Filled simple polygon, even-odd rule.
    Polygon,
    LineLoop,
    LineStrip,
}

/// Fixed state for one draw call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawState {
    pub color: Color,
    pub line_width: f64,
    /// Source-over blending. Off in pick mode so colors stay exact.
    pub blend: bool,
}

/// Which screen framebuffer a composite targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Display,
    Pick,
}

/// Pixel rectangle inside the bound offscreen target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Region covering a whole `width` x `height` target.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }
}

/// Maps geographic coordinates inside a sector onto a pixel region, north up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionTransform {
    sector: Sector,
    region: Region,
    scale_x: f64,
    scale_y: f64,
}

impl RegionTransform {
    /// `None` for a degenerate sector or empty region.
    pub fn new(sector: Sector, region: Region) -> Option<Self> {
        let d_lon = sector.delta_lon();
        let d_lat = sector.delta_lat();
        if d_lon <= 0.0 || d_lat <= 0.0 || region.width <= 0.0 || region.height <= 0.0 {
            return None;
        }
        Some(Self {
            sector,
            region,
            scale_x: region.width / d_lon,
            scale_y: region.height / d_lat,
        })
    }

    /// Pixel position of (`lon`, `lat`); longitudes outside the sector map
    /// outside the region, which is how ±360° shifted copies land off-target.
    #[inline(always)]
    pub fn to_pixel(&self, lon: f64, lat: f64) -> DVec2 {
        DVec2::new(
            self.region.x + (lon - self.sector.min_lon) * self.scale_x,
            self.region.y + (self.sector.max_lat - lat) * self.scale_y,
        )
    }

    #[inline(always)]
    pub fn location_to_pixel(&self, location: LatLon) -> DVec2 {
        self.to_pixel(location.lon, location.lat)
    }

    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Pixels per degree of latitude.
    pub fn pixels_per_degree_lat(&self) -> f64 {
        self.scale_y
    }

    /// Pixels per degree of longitude.
    pub fn pixels_per_degree_lon(&self) -> f64 {
        self.scale_x
    }
}

/// Rasterization services the tiler drives. The tiler decides what to draw
/// and where; the backend owns pixels.
pub trait RenderBackend {
    /// Largest texture edge the backend can allocate.
    fn max_texture_size(&self) -> u32;

    fn clear(&mut self, target: &mut Texture, color: Color);

    fn draw(&mut self, target: &mut Texture, mode: DrawMode, vertices: &[DVec2], state: &DrawState);

    /// Stretch `image` over the axis-aligned pixel box `min..max` of `target`.
    fn draw_image(
        &mut self,
        target: &mut Texture,
        image: &Texture,
        min: DVec2,
        max: DVec2,
        opacity: f64,
        blend: bool,
    );

    /// Resize both screen framebuffers.
    fn resize(&mut self, width: u32, height: u32);

    fn clear_frame(&mut self, frame: FrameKind, color: Color);

    /// Drape `texture`, which spans `sector`, onto the globe as seen by `view`.
    /// The pick frame is written without blending.
    fn composite(
        &mut self,
        frame: FrameKind,
        view: &View,
        globe: &Globe,
        sector: &Sector,
        texture: &Texture,
        outline: Option<Color>,
    );

    fn read_pixel(&self, frame: FrameKind, x: i32, y: i32) -> Option<Color>;
}
