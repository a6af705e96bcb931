use glam::DVec2;

use super::raster::{blit_image, draw_polyline, draw_wide_line, fill_polygon};
use super::{Color, DrawMode, DrawState, FrameKind, RenderBackend, Texture};
use crate::geo::{LatLon, Sector};
use crate::view::{Globe, View};

/// Largest texture edge the software backend will allocate.
pub const SOFTWARE_MAX_TEXTURE_SIZE: u32 = 4096;

/// Sectors wider than this are composited over the whole viewport rather
/// than a projected bounding box, which can miss their bulge.
const BOUNDED_COMPOSITE_MAX_DEGREES: f64 = 30.0;

/// CPU rasterizer with a display and a pick framebuffer sized to the viewport.
pub struct SoftwareBackend {
    display: Texture,
    pick: Texture,
    max_texture_size: u32,
    draw_calls: u64,
    composites: u64,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            display: Texture::new(width, height),
            pick: Texture::new(width, height),
            max_texture_size: SOFTWARE_MAX_TEXTURE_SIZE,
            draw_calls: 0,
            composites: 0,
        }
    }

    /// Simulate a device with a smaller texture limit.
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size.max(1);
        self
    }

    pub fn frame(&self, frame: FrameKind) -> &Texture {
        match frame {
            FrameKind::Display => &self.display,
            FrameKind::Pick => &self.pick,
        }
    }

    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    pub fn composites(&self) -> u64 {
        self.composites
    }

    /// Screen-space pixel box that can contain `sector`, or the whole frame
    /// when the sector is too large or partly behind the eye.
    fn screen_bounds(
        view: &View,
        globe: &Globe,
        sector: &Sector,
        width: i32,
        height: i32,
    ) -> Option<(i32, i32, i32, i32)> {
        let full = Some((0, 0, width, height));
        if sector.delta_lat() > BOUNDED_COMPOSITE_MAX_DEGREES || sector.delta_lon() > BOUNDED_COMPOSITE_MAX_DEGREES {
            return full;
        }

        const STEPS: usize = 8;
        let mut min = DVec2::splat(f64::MAX);
        let mut max = DVec2::splat(f64::MIN);
        for i in 0..=STEPS {
            for j in 0..=STEPS {
                let lat = sector.min_lat + sector.delta_lat() * i as f64 / STEPS as f64;
                let lon = sector.min_lon + sector.delta_lon() * j as f64 / STEPS as f64;
                let point = globe.compute_point(LatLon::new(lat, lon), 0.0);
                let Some(p) = view.project(point) else {
                    return full;
                };
                min = min.min(p);
                max = max.max(p);
            }
        }

        let x0 = ((min.x - 2.0).floor() as i32).max(0);
        let y0 = ((min.y - 2.0).floor() as i32).max(0);
        let x1 = ((max.x + 2.0).ceil() as i32).min(width);
        let y1 = ((max.y + 2.0).ceil() as i32).min(height);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0, y0, x1, y1))
    }

    fn draw_sector_outline(target: &mut Texture, view: &View, globe: &Globe, sector: &Sector, color: Color) {
        const STEPS: usize = 16;
        let corners = sector.corners();
        for k in 0..4 {
            let a = corners[k];
            let b = corners[(k + 1) % 4];
            let mut previous: Option<DVec2> = None;
            for i in 0..=STEPS {
                let t = i as f64 / STEPS as f64;
                let ll = LatLon::new(a.lat + (b.lat - a.lat) * t, a.lon + (b.lon - a.lon) * t);
                let projected = view.project(globe.compute_point(ll, 0.0));
                if let (Some(p), Some(q)) = (previous, projected) {
                    draw_wide_line(target, p, q, 1.0, color, true);
                }
                previous = projected;
            }
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn clear(&mut self, target: &mut Texture, color: Color) {
        target.fill(color);
    }

    fn draw(&mut self, target: &mut Texture, mode: DrawMode, vertices: &[DVec2], state: &DrawState) {
        self.draw_calls += 1;
        match mode {
            DrawMode::Polygon => fill_polygon(target, vertices, state.color, state.blend),
            DrawMode::LineLoop => draw_polyline(target, vertices, true, state.line_width, state.color, state.blend),
            DrawMode::LineStrip => draw_polyline(target, vertices, false, state.line_width, state.color, state.blend),
        }
    }

    fn draw_image(&mut self, target: &mut Texture, image: &Texture, min: DVec2, max: DVec2, opacity: f64, blend: bool) {
        self.draw_calls += 1;
        blit_image(target, image, min, max, opacity, blend);
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.display.width() != width || self.display.height() != height {
            self.display = Texture::new(width, height);
            self.pick = Texture::new(width, height);
        }
    }

    fn clear_frame(&mut self, frame: FrameKind, color: Color) {
        match frame {
            FrameKind::Display => self.display.fill(color),
            FrameKind::Pick => self.pick.fill(color),
        }
    }

    fn composite(
        &mut self,
        frame: FrameKind,
        view: &View,
        globe: &Globe,
        sector: &Sector,
        texture: &Texture,
        outline: Option<Color>,
    ) {
        self.composites += 1;
        let target = match frame {
            FrameKind::Display => &mut self.display,
            FrameKind::Pick => &mut self.pick,
        };
        let (width, height) = (target.width() as i32, target.height() as i32);
        let d_lat = sector.delta_lat();
        let d_lon = sector.delta_lon();
        if d_lat <= 0.0 || d_lon <= 0.0 {
            return;
        }

        if let Some((x0, y0, x1, y1)) = Self::screen_bounds(view, globe, sector, width, height) {
            for py in y0..y1 {
                for px in x0..x1 {
                    let ray = view.ray_through(px as f64 + 0.5, py as f64 + 0.5);
                    let Some(hit) = globe.intersect(&ray) else {
                        continue;
                    };
                    let ll = LatLon::from_vector(hit);
                    if !sector.contains(ll) {
                        continue;
                    }
                    let u = (ll.lon - sector.min_lon) / d_lon;
                    let v = (sector.max_lat - ll.lat) / d_lat;
                    let texel = texture.sample(u, v);
                    if texel.a == 0 {
                        continue;
                    }
                    match frame {
                        FrameKind::Display => target.blend_pixel(px, py, texel),
                        FrameKind::Pick => target.set_pixel(px, py, texel),
                    }
                }
            }
        }

        if let Some(color) = outline {
            if frame == FrameKind::Display {
                Self::draw_sector_outline(target, view, globe, sector, color);
            }
        }
    }

    fn read_pixel(&self, frame: FrameKind, x: i32, y: i32) -> Option<Color> {
        self.frame(frame).pixel(x, y)
    }
}
