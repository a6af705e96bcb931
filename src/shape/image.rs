use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::DVec2;

use super::support::{compute_hemisphere_offset, compute_normalized_sectors};
use crate::error::{Error, Result};
use crate::geo::Sector;
use crate::object::{SurfaceObject, Timestamp};
use crate::render::{DrawContext, DrawMode, Region, RegionTransform, Texture};
use crate::view::Globe;

struct ImageState {
    sector: Sector,
    image: Arc<Texture>,
    opacity: f64,
    visible: bool,
    pick_enabled: bool,
    name: Option<String>,
    last_modified: Timestamp,
}

/// A geo-referenced RGBA image stretched over a sector.
///
/// The sector's longitudes may run past ±180°; the image is then reported as
/// two sectors and drawn into tiles on both sides of the seam.
pub struct SurfaceImage {
    state: Mutex<ImageState>,
}

impl SurfaceImage {
    pub fn new(sector: Sector, image: Texture) -> Self {
        Self {
            state: Mutex::new(ImageState {
                sector,
                image: Arc::new(image),
                opacity: 1.0,
                visible: true,
                pick_enabled: true,
                name: None,
                last_modified: Timestamp::now(),
            }),
        }
    }

    pub fn with_opacity(self, opacity: f64) -> Result<Self> {
        self.set_opacity(opacity)?;
        Ok(self)
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.lock().name = Some(name.into());
        self
    }

    fn lock(&self) -> MutexGuard<'_, ImageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn modify(&self, f: impl FnOnce(&mut ImageState)) {
        let mut state = self.lock();
        f(&mut state);
        state.last_modified = Timestamp::now();
    }

    pub fn sector(&self) -> Sector {
        self.lock().sector
    }

    pub fn set_sector(&self, sector: Sector) {
        self.modify(|state| state.sector = sector);
    }

    pub fn image(&self) -> Arc<Texture> {
        Arc::clone(&self.lock().image)
    }

    pub fn set_image(&self, image: Texture) {
        self.modify(|state| state.image = Arc::new(image));
    }

    pub fn opacity(&self) -> f64 {
        self.lock().opacity
    }

    pub fn set_opacity(&self, opacity: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(Error::InvalidOpacity(opacity));
        }
        self.modify(|state| state.opacity = opacity);
        Ok(())
    }

    pub fn set_visible(&self, visible: bool) {
        self.modify(|state| state.visible = visible);
    }

    pub fn is_pick_enabled(&self) -> bool {
        self.lock().pick_enabled
    }

    pub fn set_pick_enabled(&self, enabled: bool) {
        self.modify(|state| state.pick_enabled = enabled);
    }
}

impl SurfaceObject for SurfaceImage {
    fn is_visible(&self) -> bool {
        self.lock().visible
    }

    fn last_modified(&self) -> Timestamp {
        self.lock().last_modified
    }

    fn sectors(&self, _globe: &Globe, _texel_size: f64) -> Option<Vec<Sector>> {
        let state = self.lock();
        if state.image.width() == 0 || state.image.height() == 0 {
            return None;
        }
        Some(compute_normalized_sectors(&state.sector))
    }

    fn render_to_region(&self, dc: &mut DrawContext, sector: &Sector, region: Region) {
        let Some(transform) = RegionTransform::new(*sector, region) else {
            return;
        };
        let picking = dc.is_picking_mode();
        let (image_sector, image, opacity) = {
            let state = self.lock();
            if !state.visible || (picking && !state.pick_enabled) {
                return;
            }
            (state.sector, Arc::clone(&state.image), state.opacity)
        };

        let offset = compute_hemisphere_offset(sector, image_sector.centroid());
        let mut offsets = vec![0.0];
        if offset != 0.0 {
            offsets.push(offset);
        }

        for lon_offset in offsets {
            let shifted = image_sector.shifted_lon(lon_offset);
            let min = transform.to_pixel(shifted.min_lon, shifted.max_lat);
            let max = transform.to_pixel(shifted.max_lon, shifted.min_lat);
            if picking {
                let color = dc.current_pick_color();
                let rect = [min, DVec2::new(max.x, min.y), max, DVec2::new(min.x, max.y)];
                dc.draw(DrawMode::Polygon, &rect, color, 1.0);
            } else {
                dc.draw_image(&image, min, max, opacity);
            }
        }
    }

    fn display_name(&self) -> Option<String> {
        self.lock().name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Color, RenderToTexture, TextureFilter, TextureKey};
    use crate::testing::{recording_context, view_at, Recorded};

    fn render(image: &SurfaceImage, sector: Sector, picking: bool) -> Vec<Recorded> {
        let (mut dc, log) = recording_context(view_at(0.0, 0.0, 1.0e7));
        dc.set_picking_mode(picking);
        let color = dc.unique_pick_color();
        dc.set_current_pick_color(color);
        {
            let key = TextureKey::Object { cache_id: 1 };
            let mut rt = RenderToTexture::begin(&mut dc, key, 32, 32, TextureFilter::Linear, false, Color::TRANSPARENT);
            log.clear();
            image.render_to_region(&mut rt, &sector, Region::full(32, 32));
        }
        log.take()
    }

    #[test]
    fn test_sectors_split_past_dateline() {
        let image = SurfaceImage::new(Sector::new(0.0, 10.0, 170.0, 190.0), Texture::filled(4, 4, Color::RED));
        let sectors = image.sectors(&Globe::earth(), 1.0e-3).expect("sectors");
        assert_eq!(
            sectors,
            vec![Sector::new(0.0, 10.0, 170.0, 180.0), Sector::new(0.0, 10.0, -180.0, -170.0)]
        );
    }

    #[test]
    fn test_empty_image_contributes_nothing() {
        let image = SurfaceImage::new(Sector::new(0.0, 10.0, 0.0, 10.0), Texture::new(0, 0));
        assert!(image.sectors(&Globe::earth(), 1.0e-3).is_none());
    }

    #[test]
    fn test_image_fills_its_box() {
        let image = SurfaceImage::new(Sector::new(0.0, 10.0, 0.0, 10.0), Texture::filled(4, 4, Color::RED))
            .with_opacity(0.5)
            .expect("valid opacity");
        let calls = render(&image, Sector::new(0.0, 20.0, 0.0, 20.0), false);
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Recorded::Image { min, max, opacity, blend } => {
                assert_eq!(*min, DVec2::new(0.0, 16.0));
                assert_eq!(*max, DVec2::new(16.0, 32.0));
                assert_eq!(*opacity, 0.5);
                assert!(*blend);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_seam_image_drawn_with_shifted_copy() {
        let image = SurfaceImage::new(Sector::new(0.0, 10.0, 170.0, 190.0), Texture::filled(4, 4, Color::RED));
        let calls = render(&image, Sector::new(0.0, 10.0, -180.0, -170.0), false);
        let boxes: Vec<(DVec2, DVec2)> = calls
            .iter()
            .filter_map(|c| match c {
                Recorded::Image { min, max, .. } => Some((*min, *max)),
                _ => None,
            })
            .collect();
        assert_eq!(boxes.len(), 2);
        // The shifted copy spans -190..-170, ending at the tile's east edge.
        assert!((boxes[1].1.x - 32.0).abs() < 1e-9);
        assert!((boxes[1].0.x + 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_pick_draws_rectangle_in_pick_color() {
        let image = SurfaceImage::new(Sector::new(0.0, 10.0, 0.0, 10.0), Texture::filled(4, 4, Color::RED));
        let calls = render(&image, Sector::new(0.0, 20.0, 0.0, 20.0), true);
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Recorded::Draw(call) => {
                assert_eq!(call.mode, DrawMode::Polygon);
                assert_eq!(call.vertices.len(), 4);
                assert!(!call.state.blend);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_pick_disabled_skips_pick_pass() {
        let image = SurfaceImage::new(Sector::new(0.0, 10.0, 0.0, 10.0), Texture::filled(4, 4, Color::RED));
        image.set_pick_enabled(false);
        assert!(render(&image, Sector::new(0.0, 20.0, 0.0, 20.0), true).is_empty());
        assert_eq!(render(&image, Sector::new(0.0, 20.0, 0.0, 20.0), false).len(), 1);
    }

    #[test]
    fn test_invalid_opacity_rejected() {
        let image = SurfaceImage::new(Sector::new(0.0, 10.0, 0.0, 10.0), Texture::new(1, 1));
        let stamp = image.last_modified();
        assert_eq!(image.set_opacity(-0.1), Err(Error::InvalidOpacity(-0.1)));
        assert_eq!(image.opacity(), 1.0);
        assert_eq!(image.last_modified(), stamp);
    }
}
