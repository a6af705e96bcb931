use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::DVec2;

use super::support::{compute_hemisphere_offset, compute_normalized_sectors};
use crate::cache::{CacheEntry, ShapeCache};
use crate::error::{Error, Result};
use crate::geo::{LatLon, Sector};
use crate::object::{SurfaceObject, Timestamp};
use crate::render::{DrawContext, DrawMode, Region, RegionTransform, Texture};
use crate::view::Globe;

/// Default icon width on the ground, meters.
pub const DEFAULT_ICON_SIZE: f64 = 10_000.0;

/// Floor on cos(latitude) so padding stays finite at the poles.
const MIN_COS_LAT: f64 = 0.01;

struct IconsState {
    locations: Vec<LatLon>,
    image: Arc<Texture>,
    size: f64,
    opacity: f64,
    visible: bool,
    name: Option<String>,
    last_modified: Timestamp,
    sector_cache: ShapeCache<Vec<Sector>>,
}

impl IconsState {
    /// Icon footprint in meters; height follows the image's aspect ratio.
    fn draw_dimensions(&self) -> (f64, f64) {
        let (w, h) = (self.image.width(), self.image.height());
        if w == 0 {
            return (self.size, self.size);
        }
        (self.size, self.size * h as f64 / w as f64)
    }

    fn compute_sectors(&self, globe: &Globe) -> Vec<Sector> {
        let Some(bounds) = Sector::bounding(&self.locations) else {
            return Vec::new();
        };
        let min_cos_lat = bounds
            .min_lat
            .to_radians()
            .cos()
            .min(bounds.max_lat.to_radians().cos())
            .max(MIN_COS_LAT);
        let (width, height) = self.draw_dimensions();
        let half_diagonal = width.hypot(height) / 2.0 / globe.radius();
        let pad_lat = half_diagonal.to_degrees();
        let pad_lon = (half_diagonal / min_cos_lat).to_degrees();
        compute_normalized_sectors(&Sector::new(
            bounds.min_lat - pad_lat,
            bounds.max_lat + pad_lat,
            bounds.min_lon - pad_lon,
            bounds.max_lon + pad_lon,
        ))
    }
}

/// One icon image stamped at many locations, sized in meters on the ground.
pub struct SurfaceIcons {
    state: Mutex<IconsState>,
}

impl SurfaceIcons {
    pub fn new(image: Texture, locations: Vec<LatLon>) -> Self {
        Self {
            state: Mutex::new(IconsState {
                locations,
                image: Arc::new(image),
                size: DEFAULT_ICON_SIZE,
                opacity: 1.0,
                visible: true,
                name: None,
                last_modified: Timestamp::now(),
                sector_cache: ShapeCache::default(),
            }),
        }
    }

    pub fn with_size(self, meters: f64) -> Result<Self> {
        self.set_size(meters)?;
        Ok(self)
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.lock().name = Some(name.into());
        self
    }

    fn lock(&self) -> MutexGuard<'_, IconsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn modify(&self, f: impl FnOnce(&mut IconsState)) {
        let mut state = self.lock();
        f(&mut state);
        state.last_modified = Timestamp::now();
    }

    pub fn locations(&self) -> Vec<LatLon> {
        self.lock().locations.clone()
    }

    pub fn set_locations(&self, locations: Vec<LatLon>) {
        self.modify(|state| state.locations = locations);
    }

    pub fn size(&self) -> f64 {
        self.lock().size
    }

    pub fn set_size(&self, meters: f64) -> Result<()> {
        if !(meters > 0.0) {
            return Err(Error::InvalidScale(meters));
        }
        self.modify(|state| state.size = meters);
        Ok(())
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
}

/// Angular radius, in degrees, around the tile centroid inside which an icon
/// can touch the tile.
fn safe_radius(globe: &Globe, tile: &Sector, width: f64, height: f64) -> f64 {
    let sector_radius = tile.delta_lat().hypot(tile.delta_lon()) / 2.0;
    let min_cos_lat = tile.min_lat.to_radians().cos().min(tile.max_lat.to_radians().cos());
    if min_cos_lat < 0.001 {
        return sector_radius + 180.0;
    }
    let d_lat = (height / globe.radius()).to_degrees();
    let d_lon = (width / globe.radius() / min_cos_lat).to_degrees();
    sector_radius + d_lat.hypot(d_lon) / 2.0
}

impl SurfaceObject for SurfaceIcons {
    fn is_visible(&self) -> bool {
        self.lock().visible
    }

    fn last_modified(&self) -> Timestamp {
        self.lock().last_modified
    }

    fn sectors(&self, globe: &Globe, texel_size: f64) -> Option<Vec<Sector>> {
        let mut state = self.lock();
        if state.locations.is_empty() {
            return None;
        }
        let stamp = state.last_modified;
        let sectors = match state.sector_cache.get_valid(texel_size, stamp) {
            Some(sectors) => sectors,
            None => {
                let sectors = state.compute_sectors(globe);
                state.sector_cache.put(texel_size, CacheEntry::new(sectors.clone(), stamp));
                sectors
            }
        };
        (!sectors.is_empty()).then_some(sectors)
    }

    fn render_to_region(&self, dc: &mut DrawContext, sector: &Sector, region: Region) {
        let Some(transform) = RegionTransform::new(*sector, region) else {
            return;
        };
        let globe = dc.globe();
        let (locations, image, (width, height), opacity) = {
            let state = self.lock();
            if !state.visible {
                return;
            }
            (state.locations.clone(), Arc::clone(&state.image), state.draw_dimensions(), state.opacity)
        };

        let safe = safe_radius(&globe, sector, width, height);
        let center = sector.centroid();
        let picking = dc.is_picking_mode();
        let pick_color = dc.current_pick_color();
        let half_lat_px = (height / 2.0 / globe.radius()).to_degrees() * transform.pixels_per_degree_lat();

        for location in locations {
            let offset = compute_hemisphere_offset(sector, location);
            let d_lat = location.lat - center.lat;
            let d_lon = location.lon + offset - center.lon;
            if d_lat * d_lat + d_lon * d_lon > safe * safe {
                continue;
            }

            let cos_lat = location.lat.to_radians().cos().max(MIN_COS_LAT);
            let half_lon_px = (width / 2.0 / globe.radius() / cos_lat).to_degrees() * transform.pixels_per_degree_lon();
            let middle = transform.to_pixel(location.lon + offset, location.lat);
            let half = DVec2::new(half_lon_px, half_lat_px);
            let (min, max) = (middle - half, middle + half);

            if picking {
                let rect = [min, DVec2::new(max.x, min.y), max, DVec2::new(min.x, max.y)];
                dc.draw(DrawMode::Polygon, &rect, pick_color, 1.0);
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
    use crate::view::EARTH_RADIUS;

    fn render(icons: &SurfaceIcons, sector: Sector, picking: bool) -> Vec<Recorded> {
        let (mut dc, log) = recording_context(view_at(0.0, 0.0, 1.0e7));
        dc.set_picking_mode(picking);
        let color = dc.unique_pick_color();
        dc.set_current_pick_color(color);
        {
            let key = TextureKey::Object { cache_id: 1 };
            let mut rt = RenderToTexture::begin(&mut dc, key, 32, 32, TextureFilter::Linear, false, Color::TRANSPARENT);
            log.clear();
            icons.render_to_region(&mut rt, &sector, Region::full(32, 32));
        }
        log.take()
    }

    #[test]
    fn test_sectors_padded_by_half_diagonal() {
        let icons = SurfaceIcons::new(Texture::filled(8, 8, Color::RED), vec![LatLon::new(0.0, 0.0)])
            .with_size(2_000.0)
            .expect("valid size");
        let sectors = icons.sectors(&Globe::earth(), 1.0e-3).expect("sectors");
        assert_eq!(sectors.len(), 1);
        let pad = (2_000.0_f64.hypot(2_000.0) / 2.0 / EARTH_RADIUS).to_degrees();
        assert!((sectors[0].max_lat - pad).abs() < 1e-12);
        assert!((sectors[0].min_lon + pad).abs() < 1e-12);
        assert!((sectors[0].max_lon - pad).abs() < 1e-12);
    }

    #[test]
    fn test_wide_image_is_shorter_on_the_ground() {
        let icons = SurfaceIcons::new(Texture::new(8, 4), vec![LatLon::ZERO]);
        assert_eq!(icons.lock().draw_dimensions(), (DEFAULT_ICON_SIZE, DEFAULT_ICON_SIZE / 2.0));
    }

    #[test]
    fn test_no_locations_no_sectors() {
        let icons = SurfaceIcons::new(Texture::new(8, 8), Vec::new());
        assert!(icons.sectors(&Globe::earth(), 1.0e-3).is_none());
    }

    #[test]
    fn test_far_icons_are_culled() {
        let icons = SurfaceIcons::new(
            Texture::filled(8, 8, Color::RED),
            vec![LatLon::new(5.0, 5.0), LatLon::new(-60.0, 100.0)],
        );
        let calls = render(&icons, Sector::new(0.0, 10.0, 0.0, 10.0), false);
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Recorded::Image { min, max, .. } => {
                let middle = (*min + *max) / 2.0;
                assert!((middle.x - 16.0).abs() < 1e-9);
                assert!((middle.y - 16.0).abs() < 1e-9);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_icon_across_seam_lands_on_tile_edge() {
        let icons = SurfaceIcons::new(Texture::filled(8, 8, Color::RED), vec![LatLon::new(5.0, 179.99)]);
        let calls = render(&icons, Sector::new(0.0, 10.0, -180.0, -170.0), false);
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Recorded::Image { min, max, .. } => assert!(min.x < 0.0 && max.x > 0.0),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_pick_draws_rectangles() {
        let icons = SurfaceIcons::new(
            Texture::filled(8, 8, Color::RED),
            vec![LatLon::new(2.0, 2.0), LatLon::new(8.0, 8.0)],
        );
        let calls = render(&icons, Sector::new(0.0, 10.0, 0.0, 10.0), true);
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| matches!(c, Recorded::Draw(d) if d.mode == DrawMode::Polygon && !d.state.blend)));
    }

    #[test]
    fn test_invalid_size_rejected() {
        let icons = SurfaceIcons::new(Texture::new(8, 8), vec![LatLon::ZERO]);
        assert_eq!(icons.set_size(0.0), Err(Error::InvalidScale(0.0)));
        assert_eq!(icons.size(), DEFAULT_ICON_SIZE);
        assert_eq!(icons.set_opacity(3.0), Err(Error::InvalidOpacity(3.0)));
    }
}
