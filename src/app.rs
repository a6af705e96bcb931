use std::time::Duration;

use anyhow::Result;
use glam::DVec2;
use surface_tiles::render::FrameKind;
use surface_tiles::view::EARTH_RADIUS;
use surface_tiles::{
    Color, DrawContext, Globe, LatLon, SharedObject, SoftwareBackend, TiledSurfaceRenderer, View, Viewport,
};

use crate::braille::BrailleCanvas;

pub const DEFAULT_EYE: LatLon = LatLon::new(20.0, 0.0);
pub const DEFAULT_ALTITUDE: f64 = 2.0e7;
const MIN_ALTITUDE: f64 = 5.0e4;
const MAX_ALTITUDE: f64 = 6.0e7;
const ZOOM_STEP: f64 = 0.8;
/// Latitude limit for the eye; the camera's north vector degenerates at the poles.
const MAX_EYE_LAT: f64 = 85.0;
/// Time the visible-sector search may take per frame.
const VISIBLE_SECTOR_BUDGET: Duration = Duration::from_millis(4);
/// Layer label attached to picks.
const PICK_LAYER: &str = "scene";

/// Braille gives 2x4 resolution per character.
/// Account for border (2 chars horizontal, 2 chars vertical plus status bar).
fn canvas_size(width: usize, height: usize) -> (usize, usize) {
    (width.saturating_sub(2).max(1), height.saturating_sub(3).max(1))
}

/// Application state
pub struct App {
    pub dc: DrawContext,
    pub renderer: TiledSurfaceRenderer,
    /// Last frame, converted to braille
    pub canvas: BrailleCanvas,
    pub eye: LatLon,
    pub altitude: f64,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Outcome of the last click
    pub pick_message: Option<String>,
    dirty: bool,
}

impl App {
    pub fn new(width: usize, height: usize, objects: Vec<SharedObject>) -> Result<Self> {
        let (cols, rows) = canvas_size(width, height);
        let viewport = Viewport::new(cols as u32 * 2, rows as u32 * 4);
        let view = View::new(Globe::earth(), DEFAULT_EYE, DEFAULT_ALTITUDE, viewport)?;
        let backend = SoftwareBackend::new(viewport.width, viewport.height);
        let mut renderer = TiledSurfaceRenderer::new();
        renderer.set_surface_objects(objects);
        let mut dc = DrawContext::new(view, Box::new(backend));
        dc.set_visible_sector_budget(Some(VISIBLE_SECTOR_BUDGET));

        Ok(Self {
            dc,
            renderer,
            canvas: BrailleCanvas::new(cols, rows),
            eye: DEFAULT_EYE,
            altitude: DEFAULT_ALTITUDE,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            pick_message: None,
            dirty: true,
        })
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        let (cols, rows) = canvas_size(width, height);
        let mut view = self.dc.view().clone();
        view.set_viewport(Viewport::new(cols as u32 * 2, rows as u32 * 4))?;
        self.dc.set_view(view);
        self.canvas = BrailleCanvas::new(cols, rows);
        self.dirty = true;
        Ok(())
    }

    fn update_view(&mut self) -> Result<()> {
        let mut view = self.dc.view().clone();
        view.set_eye(self.eye, self.altitude)?;
        self.dc.set_view(view);
        self.dirty = true;
        Ok(())
    }

    /// Pan by whole steps; a step shrinks as the eye comes closer.
    pub fn pan(&mut self, dx: i32, dy: i32) -> Result<()> {
        let step = (self.altitude / EARTH_RADIUS * 4.0).min(20.0);
        let lon = self.eye.lon + dx as f64 * step;
        let lat = (self.eye.lat - dy as f64 * step).clamp(-MAX_EYE_LAT, MAX_EYE_LAT);
        self.eye = LatLon::new(lat, surface_tiles::geo::normalize_lon(lon));
        self.update_view()
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.altitude = (self.altitude * ZOOM_STEP).max(MIN_ALTITUDE);
        self.update_view()
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.altitude = (self.altitude / ZOOM_STEP).min(MAX_ALTITUDE);
        self.update_view()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.eye = DEFAULT_EYE;
        self.altitude = DEFAULT_ALTITUDE;
        self.pick_message = None;
        self.update_view()
    }

    pub fn toggle_bounding_sectors(&mut self) {
        let draw = !self.renderer.config().draw_bounding_sectors;
        self.renderer.set_draw_bounding_sectors(draw);
        self.dirty = true;
    }

    pub fn toggle_tile_outlines(&mut self) {
        let show = !self.renderer.config().show_tile_outlines;
        self.renderer.set_show_tile_outlines(show);
        self.dirty = true;
    }

    pub fn toggle_picking(&mut self) {
        let enabled = !self.renderer.config().pick_enabled;
        self.renderer.set_pick_enabled(enabled);
        self.pick_message = None;
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Draw a frame if anything changed since the last one.
    pub fn redraw_if_dirty(&mut self) {
        if self.dirty {
            self.redraw();
        }
    }

    fn redraw(&mut self) {
        self.dc.begin_frame();
        self.dc.clear_frame(FrameKind::Display, Color::TRANSPARENT);
        self.renderer.pre_render(&mut self.dc);
        self.renderer.render(&mut self.dc);

        let dc = &self.dc;
        self.canvas = BrailleCanvas::from_pixels(self.canvas.width(), self.canvas.height(), |x, y| {
            dc.read_pixel(FrameKind::Display, x, y)
        });
        self.dirty = false;
    }

    /// Pick the object under a terminal cell and describe it in the status bar.
    pub fn pick_at(&mut self, col: u16, row: u16) {
        if !self.renderer.config().pick_enabled {
            return;
        }
        let (px, py) = cell_to_pixel(col, row);
        // Center of the cell's 2x4 dot block.
        let point = DVec2::new(px as f64 + 1.0, py as f64 + 2.0);
        self.dc.set_pick_point(Some(point));
        self.redraw();
        let picked = self.renderer.pick(&mut self.dc, point, Some(PICK_LAYER));
        self.dc.set_pick_point(None);

        self.pick_message = Some(match picked {
            Some(hit) => {
                let name = hit.object.display_name().unwrap_or_else(|| "unnamed object".to_string());
                match hit.position {
                    Some(p) => format!("{} at {}", name, format_coords(p)),
                    None => name,
                }
            }
            None => "nothing here".to_string(),
        });
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) -> Result<()> {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            if dx != 0 || dy != 0 {
                self.pan(dx, dy)?;
            }
        }
        self.last_mouse = Some((x, y));
        Ok(())
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Update mouse cursor position
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Get mouse position in braille pixel coordinates (for rendering marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| cell_to_pixel(col, row))
    }

    pub fn altitude_label(&self) -> String {
        format!("{:.0} km", self.altitude / 1000.0)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format_coords(self.eye)
    }

    pub fn tile_summary(&self) -> String {
        let stats = self.renderer.stats();
        match stats.max_level {
            Some(level) => format!("{} tiles ({} new) L{}", stats.tile_count(), stats.rebuilt_count(), level),
            None => "no tiles".to_string(),
        }
    }
}

/// Convert terminal coords to braille pixel coords.
/// Each terminal cell is 2 braille pixels wide, 4 tall; the border offsets by one cell.
fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    ((col.saturating_sub(1)) as i32 * 2, (row.saturating_sub(1)) as i32 * 4)
}

fn format_coords(location: LatLon) -> String {
    format!(
        "{:.1}°{}, {:.1}°{}",
        location.lat.abs(),
        if location.lat >= 0.0 { "N" } else { "S" },
        location.lon.abs(),
        if location.lon >= 0.0 { "E" } else { "W" }
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use surface_tiles::{PathType, ShapeAttributes, SurfaceShape};

    fn square_scene() -> Vec<SharedObject> {
        let square = SurfaceShape::polygon(vec![
            LatLon::new(-10.0, -10.0),
            LatLon::new(-10.0, 10.0),
            LatLon::new(10.0, 10.0),
            LatLon::new(10.0, -10.0),
        ])
        .with_path_type(PathType::Linear)
        .with_attributes(ShapeAttributes {
            interior_color: Color::RED,
            ..ShapeAttributes::default()
        })
        .expect("valid attributes")
        .with_name("square");
        vec![Arc::new(square)]
    }

    #[test]
    fn test_visible_sector_search_is_budgeted() {
        let app = App::new(40, 20, Vec::new()).expect("valid app");
        assert_eq!(app.dc.visible_sector_budget(), Some(VISIBLE_SECTOR_BUDGET));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut app = App::new(40, 20, Vec::new()).expect("valid app");
        for _ in 0..100 {
            app.zoom_in().expect("zoom");
        }
        assert_eq!(app.altitude, MIN_ALTITUDE);
        for _ in 0..100 {
            app.zoom_out().expect("zoom");
        }
        assert_eq!(app.altitude, MAX_ALTITUDE);
    }

    #[test]
    fn test_pan_clamps_latitude_and_wraps_longitude() {
        let mut app = App::new(40, 20, Vec::new()).expect("valid app");
        for _ in 0..50 {
            app.pan(0, -1).expect("pan");
        }
        assert_eq!(app.eye.lat, MAX_EYE_LAT);
        for _ in 0..50 {
            app.pan(1, 0).expect("pan");
        }
        assert!(app.eye.lon >= -180.0 && app.eye.lon <= 180.0);
    }

    #[test]
    fn test_redraw_fills_canvas() {
        let mut app = App::new(40, 20, square_scene()).expect("valid app");
        app.eye = LatLon::new(0.0, 0.0);
        app.update_view().expect("view");
        app.redraw_if_dirty();
        assert!(app.renderer.stats().tile_count() > 0);
        let lit = (0..app.canvas.height())
            .flat_map(|row| app.canvas.cells(row))
            .filter(|(ch, _)| *ch != '\u{2800}')
            .count();
        assert!(lit > 0);
    }

    #[test]
    fn test_click_outside_globe_reports_nothing() {
        let mut app = App::new(40, 20, square_scene()).expect("valid app");
        app.redraw_if_dirty();
        app.pick_at(1, 1);
        assert_eq!(app.pick_message.as_deref(), Some("nothing here"));
    }
}
