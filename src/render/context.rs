//! Per-session render context and the scoped offscreen target.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use glam::{DVec2, DVec3};

use super::pick::{PickColorAllocator, PickedObject};
use super::texture::{Texture, TextureCache, TextureFilter, TextureKey};
use super::{Color, DrawMode, DrawState, FrameKind, RenderBackend};
use crate::geo::{LatLon, Sector};
use crate::view::{visible, Globe, Terrain, View};

/// Everything a frame needs: the view, the backend, shared texture memory,
/// pick state and the currently bound offscreen target.
///
/// Services that would otherwise be process-wide (cache ids, pick colors)
/// live here so independent sessions never share them.
pub struct DrawContext {
    view: View,
    terrain: Option<Box<dyn Terrain>>,
    backend: Box<dyn RenderBackend>,
    textures: TextureCache,
    pick_colors: PickColorAllocator,
    picking: bool,
    current_pick_color: Color,
    pick_point: Option<DVec2>,
    picked_objects: Vec<PickedObject>,
    visible_sector: Option<Sector>,
    visible_sector_budget: Option<Duration>,
    target: Option<Texture>,
    next_cache_id: u64,
    frame_number: u64,
}

impl DrawContext {
    pub fn new(view: View, mut backend: Box<dyn RenderBackend>) -> Self {
        let viewport = view.viewport();
        backend.resize(viewport.width, viewport.height);
        Self {
            view,
            terrain: None,
            backend,
            textures: TextureCache::default(),
            pick_colors: PickColorAllocator::default(),
            picking: false,
            current_pick_color: Color::TRANSPARENT,
            pick_point: None,
            picked_objects: Vec::new(),
            visible_sector: None,
            visible_sector_budget: None,
            target: None,
            next_cache_id: 1,
            frame_number: 0,
        }
    }

    pub fn with_terrain(mut self, terrain: Box<dyn Terrain>) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn with_texture_cache(mut self, textures: TextureCache) -> Self {
        self.textures = textures;
        self
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn set_view(&mut self, view: View) {
        let viewport = view.viewport();
        self.backend.resize(viewport.width, viewport.height);
        self.view = view;
    }

    pub fn globe(&self) -> Globe {
        *self.view.globe()
    }

    pub fn terrain(&self) -> Option<&dyn Terrain> {
        self.terrain.as_deref()
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Reset per-frame state and recompute the visible sector.
    pub fn begin_frame(&mut self) {
        self.frame_number += 1;
        self.pick_colors.reset();
        self.picked_objects.clear();
        self.picking = false;
        self.current_pick_color = Color::TRANSPARENT;
        self.visible_sector = visible::visible_sector(&self.view, self.visible_sector_budget);
    }

    /// Region of the globe the view can see; `None` places no restriction.
    pub fn visible_sector(&self) -> Option<Sector> {
        self.visible_sector
    }

    /// Override the visible sector until the next [`DrawContext::begin_frame`].
    pub fn set_visible_sector(&mut self, sector: Option<Sector>) {
        self.visible_sector = sector;
    }

    pub fn visible_sector_budget(&self) -> Option<Duration> {
        self.visible_sector_budget
    }

    pub fn set_visible_sector_budget(&mut self, budget: Option<Duration>) {
        self.visible_sector_budget = budget;
    }

    pub fn pick_point(&self) -> Option<DVec2> {
        self.pick_point
    }

    pub fn set_pick_point(&mut self, point: Option<DVec2>) {
        self.pick_point = point;
    }

    pub fn is_picking_mode(&self) -> bool {
        self.picking
    }

    pub fn set_picking_mode(&mut self, picking: bool) {
        self.picking = picking;
    }

    pub fn unique_pick_color(&mut self) -> Color {
        self.pick_colors.next_color()
    }

    /// Clear color of the pick frame; never handed out as a pick color.
    pub fn pick_clear_color(&self) -> Color {
        self.pick_colors.clear_color()
    }

    /// Color the object being rendered must use in pick mode.
    pub fn current_pick_color(&self) -> Color {
        self.current_pick_color
    }

    pub fn set_current_pick_color(&mut self, color: Color) {
        self.current_pick_color = color;
    }

    pub fn add_picked_object(&mut self, picked: PickedObject) {
        self.picked_objects.push(picked);
    }

    pub fn picked_objects(&self) -> &[PickedObject] {
        &self.picked_objects
    }

    pub fn top_picked_object(&self) -> Option<&PickedObject> {
        self.picked_objects.iter().find(|p| p.on_top).or_else(|| self.picked_objects.last())
    }

    /// Fresh id for keying textures owned by one renderer or object.
    pub fn next_cache_id(&mut self) -> u64 {
        let id = self.next_cache_id;
        self.next_cache_id += 1;
        id
    }

    /// Terrain point at `location`, or the bare globe surface without terrain.
    pub fn surface_point(&self, location: LatLon) -> DVec3 {
        let globe = self.view.globe();
        self.terrain
            .as_ref()
            .and_then(|terrain| terrain.surface_point(globe, location))
            .unwrap_or_else(|| globe.compute_point(location, 0.0))
    }

    /// Terrain position under a screen point. Falls back to the globe when
    /// terrain has no answer.
    pub fn pick_terrain_position(&self, point: DVec2) -> Option<(LatLon, DVec3)> {
        let globe = self.view.globe();
        let ray = self.view.ray_through(point.x, point.y);
        let hit = self
            .terrain
            .as_ref()
            .and_then(|terrain| terrain.intersect(globe, &ray))
            .or_else(|| globe.intersect(&ray))?;
        Some((LatLon::from_vector(hit), hit))
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    /// Size of the bound offscreen target.
    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.target.as_ref().map(|t| (t.width(), t.height()))
    }

    pub fn clear_target(&mut self, color: Color) {
        match self.target.as_mut() {
            Some(target) => self.backend.clear(target, color),
            None => log::warn!("clear with no bound render target"),
        }
    }

    /// Draw into the bound target. Blending is disabled in pick mode.
    pub fn draw(&mut self, mode: DrawMode, vertices: &[DVec2], color: Color, line_width: f64) {
        let state = DrawState {
            color,
            line_width,
            blend: !self.picking,
        };
        match self.target.as_mut() {
            Some(target) => self.backend.draw(target, mode, vertices, &state),
            None => log::warn!("draw call with no bound render target"),
        }
    }

    pub fn draw_image(&mut self, image: &Texture, min: DVec2, max: DVec2, opacity: f64) {
        let blend = !self.picking;
        match self.target.as_mut() {
            Some(target) => self.backend.draw_image(target, image, min, max, opacity, blend),
            None => log::warn!("image draw with no bound render target"),
        }
    }

    pub fn clear_frame(&mut self, frame: FrameKind, color: Color) {
        self.backend.clear_frame(frame, color);
    }

    /// Drape the resident texture `key` over `sector`. Returns false when the
    /// texture is no longer resident.
    pub fn composite_tile(
        &mut self,
        frame: FrameKind,
        sector: &Sector,
        key: &TextureKey,
        outline: Option<Color>,
    ) -> bool {
        let globe = *self.view.globe();
        match self.textures.get(key) {
            Some(texture) => {
                self.backend.composite(frame, &self.view, &globe, sector, texture, outline);
                true
            }
            None => false,
        }
    }

    pub fn read_pixel(&self, frame: FrameKind, x: i32, y: i32) -> Option<Color> {
        self.backend.read_pixel(frame, x, y)
    }
}

/// Binds an offscreen texture as the draw target for its lifetime.
///
/// The texture is taken out of the cache (or allocated) on creation, cleared
/// to the background color, and handed back to the cache when the guard is
/// dropped, on every exit path. Any previously bound target is restored.
pub struct RenderToTexture<'a> {
    dc: &'a mut DrawContext,
    key: TextureKey,
    previous: Option<Texture>,
}

impl<'a> RenderToTexture<'a> {
    pub fn begin(
        dc: &'a mut DrawContext,
        key: TextureKey,
        width: u32,
        height: u32,
        filter: TextureFilter,
        mipmapped: bool,
        background: Color,
    ) -> Self {
        let texture = match dc.textures.take(&key) {
            Some(existing) if existing.width() == width && existing.height() == height => existing,
            _ => Texture::new(width, height),
        }
        .with_filter(filter)
        .with_mipmaps(mipmapped);

        let previous = dc.target.replace(texture);
        dc.clear_target(background);
        Self { dc, key, previous }
    }

    pub fn key(&self) -> TextureKey {
        self.key
    }
}

impl Deref for RenderToTexture<'_> {
    type Target = DrawContext;

    fn deref(&self) -> &DrawContext {
        self.dc
    }
}

impl DerefMut for RenderToTexture<'_> {
    fn deref_mut(&mut self) -> &mut DrawContext {
        self.dc
    }
}

impl Drop for RenderToTexture<'_> {
    fn drop(&mut self) {
        if let Some(texture) = self.dc.target.take() {
            self.dc.textures.put(self.key, texture);
        }
        self.dc.target = self.previous.take();
    }
}
