//! Surface shapes: outlines and filled regions draped over the globe.
//!
//! Every shape kind reduces to a list of geographic locations. Sectors are
//! computed from those locations (or from an enclosing circle for ellipses),
//! and rendering densifies them to the tile's resolution, fixes up the
//! antimeridian, and hands flat pixel lists to the draw context.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::{Mutex, MutexGuard, PoisonError};

use glam::DVec2;

use crate::cache::{CacheEntry, ShapeCache};
use crate::error::{Error, Result};
use crate::geo::{locations_cross_dateline, sign, LatLon, PathType, Sector};
use crate::object::{SurfaceObject, Timestamp};
use crate::render::raster::polygon_area;
use crate::render::{Color, DrawContext, DrawMode, Region, RegionTransform};
use crate::view::Globe;

pub mod dateline;
pub mod icons;
pub mod image;
pub mod support;

pub use dateline::{InteriorContour, OutlinePath, Pole, WindingRule};
pub use icons::SurfaceIcons;
pub use image::SurfaceImage;

use dateline::{enclosed_pole, fix_dateline_crossing_locations, interior_contour};
use support::{
    adjust_sectors_by_border_width, compute_bounding_sectors, edge_intervals_per_degree,
    generate_intermediate_locations,
};

pub const DEFAULT_TEXELS_PER_EDGE_INTERVAL: f64 = 50.0;
pub const DEFAULT_MIN_EDGE_INTERVALS: u32 = 0;
pub const DEFAULT_MAX_EDGE_INTERVALS: u32 = 100;
pub const DEFAULT_ELLIPSE_INTERVALS: u32 = 32;
pub const MIN_ELLIPSE_INTERVALS: u32 = 8;

/// Added to the outline width in pick mode when there is no interior to hit.
const PICK_OUTLINE_PADDING: f64 = 5.0;

/// Geometry of a surface shape.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    /// Filled ring. `winding` of `None` is derived from the ring itself.
    Polygon {
        locations: Vec<LatLon>,
        winding: Option<WindingRule>,
    },
    /// Outline only.
    Polyline { locations: Vec<LatLon>, closed: bool },
    /// The four corners of a sector, joined by straight lat/lon edges.
    Sector(Sector),
    /// Rectangle of `width` x `height` meters rotated by `heading` degrees.
    Quad {
        center: LatLon,
        width: f64,
        height: f64,
        heading: f64,
    },
    /// Radii in meters, heading in degrees clockwise from north.
    Ellipse {
        center: LatLon,
        major_radius: f64,
        minor_radius: f64,
        heading: f64,
        intervals: u32,
    },
}

impl ShapeKind {
    pub fn validate(&self) -> Result<()> {
        match *self {
            ShapeKind::Quad { width, height, .. } => {
                if !(width > 0.0 && height > 0.0) {
                    return Err(Error::InvalidDimensions { width, height });
                }
            }
            ShapeKind::Ellipse {
                major_radius,
                minor_radius,
                intervals,
                ..
            } => {
                for radius in [major_radius, minor_radius] {
                    if !(radius > 0.0) {
                        return Err(Error::InvalidRadius(radius));
                    }
                }
                if intervals < MIN_ELLIPSE_INTERVALS {
                    return Err(Error::TooFewIntervals {
                        min: MIN_ELLIPSE_INTERVALS,
                        got: intervals,
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn has_interior(&self) -> bool {
        !matches!(self, ShapeKind::Polyline { .. })
    }

    /// Defining locations before densification. Rings are closed, with the
    /// first location repeated at the end.
    pub fn base_locations(&self, globe: &Globe) -> Vec<LatLon> {
        match self {
            ShapeKind::Polygon { locations, .. } => closed_ring(locations),
            ShapeKind::Polyline { locations, .. } => locations.clone(),
            ShapeKind::Sector(sector) => closed_ring(&sector.corners()),
            ShapeKind::Quad {
                center,
                width,
                height,
                heading,
            } => quad_corners(globe, *center, *width, *height, *heading),
            ShapeKind::Ellipse {
                center,
                major_radius,
                minor_radius,
                heading,
                intervals,
            } => ellipse_locations(
                globe,
                *center,
                *major_radius,
                *minor_radius,
                *heading,
                (*intervals).max(MIN_ELLIPSE_INTERVALS),
            ),
        }
    }

    fn outline_mode(&self) -> DrawMode {
        match self {
            ShapeKind::Polyline { closed: true, .. } => DrawMode::LineLoop,
            _ => DrawMode::LineStrip,
        }
    }
}

fn closed_ring(locations: &[LatLon]) -> Vec<LatLon> {
    let mut ring = locations.to_vec();
    if let (Some(&first), Some(&last)) = (locations.first(), locations.last()) {
        if first != last {
            ring.push(first);
        }
    }
    ring
}

fn quad_corners(globe: &Globe, center: LatLon, width: f64, height: f64, heading: f64) -> Vec<LatLon> {
    let hw = width / 2.0;
    let hh = height / 2.0;
    let distance = hw.hypot(hh) / globe.radius();
    let heading = heading.to_radians();
    let angles = [(-hh).atan2(-hw), (-hh).atan2(hw), hh.atan2(hw), hh.atan2(-hw)];
    let corners: Vec<LatLon> = angles
        .iter()
        .map(|&angle| center.great_circle_end_position(FRAC_PI_2 - (angle - heading), distance))
        .collect();
    closed_ring(&corners)
}

/// `intervals` locations around the ellipse, counter-clockwise from the end
/// of the major axis, plus the first repeated.
fn ellipse_locations(
    globe: &Globe,
    center: LatLon,
    major_radius: f64,
    minor_radius: f64,
    heading: f64,
    intervals: u32,
) -> Vec<LatLon> {
    let heading = heading.to_radians();
    let step = TAU / intervals.max(1) as f64;
    let locations: Vec<LatLon> = (0..intervals)
        .map(|i| {
            let angle = i as f64 * step;
            let x = major_radius * angle.cos();
            let y = minor_radius * angle.sin();
            let distance = x.hypot(y);
            if distance == 0.0 {
                return center;
            }
            let azimuth = FRAC_PI_2 - ((x / distance).clamp(-1.0, 1.0).acos() * sign(y) - heading);
            center.great_circle_end_position(azimuth, distance / globe.radius())
        })
        .collect();
    closed_ring(&locations)
}

/// Colors, opacities and outline width of a shape.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeAttributes {
    pub draw_interior: bool,
    pub draw_outline: bool,
    pub interior_color: Color,
    pub outline_color: Color,
    pub interior_opacity: f64,
    pub outline_opacity: f64,
    /// Pixels.
    pub outline_width: f64,
}

impl Default for ShapeAttributes {
    fn default() -> Self {
        Self {
            draw_interior: true,
            draw_outline: true,
            interior_color: Color::WHITE,
            outline_color: Color::BLACK,
            interior_opacity: 1.0,
            outline_opacity: 1.0,
            outline_width: 1.0,
        }
    }
}

impl ShapeAttributes {
    pub fn validate(&self) -> Result<()> {
        for opacity in [self.interior_opacity, self.outline_opacity] {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(Error::InvalidOpacity(opacity));
            }
        }
        if !(self.outline_width >= 0.0) {
            return Err(Error::InvalidLineWidth(self.outline_width));
        }
        Ok(())
    }
}

struct ShapeState {
    kind: ShapeKind,
    attributes: ShapeAttributes,
    path_type: PathType,
    texels_per_edge_interval: f64,
    min_edge_intervals: u32,
    max_edge_intervals: u32,
    visible: bool,
    name: Option<String>,
    last_modified: Timestamp,
    sector_cache: ShapeCache<Vec<Sector>>,
    location_cache: ShapeCache<Vec<LatLon>>,
}

impl ShapeState {
    fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            attributes: ShapeAttributes::default(),
            path_type: PathType::default(),
            texels_per_edge_interval: DEFAULT_TEXELS_PER_EDGE_INTERVAL,
            min_edge_intervals: DEFAULT_MIN_EDGE_INTERVALS,
            max_edge_intervals: DEFAULT_MAX_EDGE_INTERVALS,
            visible: true,
            name: None,
            last_modified: Timestamp::now(),
            sector_cache: ShapeCache::default(),
            location_cache: ShapeCache::default(),
        }
    }

    /// Sector edges are straight in lat/lon whatever the configured path type.
    fn edge_path_type(&self) -> PathType {
        match self.kind {
            ShapeKind::Sector(_) => PathType::Linear,
            _ => self.path_type,
        }
    }

    fn winding(&self, ring: &[LatLon]) -> WindingRule {
        match self.kind {
            ShapeKind::Polygon {
                winding: Some(rule), ..
            } => rule,
            _ => WindingRule::of_ring(ring),
        }
    }

    fn compute_sectors(&self, globe: &Globe, texel_size: f64) -> Vec<Sector> {
        let sectors = match &self.kind {
            ShapeKind::Ellipse {
                center,
                major_radius,
                minor_radius,
                ..
            } => Sector::bounding_circle(*center, major_radius.max(*minor_radius) / globe.radius()),
            kind => {
                let locations = kind.base_locations(globe);
                let sectors = compute_bounding_sectors(&locations, self.edge_path_type());
                let pole = if kind.has_interior() {
                    enclosed_pole(&locations, self.winding(&locations))
                } else {
                    None
                };
                match (pole, Sector::union_all(&sectors)) {
                    (Some(Pole::North), Some(bounds)) => vec![Sector::new(bounds.min_lat, 90.0, -180.0, 180.0)],
                    (Some(Pole::South), Some(bounds)) => vec![Sector::new(-90.0, bounds.max_lat, -180.0, 180.0)],
                    _ => sectors,
                }
            }
        };

        match adjust_sectors_by_border_width(&sectors, self.attributes.outline_width, texel_size) {
            Ok(padded) => padded,
            Err(err) => {
                log::warn!("keeping unpadded shape sectors: {err}");
                sectors
            }
        }
    }

    fn compute_render_locations(&self, globe: &Globe, intervals_per_degree: f64) -> Vec<LatLon> {
        let min = self.min_edge_intervals;
        let max = self.max_edge_intervals.max(min);
        match &self.kind {
            ShapeKind::Ellipse {
                center,
                major_radius,
                minor_radius,
                heading,
                intervals,
            } => {
                let intervals = (*intervals).max(MIN_ELLIPSE_INTERVALS);
                let edge_angle = TAU / intervals as f64;
                let edge_degrees = (edge_angle * major_radius.max(*minor_radius) / globe.radius()).to_degrees();
                let per_edge = (intervals_per_degree * edge_degrees).clamp(min as f64, max as f64).ceil() as u32;
                let render_intervals = per_edge.saturating_mul(intervals).max(MIN_ELLIPSE_INTERVALS);
                ellipse_locations(globe, *center, *major_radius, *minor_radius, *heading, render_intervals)
            }
            ShapeKind::Polyline { locations, .. } => {
                generate_intermediate_locations(locations, self.path_type, intervals_per_degree, min, max, false)
            }
            kind => generate_intermediate_locations(
                &kind.base_locations(globe),
                self.edge_path_type(),
                intervals_per_degree,
                min,
                max,
                true,
            ),
        }
    }
}

/// Everything `render_to_region` needs, captured under the lock.
struct RenderPlan {
    locations: Vec<LatLon>,
    winding: WindingRule,
    has_interior: bool,
    outline_mode: DrawMode,
    attributes: ShapeAttributes,
}

/// A polygon, polyline, sector, quad or ellipse drawn into surface tiles.
///
/// Shapes are shared with the renderer behind an `Arc`; every setter takes
/// `&self`, validates first, and advances the modification time only when it
/// actually changes something.
pub struct SurfaceShape {
    state: Mutex<ShapeState>,
}

impl SurfaceShape {
    pub fn new(kind: ShapeKind) -> Result<Self> {
        kind.validate()?;
        Ok(Self {
            state: Mutex::new(ShapeState::new(kind)),
        })
    }

    pub fn polygon(locations: Vec<LatLon>) -> Self {
        Self {
            state: Mutex::new(ShapeState::new(ShapeKind::Polygon {
                locations,
                winding: None,
            })),
        }
    }

    pub fn polyline(locations: Vec<LatLon>, closed: bool) -> Self {
        Self {
            state: Mutex::new(ShapeState::new(ShapeKind::Polyline { locations, closed })),
        }
    }

    pub fn sector(sector: Sector) -> Self {
        Self {
            state: Mutex::new(ShapeState::new(ShapeKind::Sector(sector))),
        }
    }

    pub fn quad(center: LatLon, width: f64, height: f64, heading: f64) -> Result<Self> {
        Self::new(ShapeKind::Quad {
            center,
            width,
            height,
            heading,
        })
    }

    pub fn ellipse(center: LatLon, major_radius: f64, minor_radius: f64, heading: f64) -> Result<Self> {
        Self::new(ShapeKind::Ellipse {
            center,
            major_radius,
            minor_radius,
            heading,
            intervals: DEFAULT_ELLIPSE_INTERVALS,
        })
    }

    pub fn with_attributes(self, attributes: ShapeAttributes) -> Result<Self> {
        self.set_attributes(attributes)?;
        Ok(self)
    }

    pub fn with_path_type(self, path_type: PathType) -> Self {
        self.set_path_type(path_type);
        self
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.set_name(Some(name.into()));
        self
    }

    /// Fix the winding rule of a polygon instead of deriving it.
    pub fn with_winding(self, rule: WindingRule) -> Self {
        self.modify(|state| {
            if let ShapeKind::Polygon { winding, .. } = &mut state.kind {
                *winding = Some(rule);
            }
        });
        self
    }

    fn lock(&self) -> MutexGuard<'_, ShapeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn modify(&self, f: impl FnOnce(&mut ShapeState)) {
        let mut state = self.lock();
        f(&mut state);
        state.last_modified = Timestamp::now();
    }

    pub fn kind(&self) -> ShapeKind {
        self.lock().kind.clone()
    }

    pub fn attributes(&self) -> ShapeAttributes {
        self.lock().attributes.clone()
    }

    pub fn path_type(&self) -> PathType {
        self.lock().path_type
    }

    pub fn texels_per_edge_interval(&self) -> f64 {
        self.lock().texels_per_edge_interval
    }

    pub fn edge_interval_range(&self) -> (u32, u32) {
        let state = self.lock();
        (state.min_edge_intervals, state.max_edge_intervals)
    }

    pub fn name(&self) -> Option<String> {
        self.lock().name.clone()
    }

    pub fn set_kind(&self, kind: ShapeKind) -> Result<()> {
        kind.validate()?;
        self.modify(|state| state.kind = kind);
        Ok(())
    }

    pub fn set_attributes(&self, attributes: ShapeAttributes) -> Result<()> {
        attributes.validate()?;
        self.modify(|state| state.attributes = attributes);
        Ok(())
    }

    pub fn set_path_type(&self, path_type: PathType) {
        self.modify(|state| state.path_type = path_type);
    }

    pub fn set_texels_per_edge_interval(&self, texels: f64) -> Result<()> {
        if !(texels > 0.0) {
            return Err(Error::InvalidEdgeInterval(texels));
        }
        self.modify(|state| state.texels_per_edge_interval = texels);
        Ok(())
    }

    pub fn set_edge_interval_range(&self, min: u32, max: u32) -> Result<()> {
        if min > max {
            return Err(Error::InvalidEdgeIntervalRange { min, max });
        }
        self.modify(|state| {
            state.min_edge_intervals = min;
            state.max_edge_intervals = max;
        });
        Ok(())
    }

    pub fn set_visible(&self, visible: bool) {
        self.modify(|state| state.visible = visible);
    }

    /// Naming does not change appearance, so the modification time stays.
    pub fn set_name(&self, name: Option<String>) {
        self.lock().name = name;
    }

    fn render_plan(&self, globe: &Globe, sector: &Sector, region: Region) -> Option<RenderPlan> {
        let mut state = self.lock();
        if !state.visible {
            return None;
        }
        let intervals_per_degree = edge_intervals_per_degree(sector, region, state.texels_per_edge_interval);
        let stamp = state.last_modified;
        let locations = match state.location_cache.get_valid(intervals_per_degree, stamp) {
            Some(locations) => locations,
            None => {
                let locations = state.compute_render_locations(globe, intervals_per_degree);
                state
                    .location_cache
                    .put(intervals_per_degree, CacheEntry::new(locations.clone(), stamp));
                locations
            }
        };
        if locations.is_empty() {
            return None;
        }

        let winding = match &state.kind {
            ShapeKind::Polygon { locations: ring, .. } => state.winding(&closed_ring(ring)),
            _ => state.winding(&locations),
        };
        Some(RenderPlan {
            winding,
            has_interior: state.kind.has_interior(),
            outline_mode: state.kind.outline_mode(),
            attributes: state.attributes.clone(),
            locations,
        })
    }
}

/// Fill the ring, plus a copy shifted by ±360° when it runs past the seam.
fn draw_interior(
    dc: &mut DrawContext,
    transform: &RegionTransform,
    locations: &[LatLon],
    winding: WindingRule,
    color: Color,
) {
    let contour = interior_contour(locations, winding);
    if contour.is_degenerate() {
        log::trace!("interior skipped: {} vertices", contour.locations.len());
        return;
    }
    let pixels: Vec<DVec2> = contour.locations.iter().map(|&ll| transform.location_to_pixel(ll)).collect();
    if polygon_area(&pixels) == 0.0 {
        log::trace!("interior skipped: zero area");
        return;
    }
    dc.draw(DrawMode::Polygon, &pixels, color, 1.0);

    if let Some(offset) = contour.second_pass_offset {
        let shifted: Vec<DVec2> = contour
            .locations
            .iter()
            .map(|ll| transform.to_pixel(ll.lon + offset, ll.lat))
            .collect();
        dc.draw(DrawMode::Polygon, &shifted, color, 1.0);
    }
}

/// Stroke the path, plus a copy shifted by ±360° when it runs past the seam.
fn draw_outline(
    dc: &mut DrawContext,
    transform: &RegionTransform,
    locations: &[LatLon],
    mode: DrawMode,
    color: Color,
    width: f64,
) {
    // An unwrapped loop no longer ends where it starts, so it is closed by hand.
    let closed;
    let (locations, mode) = match mode {
        DrawMode::LineLoop => {
            closed = closed_ring(locations);
            if locations_cross_dateline(&closed) {
                (&closed[..], DrawMode::LineStrip)
            } else {
                (locations, mode)
            }
        }
        _ => (locations, mode),
    };

    let path = fix_dateline_crossing_locations(transform.sector(), locations);
    if path.locations.len() < 2 {
        return;
    }
    let pixels: Vec<DVec2> = path.locations.iter().map(|&ll| transform.location_to_pixel(ll)).collect();
    dc.draw(mode, &pixels, color, width);

    if let Some(offset) = path.second_pass_offset {
        let shifted: Vec<DVec2> = path
            .locations
            .iter()
            .map(|ll| transform.to_pixel(ll.lon + offset, ll.lat))
            .collect();
        dc.draw(mode, &shifted, color, width);
    }
}

impl SurfaceObject for SurfaceShape {
    fn is_visible(&self) -> bool {
        self.lock().visible
    }

    fn last_modified(&self) -> Timestamp {
        self.lock().last_modified
    }

    fn sectors(&self, globe: &Globe, texel_size: f64) -> Option<Vec<Sector>> {
        let mut state = self.lock();
        let stamp = state.last_modified;
        let sectors = match state.sector_cache.get_valid(texel_size, stamp) {
            Some(sectors) => sectors,
            None => {
                let sectors = state.compute_sectors(globe, texel_size);
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
        let Some(plan) = self.render_plan(&globe, sector, region) else {
            return;
        };

        let picking = dc.is_picking_mode();
        let pick_color = dc.current_pick_color();
        let attributes = &plan.attributes;
        let interior_enabled = plan.has_interior && attributes.draw_interior;

        if interior_enabled && (picking || attributes.interior_opacity > 0.0) {
            let color = if picking {
                pick_color
            } else {
                attributes.interior_color.with_opacity(attributes.interior_opacity)
            };
            draw_interior(dc, &transform, &plan.locations, plan.winding, color);
        }

        if attributes.draw_outline && attributes.outline_width > 0.0 && (picking || attributes.outline_opacity > 0.0) {
            let (color, width) = if picking {
                let width = if interior_enabled {
                    attributes.outline_width
                } else {
                    attributes.outline_width + PICK_OUTLINE_PADDING
                };
                (pick_color, width)
            } else {
                (
                    attributes.outline_color.with_opacity(attributes.outline_opacity),
                    attributes.outline_width,
                )
            };
            draw_outline(dc, &transform, &plan.locations, plan.outline_mode, color, width);
        }
    }

    fn display_name(&self) -> Option<String> {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RenderToTexture, Texture, TextureFilter, TextureKey};
    use crate::testing::{recording_context, view_at, DrawCall};
    use crate::view::EARTH_RADIUS;

    fn ll(lat: f64, lon: f64) -> LatLon {
        LatLon::new(lat, lon)
    }

    fn square(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> SurfaceShape {
        SurfaceShape::polygon(vec![
            ll(min_lat, min_lon),
            ll(min_lat, max_lon),
            ll(max_lat, max_lon),
            ll(max_lat, min_lon),
        ])
        .with_path_type(PathType::Linear)
    }

    fn render(shape: &SurfaceShape, sector: Sector, picking: bool) -> (Vec<DrawCall>, Color) {
        let (mut dc, log) = recording_context(view_at(0.0, 0.0, 1.0e7));
        dc.set_picking_mode(picking);
        let pick_color = dc.unique_pick_color();
        dc.set_current_pick_color(pick_color);
        {
            let key = TextureKey::Object { cache_id: 1 };
            let mut rt =
                RenderToTexture::begin(&mut dc, key, 64, 64, TextureFilter::Nearest, false, Color::TRANSPARENT);
            shape.render_to_region(&mut rt, &sector, Region::full(64, 64));
        }
        (log.draws(), pick_color)
    }

    fn render_texture(shape: &SurfaceShape, sector: Sector) -> Texture {
        let (mut dc, _) = recording_context(view_at(0.0, 0.0, 1.0e7));
        let key = TextureKey::Object { cache_id: 1 };
        {
            let mut rt =
                RenderToTexture::begin(&mut dc, key, 64, 64, TextureFilter::Nearest, false, Color::TRANSPARENT);
            shape.render_to_region(&mut rt, &sector, Region::full(64, 64));
        }
        dc.textures_mut().get(&key).expect("resident").clone()
    }

    #[test]
    fn test_polygon_draws_interior_then_outline() {
        let shape = square(10.0, 20.0, 10.0, 20.0);
        let (draws, _) = render(&shape, Sector::new(0.0, 30.0, 0.0, 30.0), false);
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].mode, DrawMode::Polygon);
        assert_eq!(draws[0].state.color, Color::WHITE);
        assert!(draws[0].state.blend);
        assert_eq!(draws[1].mode, DrawMode::LineStrip);
        assert_eq!(draws[1].state.color, Color::BLACK);
        assert_eq!(draws[1].state.line_width, 1.0);
    }

    #[test]
    fn test_pick_mode_uses_pick_color_without_padding_when_filled() {
        let shape = square(10.0, 20.0, 10.0, 20.0);
        let (draws, pick) = render(&shape, Sector::new(0.0, 30.0, 0.0, 30.0), true);
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|d| d.state.color == pick && !d.state.blend));
        assert_eq!(draws[1].state.line_width, 1.0);
    }

    #[test]
    fn test_pick_mode_widens_polyline() {
        let shape = SurfaceShape::polyline(vec![ll(5.0, 5.0), ll(25.0, 25.0)], false).with_path_type(PathType::Linear);
        let (draws, pick) = render(&shape, Sector::new(0.0, 30.0, 0.0, 30.0), true);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mode, DrawMode::LineStrip);
        assert_eq!(draws[0].state.color, pick);
        assert_eq!(draws[0].state.line_width, 6.0);
    }

    #[test]
    fn test_closed_polyline_draws_line_loop() {
        let shape = SurfaceShape::polyline(vec![ll(5.0, 5.0), ll(25.0, 5.0), ll(15.0, 25.0)], true)
            .with_path_type(PathType::Linear);
        let (draws, _) = render(&shape, Sector::new(0.0, 30.0, 0.0, 30.0), false);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mode, DrawMode::LineLoop);
    }

    #[test]
    fn test_dateline_polygon_fills_twice() {
        let shape = square(-5.0, 5.0, 175.0, -175.0);
        let (draws, _) = render(&shape, Sector::new(-10.0, 10.0, -180.0, -170.0), false);
        let fills = draws.iter().filter(|d| d.mode == DrawMode::Polygon).count();
        assert_eq!(fills, 2);
        let outlines: Vec<&DrawCall> = draws.iter().filter(|d| d.mode == DrawMode::LineStrip).collect();
        assert_eq!(outlines.len(), 2);
        // The shifted stroke lands next to the tile instead of a turn away.
        assert!(outlines[1].vertices.iter().all(|p| p.x.abs() <= 64.0));
    }

    #[test]
    fn test_outline_crossing_both_meridians_stays_contiguous() {
        let shape = SurfaceShape::polyline(vec![ll(0.0, -10.0), ll(0.0, 5.0), ll(15.0, 170.0), ll(15.0, -170.0)], false)
            .with_path_type(PathType::Linear);
        let sector = Sector::new(-18.0, 18.0, 0.0, 36.0);
        let texture = render_texture(&shape, sector);
        let transform = RegionTransform::new(sector, Region::full(64, 64)).expect("transform");

        let inked_near = |lat: f64, lon: f64| {
            let p = transform.location_to_pixel(ll(lat, lon));
            let (x, y) = (p.x.floor() as i32, p.y.floor() as i32);
            (y - 1..=y + 1).any(|row| texture.pixel(x, row).is_some_and(|c| c.a > 0))
        };
        assert!(inked_near(0.0, 2.0), "stroke from -10 to 5 missing");
        assert!(!inked_near(0.0, 25.0), "stroke drawn across the tile");
    }

    #[test]
    fn test_pole_ring_outline_has_no_seam_jump() {
        let ring: Vec<LatLon> = (-180..180).step_by(20).map(|lon| ll(-65.0, lon as f64)).collect();
        let shape = SurfaceShape::polygon(ring).with_path_type(PathType::Linear);
        let (draws, _) = render(&shape, Sector::new(-90.0, -54.0, 0.0, 36.0), false);
        let outlines: Vec<&DrawCall> = draws.iter().filter(|d| d.mode == DrawMode::LineStrip).collect();
        assert_eq!(outlines.len(), 1);
        // 20 degrees of longitude at 64 px per 36 degrees.
        let max_step = 20.0 * 64.0 / 36.0 + 1e-6;
        assert!(outlines[0].vertices.windows(2).all(|w| (w[1].x - w[0].x).abs() <= max_step));
    }

    #[test]
    fn test_closed_polyline_across_seam_is_closed_by_hand() {
        let locations = vec![ll(-5.0, 175.0), ll(-5.0, -175.0), ll(5.0, -175.0), ll(5.0, 175.0)];
        let shape = SurfaceShape::polyline(locations, true).with_path_type(PathType::Linear);
        let (draws, _) = render(&shape, Sector::new(-10.0, 10.0, 170.0, 180.0), false);
        assert!(draws.iter().all(|d| d.mode == DrawMode::LineStrip));
        let outline = &draws[0];
        assert_eq!(outline.vertices.first(), outline.vertices.last());
    }

    #[test]
    fn test_transparent_interior_only_drawn_when_picking() {
        let shape = square(10.0, 20.0, 10.0, 20.0);
        shape
            .set_attributes(ShapeAttributes {
                interior_opacity: 0.0,
                ..ShapeAttributes::default()
            })
            .expect("valid attributes");
        let sector = Sector::new(0.0, 30.0, 0.0, 30.0);
        let (display, _) = render(&shape, sector, false);
        assert!(display.iter().all(|d| d.mode != DrawMode::Polygon));
        let (pick, _) = render(&shape, sector, true);
        assert!(pick.iter().any(|d| d.mode == DrawMode::Polygon));
    }

    #[test]
    fn test_zero_width_outline_skipped() {
        let shape = square(10.0, 20.0, 10.0, 20.0);
        shape
            .set_attributes(ShapeAttributes {
                outline_width: 0.0,
                ..ShapeAttributes::default()
            })
            .expect("valid attributes");
        let (draws, _) = render(&shape, Sector::new(0.0, 30.0, 0.0, 30.0), true);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mode, DrawMode::Polygon);
    }

    #[test]
    fn test_invisible_shape_draws_nothing() {
        let shape = square(10.0, 20.0, 10.0, 20.0);
        shape.set_visible(false);
        let (draws, _) = render(&shape, Sector::new(0.0, 30.0, 0.0, 30.0), false);
        assert!(draws.is_empty());
    }

    #[test]
    fn test_degenerate_polygon_keeps_outline() {
        let shape = SurfaceShape::polygon(vec![ll(10.0, 10.0), ll(20.0, 20.0)]).with_path_type(PathType::Linear);
        let (draws, _) = render(&shape, Sector::new(0.0, 30.0, 0.0, 30.0), false);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mode, DrawMode::LineStrip);
    }

    #[test]
    fn test_sectors_cached_until_modified() {
        let globe = Globe::earth();
        let shape = square(10.0, 20.0, 10.0, 20.0);
        shape
            .set_attributes(ShapeAttributes {
                outline_width: 0.0,
                ..ShapeAttributes::default()
            })
            .expect("valid attributes");
        let texel = 1.0e-3;
        let first = shape.sectors(&globe, texel).expect("sectors");
        assert_eq!(first, vec![Sector::new(10.0, 20.0, 10.0, 20.0)]);
        assert_eq!(shape.sectors(&globe, texel), Some(first.clone()));

        shape
            .set_attributes(ShapeAttributes {
                outline_width: 10.0,
                ..ShapeAttributes::default()
            })
            .expect("valid attributes");
        let padded = shape.sectors(&globe, texel).expect("sectors");
        let pad = (texel * 5.0).to_degrees();
        assert!((padded[0].min_lat - (10.0 - pad)).abs() < 1e-9);
        assert!((padded[0].max_lon - (20.0 + pad)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_polygon_has_no_sectors() {
        let shape = SurfaceShape::polygon(Vec::new());
        assert!(shape.sectors(&Globe::earth(), 1.0e-3).is_none());
    }

    #[test]
    fn test_pole_ring_sector_reaches_pole() {
        let ring: Vec<LatLon> = [-179.0, -120.0, -60.0, 0.0, 60.0, 120.0]
            .iter()
            .map(|&lon| ll(70.0, lon))
            .collect();
        let shape = SurfaceShape::polygon(ring);
        let sectors = shape.sectors(&Globe::earth(), 1.0e-6).expect("sectors");
        assert_eq!(sectors.len(), 1);
        assert!(sectors[0].max_lat >= 90.0 - 1e-9);
        assert_eq!((sectors[0].min_lon, sectors[0].max_lon), (-180.0, 180.0));
        assert!(sectors[0].min_lat < 70.0);
    }

    #[test]
    fn test_invalid_setters_leave_state_unchanged() {
        let shape = square(10.0, 20.0, 10.0, 20.0);
        let stamp = shape.last_modified();
        let bad = ShapeAttributes {
            interior_opacity: 1.5,
            ..ShapeAttributes::default()
        };
        assert_eq!(shape.set_attributes(bad), Err(Error::InvalidOpacity(1.5)));
        assert_eq!(shape.set_texels_per_edge_interval(0.0), Err(Error::InvalidEdgeInterval(0.0)));
        assert_eq!(
            shape.set_edge_interval_range(10, 2),
            Err(Error::InvalidEdgeIntervalRange { min: 10, max: 2 })
        );
        assert_eq!(shape.attributes(), ShapeAttributes::default());
        assert_eq!(shape.edge_interval_range(), (0, 100));
        assert_eq!(shape.last_modified(), stamp);

        shape.set_visible(false);
        assert!(shape.last_modified() > stamp);
    }

    #[test]
    fn test_invalid_kinds_rejected() {
        assert!(matches!(
            SurfaceShape::ellipse(LatLon::ZERO, -1.0, 5.0, 0.0),
            Err(Error::InvalidRadius(_))
        ));
        assert!(matches!(
            SurfaceShape::quad(LatLon::ZERO, 0.0, 5.0, 0.0),
            Err(Error::InvalidDimensions { .. })
        ));
        let shape = SurfaceShape::ellipse(LatLon::ZERO, 10.0, 5.0, 0.0).expect("valid ellipse");
        let too_few = ShapeKind::Ellipse {
            center: LatLon::ZERO,
            major_radius: 10.0,
            minor_radius: 5.0,
            heading: 0.0,
            intervals: 3,
        };
        assert_eq!(shape.set_kind(too_few), Err(Error::TooFewIntervals { min: 8, got: 3 }));
    }

    #[test]
    fn test_ellipse_ring_follows_radii() {
        let globe = Globe::earth();
        let center = ll(10.0, 20.0);
        let kind = ShapeKind::Ellipse {
            center,
            major_radius: 100_000.0,
            minor_radius: 50_000.0,
            heading: 0.0,
            intervals: 32,
        };
        let ring = kind.base_locations(&globe);
        assert_eq!(ring.len(), 33);
        assert_eq!(ring[0], ring[32]);
        let meters = |p: LatLon| center.great_circle_distance(p) * EARTH_RADIUS;
        assert!((meters(ring[0]) - 100_000.0).abs() < 1.0);
        assert!((meters(ring[8]) - 50_000.0).abs() < 1.0);
        // Heading zero puts the major axis east.
        assert!(ring[0].lon > center.lon);
        assert!(ring[8].lat > center.lat);
    }

    #[test]
    fn test_ellipse_render_intervals_grow_with_resolution() {
        let globe = Globe::earth();
        let state = ShapeState::new(ShapeKind::Ellipse {
            center: LatLon::ZERO,
            major_radius: 500_000.0,
            minor_radius: 500_000.0,
            heading: 0.0,
            intervals: 32,
        });
        assert_eq!(state.compute_render_locations(&globe, 0.0).len(), 9);
        let fine = state.compute_render_locations(&globe, 10.0);
        assert!(fine.len() > 33);
    }

    #[test]
    fn test_quad_corners_are_equidistant() {
        let globe = Globe::earth();
        let center = ll(-30.0, 45.0);
        let kind = ShapeKind::Quad {
            center,
            width: 20_000.0,
            height: 10_000.0,
            heading: 30.0,
        };
        let ring = kind.base_locations(&globe);
        assert_eq!(ring.len(), 5);
        let expected = 10_000.0_f64.hypot(5_000.0);
        for corner in &ring[..4] {
            let meters = center.great_circle_distance(*corner) * EARTH_RADIUS;
            assert!((meters - expected).abs() < 0.5, "corner at {meters} m");
        }
    }

    #[test]
    fn test_sector_shape_uses_linear_edges() {
        let globe = Globe::earth();
        let shape = SurfaceShape::sector(Sector::new(40.0, 50.0, 0.0, 60.0));
        shape
            .set_attributes(ShapeAttributes {
                outline_width: 0.0,
                ..ShapeAttributes::default()
            })
            .expect("valid attributes");
        let sectors = shape.sectors(&globe, 1.0e-3).expect("sectors");
        // A great circle top edge would bulge north of 50.
        assert_eq!(sectors, vec![Sector::new(40.0, 50.0, 0.0, 60.0)]);
    }
}
