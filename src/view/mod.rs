//! The camera: eye placement, perspective projection, frustum culling and
//! pick rays.

use glam::{DMat4, DVec2, DVec3, DVec4};

use crate::error::{Error, Result};
use crate::geo::{LatLon, Sector};

pub mod globe;
pub mod visible;

pub use globe::{Globe, SmoothTerrain, Terrain, EARTH_RADIUS};

pub const DEFAULT_FIELD_OF_VIEW: f64 = 45.0;

/// Screen size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

/// Half-line in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    /// Unit length.
    pub direction: DVec3,
}

impl Ray {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn point_at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

/// Bounding sphere of a piece of the globe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub center: DVec3,
    pub radius: f64,
}

impl Extent {
    /// Sphere around the surface patch under `sector`, from a 3x3 sample grid
    /// padded by the bulge of the surface between neighbouring samples.
    pub fn from_sector(globe: &Globe, sector: &Sector) -> Self {
        let points = sector.sample_points().map(|ll| globe.compute_point(ll, 0.0));
        let center = points.iter().copied().sum::<DVec3>() / points.len() as f64;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f64, f64::max);
        let half_spacing = (sector.delta_lat().max(sector.delta_lon()) / 4.0).min(90.0).to_radians();
        let bulge = globe.radius() * (1.0 - half_spacing.cos());
        Self {
            center,
            radius: radius * 1.01 + bulge + 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Plane {
    normal: DVec3,
    distance: f64,
}

impl Plane {
    fn from_row(v: DVec4) -> Self {
        let normal = v.truncate();
        let len = normal.length();
        if len == 0.0 {
            return Self { normal, distance: v.w };
        }
        Self {
            normal: normal / len,
            distance: v.w / len,
        }
    }

    #[inline(always)]
    fn signed_distance(&self, p: DVec3) -> f64 {
        self.normal.dot(p) + self.distance
    }
}

/// Six inward-facing planes of the view volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix with clip depth in [0, 1].
    pub fn from_matrix(m: &DMat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        Self {
            planes: [
                Plane::from_row(r3 + r0),
                Plane::from_row(r3 - r0),
                Plane::from_row(r3 + r1),
                Plane::from_row(r3 - r1),
                Plane::from_row(r2),
                Plane::from_row(r3 - r2),
            ],
        }
    }

    pub fn intersects(&self, extent: &Extent) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(extent.center) >= -extent.radius)
    }

    pub fn contains(&self, point: DVec3) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(point) >= 0.0)
    }
}

/// Perspective camera looking straight down at the globe from above `eye`,
/// rotated by `heading` degrees clockwise from north.
#[derive(Clone, Debug)]
pub struct View {
    globe: Globe,
    eye: LatLon,
    altitude: f64,
    heading: f64,
    field_of_view: f64,
    viewport: Viewport,
    eye_point: DVec3,
    view_projection: DMat4,
    inverse_view_projection: DMat4,
    frustum: Frustum,
}

impl View {
    pub fn new(globe: Globe, eye: LatLon, altitude: f64, viewport: Viewport) -> Result<Self> {
        validate_altitude(altitude)?;
        validate_viewport(viewport)?;
        let mut view = Self {
            globe,
            eye,
            altitude,
            heading: 0.0,
            field_of_view: DEFAULT_FIELD_OF_VIEW,
            viewport,
            eye_point: DVec3::ZERO,
            view_projection: DMat4::IDENTITY,
            inverse_view_projection: DMat4::IDENTITY,
            frustum: Frustum::from_matrix(&DMat4::IDENTITY),
        };
        view.recompute();
        Ok(view)
    }

    /// Horizontal field of view in degrees.
    pub fn with_field_of_view(mut self, degrees: f64) -> Result<Self> {
        if !(degrees > 0.0 && degrees < 180.0) {
            return Err(Error::InvalidFieldOfView(degrees));
        }
        self.field_of_view = degrees;
        self.recompute();
        Ok(self)
    }

    pub fn with_heading(mut self, degrees: f64) -> Self {
        self.heading = degrees;
        self.recompute();
        self
    }

    pub fn set_eye(&mut self, eye: LatLon, altitude: f64) -> Result<()> {
        validate_altitude(altitude)?;
        self.eye = LatLon::new(eye.lat.clamp(-90.0, 90.0), crate::geo::normalize_lon(eye.lon));
        self.altitude = altitude;
        self.recompute();
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        validate_viewport(viewport)?;
        self.viewport = viewport;
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        let up_dir = self.eye.to_unit_vector();
        self.eye_point = self.globe.compute_point(self.eye, self.altitude);

        let lat = self.eye.lat.to_radians();
        let lon = self.eye.lon.to_radians();
        // Derivative of the unit vector with respect to latitude points north.
        let north = DVec3::new(-lat.sin() * lon.cos(), -lat.sin() * lon.sin(), lat.cos());
        let east = north.cross(up_dir).normalize_or_zero();
        let heading = self.heading.to_radians();
        // Screen-up after turning the camera clockwise by `heading`.
        let screen_up = (north * heading.cos() + east * heading.sin()).normalize_or_zero();

        let view = DMat4::look_at_rh(self.eye_point, DVec3::ZERO, screen_up);

        let aspect = self.viewport.aspect();
        let half_x = (self.field_of_view.to_radians() / 2.0).tan();
        let fov_y = 2.0 * (half_x / aspect).atan();
        let near = (self.altitude * 0.5).max(0.1);
        let far = self.eye_point.length() + self.globe.radius();
        let projection = DMat4::perspective_rh(fov_y, aspect, near, far);

        self.view_projection = projection * view;
        self.inverse_view_projection = self.view_projection.inverse();
        self.frustum = Frustum::from_matrix(&self.view_projection);
    }

    pub fn globe(&self) -> &Globe {
        &self.globe
    }

    pub fn eye_position(&self) -> LatLon {
        self.eye
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn field_of_view(&self) -> f64 {
        self.field_of_view
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn eye_point(&self) -> DVec3 {
        self.eye_point
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Size in meters of one screen pixel at `distance` meters from the eye.
    pub fn pixel_size_at_distance(&self, distance: f64) -> f64 {
        let half = (self.field_of_view.to_radians() / 2.0).tan();
        2.0 * distance.abs() * half / self.viewport.width.max(1) as f64
    }

    /// Screen position (pixels, y down) of a world point, `None` behind the eye.
    pub fn project(&self, point: DVec3) -> Option<DVec2> {
        let clip = self.view_projection * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(DVec2::new(
            (ndc.x + 1.0) / 2.0 * self.viewport.width as f64,
            (1.0 - ndc.y) / 2.0 * self.viewport.height as f64,
        ))
    }

    /// Ray from the eye through screen point (`x`, `y`).
    pub fn ray_through(&self, x: f64, y: f64) -> Ray {
        let ndc_x = 2.0 * x / self.viewport.width as f64 - 1.0;
        let ndc_y = 1.0 - 2.0 * y / self.viewport.height as f64;
        let near = self.inverse_view_projection.project_point3(DVec3::new(ndc_x, ndc_y, 0.0));
        let far = self.inverse_view_projection.project_point3(DVec3::new(ndc_x, ndc_y, 1.0));
        Ray::new(self.eye_point, far - near)
    }
}

fn validate_altitude(altitude: f64) -> Result<()> {
    if altitude > 0.0 && altitude.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidAltitude(altitude))
    }
}

fn validate_viewport(viewport: Viewport) -> Result<()> {
    if viewport.is_empty() {
        return Err(Error::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }
    Ok(())
}
