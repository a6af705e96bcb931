//! Test fixtures: a backend that records every call while still rasterizing.

use std::sync::{Arc, Mutex};

use glam::DVec2;

use crate::geo::{LatLon, Sector};
use crate::render::{Color, DrawContext, DrawMode, DrawState, FrameKind, RenderBackend, SoftwareBackend, Texture};
use crate::view::{Globe, View, Viewport};

#[derive(Clone, Debug)]
pub(crate) struct DrawCall {
    pub mode: DrawMode,
    pub vertices: Vec<DVec2>,
    pub state: DrawState,
}

#[derive(Clone, Debug)]
pub(crate) enum Recorded {
    Clear(Color),
    Draw(DrawCall),
    Image { min: DVec2, max: DVec2, opacity: f64, blend: bool },
    Composite { frame: FrameKind, sector: Sector, outline: Option<Color> },
    ClearFrame(FrameKind, Color),
}

/// Shared handle on the calls a [`RecordingBackend`] has seen.
#[derive(Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<Recorded>>>);

impl CallLog {
    fn push(&self, call: Recorded) {
        self.0.lock().expect("call log poisoned").push(call);
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.0
            .lock()
            .expect("call log poisoned")
            .iter()
            .filter_map(|call| match call {
                Recorded::Draw(draw) => Some(draw.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn composites(&self) -> Vec<(FrameKind, Sector, Option<Color>)> {
        self.0
            .lock()
            .expect("call log poisoned")
            .iter()
            .filter_map(|call| match call {
                Recorded::Composite { frame, sector, outline } => Some((*frame, *sector, *outline)),
                _ => None,
            })
            .collect()
    }

    pub fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.0.lock().expect("call log poisoned"))
    }

    pub fn clear(&self) {
        self.0.lock().expect("call log poisoned").clear();
    }
}

pub(crate) struct RecordingBackend {
    inner: SoftwareBackend,
    log: CallLog,
}

impl RenderBackend for RecordingBackend {
    fn max_texture_size(&self) -> u32 {
        self.inner.max_texture_size()
    }

    fn clear(&mut self, target: &mut Texture, color: Color) {
        self.log.push(Recorded::Clear(color));
        self.inner.clear(target, color);
    }

    fn draw(&mut self, target: &mut Texture, mode: DrawMode, vertices: &[DVec2], state: &DrawState) {
        self.log.push(Recorded::Draw(DrawCall {
            mode,
            vertices: vertices.to_vec(),
            state: *state,
        }));
        self.inner.draw(target, mode, vertices, state);
    }

    fn draw_image(&mut self, target: &mut Texture, image: &Texture, min: DVec2, max: DVec2, opacity: f64, blend: bool) {
        self.log.push(Recorded::Image { min, max, opacity, blend });
        self.inner.draw_image(target, image, min, max, opacity, blend);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner.resize(width, height);
    }

    fn clear_frame(&mut self, frame: FrameKind, color: Color) {
        self.log.push(Recorded::ClearFrame(frame, color));
        self.inner.clear_frame(frame, color);
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
        self.log.push(Recorded::Composite {
            frame,
            sector: *sector,
            outline,
        });
        self.inner.composite(frame, view, globe, sector, texture, outline);
    }

    fn read_pixel(&self, frame: FrameKind, x: i32, y: i32) -> Option<Color> {
        self.inner.read_pixel(frame, x, y)
    }
}

/// Earth view over `(lat, lon)` at `altitude` meters on a 64x64 viewport.
pub(crate) fn view_at(lat: f64, lon: f64, altitude: f64) -> View {
    View::new(Globe::earth(), LatLon::new(lat, lon), altitude, Viewport::new(64, 64)).expect("valid view")
}

pub(crate) fn recording_context(view: View) -> (DrawContext, CallLog) {
    recording_context_with(view, SoftwareBackend::new(1, 1))
}

/// Like [`recording_context`] over a preconfigured backend. The context
/// resizes its frames to the viewport.
pub(crate) fn recording_context_with(view: View, backend: SoftwareBackend) -> (DrawContext, CallLog) {
    let log = CallLog::default();
    let backend = RecordingBackend {
        inner: backend,
        log: log.clone(),
    };
    (DrawContext::new(view, Box::new(backend)), log)
}
