//! Tiled, view-adaptive rendering of surface objects (shapes, images and
//! icon sets) draped over a virtual globe.
//!
//! Objects are rasterized into a quadtree of offscreen tiles whose level of
//! detail follows the view, and each tile is only redrawn when the objects it
//! shows change. A single pick tile under the cursor resolves picks by color.

pub mod cache;
pub mod error;
pub mod geo;
pub mod object;
pub mod render;
pub mod shape;
pub mod tiles;
pub mod view;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use geo::{LatLon, PathType, Sector};
pub use object::{object_id, SharedObject, SurfaceObject, Timestamp};
pub use render::{Color, DrawContext, PickedObject, SoftwareBackend};
pub use shape::{ShapeAttributes, ShapeKind, SurfaceIcons, SurfaceImage, SurfaceShape};
pub use tiles::{FrameStats, RendererConfig, TiledSurfaceRenderer};
pub use view::{Globe, View, Viewport};
