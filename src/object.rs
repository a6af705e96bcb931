use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::geo::Sector;
use crate::render::{DrawContext, Region};
use crate::view::Globe;

static CLOCK: AtomicU64 = AtomicU64::new(1);

/// Logical modification time. Every call to [`Timestamp::now`] returns a value
/// strictly greater than all earlier ones in the process, so an object edit and
/// a later tile rebuild are always ordered even within one clock tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn now() -> Self {
        Timestamp(CLOCK.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Anything that can be rasterized into surface tiles.
///
/// Implementations are shared between the application and the renderer as
/// `Arc<dyn SurfaceObject>` and mutate through interior locking, bumping
/// `last_modified` on every change that affects appearance.
pub trait SurfaceObject: Send + Sync {
    fn is_visible(&self) -> bool;

    fn last_modified(&self) -> Timestamp;

    /// Sectors covered by this object when drawn at `texel_size` radians per
    /// texel. `None` means nothing to contribute. The result may be cached by
    /// the caller until `last_modified` advances.
    fn sectors(&self, globe: &Globe, texel_size: f64) -> Option<Vec<Sector>>;

    /// Draw into `region` of the bound target, which maps onto `sector`.
    /// Must depend only on the object's state and the arguments; pick mode
    /// is read from the context.
    fn render_to_region(&self, dc: &mut DrawContext, sector: &Sector, region: Region);

    fn display_name(&self) -> Option<String> {
        None
    }
}

pub type SharedObject = Arc<dyn SurfaceObject>;

/// Identity of a shared object, stable while any reference to it is alive.
#[inline(always)]
pub fn object_id(object: &SharedObject) -> usize {
    Arc::as_ptr(object) as *const () as usize
}
