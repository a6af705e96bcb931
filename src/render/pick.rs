use std::collections::HashMap;

use super::Color;
use crate::geo::LatLon;
use crate::object::SharedObject;

/// Largest 24-bit color code.
const MAX_PICK_CODE: u32 = 0x00FF_FFFF;

/// Hands out distinct opaque colors for one frame of picking.
///
/// Codes count up from 1 and skip the code of the pick frame's clear color.
/// After the last 24-bit code the counter wraps back to the start, so aliasing
/// is only possible once more than 16 million colors were issued in a frame.
#[derive(Clone, Debug)]
pub struct PickColorAllocator {
    next: u32,
    clear_code: u32,
}

impl PickColorAllocator {
    pub fn new(clear_color: Color) -> Self {
        Self {
            next: 1,
            clear_code: clear_color.to_rgb_u32(),
        }
    }

    pub fn clear_color(&self) -> Color {
        Color::from_rgb_u32(self.clear_code)
    }

    /// Start over; called once per frame.
    pub fn reset(&mut self) {
        self.next = 1;
    }

    pub fn next_color(&mut self) -> Color {
        loop {
            let code = self.next;
            self.next = if code >= MAX_PICK_CODE { 1 } else { code + 1 };
            if code != self.clear_code {
                return Color::from_rgb_u32(code);
            }
        }
    }
}

impl Default for PickColorAllocator {
    fn default() -> Self {
        Self::new(Color::TRANSPARENT)
    }
}

/// Color-code to object table for one pick pass.
#[derive(Default)]
pub struct PickSupport {
    candidates: HashMap<u32, SharedObject>,
}

impl PickSupport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, color: Color, object: SharedObject) {
        self.candidates.insert(color.to_rgb_u32(), object);
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Object drawn with `color`, ignoring alpha.
    pub fn resolve(&self, color: Color) -> Option<SharedObject> {
        self.candidates.get(&color.to_rgb_u32()).cloned()
    }
}

/// A hit produced by picking.
#[derive(Clone)]
pub struct PickedObject {
    pub color: Color,
    pub object: SharedObject,
    /// Terrain position under the pick point.
    pub position: Option<LatLon>,
    /// Label of the layer that performed the pick.
    pub layer: Option<String>,
    pub on_top: bool,
}

impl std::fmt::Debug for PickedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickedObject")
            .field("color", &self.color)
            .field("object", &self.object.display_name())
            .field("position", &self.position)
            .field("layer", &self.layer)
            .field("on_top", &self.on_top)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_colors_are_distinct_and_skip_clear() {
        let clear = Color::rgb(0, 0, 3);
        let mut alloc = PickColorAllocator::new(clear);
        let colors: Vec<Color> = (0..1000).map(|_| alloc.next_color()).collect();
        let unique: HashSet<u32> = colors.iter().map(|c| c.to_rgb_u32()).collect();
        assert_eq!(unique.len(), colors.len());
        assert!(!unique.contains(&clear.to_rgb_u32()));
        assert!(colors.iter().all(|c| c.a == 255));
    }

    #[test]
    fn test_counter_wraps_before_exhaustion() {
        let mut alloc = PickColorAllocator::default();
        alloc.next = MAX_PICK_CODE;
        assert_eq!(alloc.next_color().to_rgb_u32(), MAX_PICK_CODE);
        assert_eq!(alloc.next_color().to_rgb_u32(), 1);
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut alloc = PickColorAllocator::default();
        let first = alloc.next_color();
        alloc.next_color();
        alloc.reset();
        assert_eq!(alloc.next_color(), first);
    }
}
