//! The two signals the solver takes from user input.

use glam::Vec2;

/// An attraction point, in simulation coordinates, and whether it's currently pulling.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Interaction {
    pub point: Vec2,
    pub active: bool,
}

impl Interaction {
    pub fn new(point: Vec2, active: bool) -> Self {
        Self { point, active }
    }

    /// From a window cursor position, where y grows downward, to simulation coordinates, where
    /// y grows upward.
    pub fn from_window(cursor: Vec2, window_height: f32, pressed: bool) -> Self {
        Self {
            point: Vec2::new(cursor.x, window_height - cursor.y),
            active: pressed,
        }
    }
}
