//! Pointer and keyboard events fed to the interaction controller.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Pressure reported by devices without pressure sensing.
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// One pointer sample in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub position: Point,
    /// Normalized pressure in `[0, 1]`.
    pub pressure: f64,
}

impl PointerSample {
    pub fn new(position: Point, pressure: f64) -> Self {
        Self {
            position,
            pressure: pressure.clamp(0.0, 1.0),
        }
    }

    /// A mouse-style sample at `(x, y)` with default pressure.
    pub fn at(x: f64, y: f64) -> Self {
        Self::new(Point::new(x, y), DEFAULT_PRESSURE)
    }
}

impl From<Point> for PointerSample {
    fn from(position: Point) -> Self {
        Self::new(position, DEFAULT_PRESSURE)
    }
}

/// Keys the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// A printable character.
    Char(char),
    Backspace,
    Delete,
    Enter,
    Escape,
}
