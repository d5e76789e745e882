//! Screen geometry types.

use serde::{Deserialize, Serialize};

/// A 2D point. Depending on context this is a screen-relative fraction
/// (`[0.0, 1.0]`) or a position in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Display dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Convert a screen-relative fraction to pixels, clamped to the display.
    pub fn to_pixels(&self, normalized: Point2D) -> Point2D {
        Point2D {
            x: normalized.x.clamp(0.0, 1.0) * self.width as f64,
            y: normalized.y.clamp(0.0, 1.0) * self.height as f64,
        }
    }
}
