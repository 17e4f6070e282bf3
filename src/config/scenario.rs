//! Replay geometry: the surface rectangle, the viewport and the scroll timeline.

use std::fmt;
use std::time::Duration;

/// An axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Returns the area shared with `other`.
    #[must_use]
    pub fn intersection_area(&self, other: &Self) -> f64 {
        let width = (self.x + self.width).min(other.x + other.width) - self.x.max(other.x);
        let height = (self.y + self.height).min(other.y + other.height) - self.y.max(other.y);
        width.max(0.0) * height.max(0.0)
    }

    /// Returns the fraction of this rectangle covered by `viewport`.
    ///
    /// A rectangle without area is never visible.
    #[must_use]
    pub fn visible_fraction(&self, viewport: &Self) -> f64 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection_area(viewport) / area
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@({}, {})",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Viewport {
    /// Returns the viewport rectangle when scrolled to `(x, y)`.
    #[must_use]
    pub const fn at(&self, x: f64, y: f64) -> Rect {
        Rect::new(x, y, self.width, self.height)
    }
}

/// One scroll of the replay timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollStep {
    /// Offset from the start of the replay
    pub at: Duration,
    /// Horizontal scroll offset
    pub x: f64,
    /// Vertical scroll offset
    pub y: f64,
}
