//! Geometric types for selections, screens and annotation bounds
//!
//! Logical types (`Point`, `Size`, `Rect`) are in device-independent units.
//! `PixelRect` addresses physical pixels of a captured bitmap.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// A point in logical coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset the point by a delta
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Scale the point away from (or towards) a pivot
    pub fn scale_about(self, pivot: Point, sx: f64, sy: f64) -> Self {
        Self::new(
            pivot.x + (self.x - pivot.x) * sx,
            pivot.y + (self.y - pivot.y) * sy,
        )
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A size in logical coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Logical rectangle stored as edges
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    /// Create a new rectangle from edge coordinates
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Create a normalized rectangle from two arbitrary corners
    pub fn from_points(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    /// Smallest rectangle enclosing every point, `None` for an empty slice
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points.iter().skip(1).fold(init, |r, p| {
            Self::new(r.left.min(p.x), r.top.min(p.y), r.right.max(p.x), r.bottom.max(p.y))
        }))
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right, self.bottom)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
        )
    }

    /// True when the rectangle has no area
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Swap edges so that left <= right and top <= bottom
    pub fn normalized(&self) -> Rect {
        Rect::from_points(self.top_left(), self.bottom_right())
    }

    /// Calculate the intersection of two rectangles
    pub fn intersect(&self, other: Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);
        if left < right && top < bottom {
            Some(Rect {
                left,
                top,
                right,
                bottom,
            })
        } else {
            None
        }
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: Rect) -> Rect {
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Translate the rectangle by the given offset
    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    /// Grow the rectangle by `amount` on every side
    pub fn inflate(&self, amount: f64) -> Rect {
        Rect::new(
            self.left - amount,
            self.top - amount,
            self.right + amount,
            self.bottom + amount,
        )
    }

    /// Scale every edge by per-axis factors (logical to physical mapping)
    pub fn scale(&self, sx: f64, sy: f64) -> Rect {
        Rect::new(
            self.left * sx,
            self.top * sy,
            self.right * sx,
            self.bottom * sy,
        )
    }

    /// Check if this rectangle contains a point.
    ///
    /// Left and top edges are inclusive, right and bottom exclusive, so a point on
    /// the shared edge of two adjacent rectangles belongs to exactly one of them.
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }
}

/// Rectangle in physical pixels of a bitmap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Map a logical rectangle into physical pixels, rounding each edge
    pub fn from_logical(rect: Rect, scale_x: f64, scale_y: f64) -> Self {
        let scaled = rect.normalized().scale(scale_x, scale_y);
        let left = scaled.left.round();
        let top = scaled.top.round();
        Self {
            x: left as i64,
            y: top as i64,
            width: (scaled.right.round() - left).max(0.0) as u32,
            height: (scaled.bottom.round() - top).max(0.0) as u32,
        }
    }

    /// Convert to dimensions, `None` if either side is zero
    pub fn dimensions(self) -> Option<RectDimension> {
        let width = NonZeroU32::new(self.width)?;
        let height = NonZeroU32::new(self.height)?;
        Some(RectDimension { width, height })
    }
}

/// Non-zero dimensions of a rectangle
#[derive(Clone, Copy, Debug)]
pub struct RectDimension {
    pub width: NonZeroU32,
    pub height: NonZeroU32,
}

impl RectDimension {
    pub fn width(&self) -> u32 {
        self.width.get()
    }

    pub fn height(&self) -> u32 {
        self.height.get()
    }
}
