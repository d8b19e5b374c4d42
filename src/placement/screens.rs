//! Screen lookup for points and regions across monitors

use crate::domain::{PixelRect, Point, Rect, ScreenDescriptor};

/// Screen whose bounds contain `point`, if any.
///
/// Bounds are half-open, so a point on the shared edge of two adjacent
/// monitors resolves to the one on the right/bottom.
pub fn screen_from_point(point: Point, screens: &[ScreenDescriptor]) -> Option<&ScreenDescriptor> {
    screens.iter().find(|screen| screen.contains(point))
}

/// Point just inside the bottom-right corner of `rect`.
///
/// The corner itself lies on the right/bottom edge, which belongs to the next
/// monitor over when a selection ends exactly at a boundary.
pub fn inset_probe(rect: Rect, inset: f64) -> Point {
    let rect = rect.normalized();
    let dx = inset.min(rect.width() * 0.5);
    let dy = inset.min(rect.height() * 0.5);
    Point::new(rect.right - dx, rect.bottom - dy)
}

/// Screen that owns a region: the one under the inset bottom-right probe,
/// else the one under the center.
pub fn screen_from_rect<'a>(
    rect: Rect,
    inset: f64,
    screens: &'a [ScreenDescriptor],
) -> Option<&'a ScreenDescriptor> {
    screen_from_point(inset_probe(rect, inset), screens)
        .or_else(|| screen_from_point(rect.normalized().center(), screens))
}

/// Map a rectangle in global logical coordinates to physical pixels relative to
/// the top-left of `screen`
pub fn logical_to_physical(rect: Rect, screen: &ScreenDescriptor) -> PixelRect {
    let local = rect.translate(-screen.bounds.left, -screen.bounds.top);
    PixelRect::from_logical(local, screen.scale_factor, screen.scale_factor)
}
