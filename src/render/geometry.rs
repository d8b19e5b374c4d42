//! Stroke geometry shared by the compositor and hit-test padding
//!
//! Sizes are in logical pixels and get multiplied by the capture scale when
//! drawn onto a physical-resolution image.

/// Arrow geometry constants
pub mod arrow {
    pub const THICKNESS: f32 = 4.0;
    pub const HEAD_SIZE: f32 = 16.0;
    /// Extra width of the dark outline drawn under the arrow
    pub const OUTLINE: f32 = 2.0;
    /// Angle between shaft and each head line (35 degrees)
    pub const HEAD_ANGLE: f32 = 0.610_865_2;
    /// Arrows shorter than this get no head and are not drawn
    pub const MIN_LENGTH: f32 = 5.0;

    /// End points of the two head lines, or `None` when the arrow is too short.
    ///
    /// Returned as `(x1, y1, x2, y2)`.
    pub fn head_points(
        start_x: f32,
        start_y: f32,
        end_x: f32,
        end_y: f32,
        head_size: f32,
    ) -> Option<(f32, f32, f32, f32)> {
        let dx = end_x - start_x;
        let dy = end_y - start_y;
        let length = dx.hypot(dy);
        if length < MIN_LENGTH {
            return None;
        }

        // Unit vector pointing back along the shaft
        let bx = -dx / length;
        let by = -dy / length;
        let (sin_a, cos_a) = HEAD_ANGLE.sin_cos();

        let rotate = |sin: f32| {
            (
                end_x + (bx * cos_a - by * sin) * head_size,
                end_y + (bx * sin + by * cos_a) * head_size,
            )
        };
        let (x1, y1) = rotate(sin_a);
        let (x2, y2) = rotate(-sin_a);
        Some((x1, y1, x2, y2))
    }
}

/// Rectangle and ellipse outlines
pub mod shape {
    pub const THICKNESS: f32 = 3.0;
    pub const BORDER_THICKNESS: f32 = 5.0;

    /// Ellipse bezier approximation constant: 4/3 * (sqrt(2) - 1)
    pub const BEZIER_K: f32 = 0.552_284_8;
}

/// Normalize min/max coordinates from arbitrary start/end points
#[inline]
pub fn normalize_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32, f32, f32) {
    (x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
}

/// Ellipse center and radii from its bounding box; radii are at least one pixel
#[inline]
pub fn ellipse_from_bounds(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> (f32, f32, f32, f32) {
    let cx = (min_x + max_x) * 0.5;
    let cy = (min_y + max_y) * 0.5;
    let rx = ((max_x - min_x) * 0.5).max(1.0);
    let ry = ((max_y - min_y) * 0.5).max(1.0);
    (cx, cy, rx, ry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_points_mirror_around_shaft() {
        let (x1, y1, x2, y2) = arrow::head_points(0.0, 0.0, 100.0, 0.0, 10.0).unwrap();
        assert!(x1 < 100.0 && x2 < 100.0);
        assert!((x1 - x2).abs() < 1e-4);
        assert!((y1 + y2).abs() < 1e-4);
        assert!((x1 - 100.0).hypot(y1) - 10.0 < 1e-3);
    }

    #[test]
    fn test_short_arrow_has_no_head() {
        assert!(arrow::head_points(0.0, 0.0, 3.0, 0.0, 10.0).is_none());
    }

    #[test]
    fn test_normalize_and_ellipse() {
        assert_eq!(normalize_rect(10.0, 0.0, 0.0, 5.0), (0.0, 0.0, 10.0, 5.0));
        assert_eq!(ellipse_from_bounds(0.0, 0.0, 10.0, 0.0), (5.0, 0.0, 5.0, 1.0));
    }
}
