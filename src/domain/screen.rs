//! Monitor descriptors supplied by the host

use super::geometry::{Point, Rect};

/// One physical monitor as seen by the overlay.
///
/// `bounds` and `work_area` are in the global logical coordinate space shared by
/// all overlay windows; `scale_factor` converts them to physical pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenDescriptor {
    pub name: String,
    pub bounds: Rect,
    pub work_area: Rect,
    pub scale_factor: f64,
}

impl ScreenDescriptor {
    /// Screen whose work area equals its bounds
    pub fn new(name: impl Into<String>, bounds: Rect, scale_factor: f64) -> Self {
        Self {
            name: name.into(),
            bounds,
            work_area: bounds,
            scale_factor,
        }
    }

    pub fn with_work_area(mut self, work_area: Rect) -> Self {
        self.work_area = work_area;
        self
    }

    pub fn contains(&self, point: Point) -> bool {
        self.bounds.contains_point(point)
    }

    /// Expected pixel size of a full capture of this screen
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.bounds.width() * self.scale_factor).round().max(0.0) as u32,
            (self.bounds.height() * self.scale_factor).round().max(0.0) as u32,
        )
    }
}
