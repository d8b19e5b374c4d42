//! Platform capture collaborator

use image::RgbaImage;

use crate::domain::{PixelRect, Point, ScreenDescriptor};

/// What a live capture should grab
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureTarget {
    FullScreen,
    /// Top-level window by host-specific id
    Window(u64),
    /// Region in physical pixels relative to the screen's top-left corner
    Region(PixelRect),
    /// UI element under a logical point
    Element(Point),
}

/// Raw pixel acquisition from the operating system.
///
/// `Ok(None)` means the platform returned no bitmap; `Err` carries the
/// underlying API failure. Either way the caller treats it as a failed capture.
pub trait CaptureStrategy {
    fn capture_full_screen(&self, screen: &ScreenDescriptor) -> anyhow::Result<Option<RgbaImage>>;

    fn capture_window(&self, window_id: u64) -> anyhow::Result<Option<RgbaImage>>;

    fn capture_region(
        &self,
        screen: &ScreenDescriptor,
        region: PixelRect,
    ) -> anyhow::Result<Option<RgbaImage>>;

    /// Element detection is optional for a platform
    fn capture_element(
        &self,
        _screen: &ScreenDescriptor,
        _point: Point,
    ) -> anyhow::Result<Option<RgbaImage>> {
        Ok(None)
    }

    /// Dispatch on a [`CaptureTarget`]
    fn capture(
        &self,
        screen: &ScreenDescriptor,
        target: &CaptureTarget,
    ) -> anyhow::Result<Option<RgbaImage>> {
        match target {
            CaptureTarget::FullScreen => self.capture_full_screen(screen),
            CaptureTarget::Window(id) => self.capture_window(*id),
            CaptureTarget::Region(region) => self.capture_region(screen, *region),
            CaptureTarget::Element(point) => self.capture_element(screen, *point),
        }
    }
}

/// Strategy that serves crops of fixed per-screen images.
///
/// Used by the demo binary and tests in place of a platform backend.
#[derive(Debug, Default, Clone)]
pub struct StaticCaptureStrategy {
    screens: Vec<(String, RgbaImage)>,
}

impl StaticCaptureStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the full-resolution image shown on `screen`
    pub fn with_screen(mut self, screen: impl Into<String>, image: RgbaImage) -> Self {
        self.screens.push((screen.into(), image));
        self
    }

    fn image_for(&self, screen: &ScreenDescriptor) -> Option<&RgbaImage> {
        self.screens
            .iter()
            .find(|(name, _)| *name == screen.name)
            .map(|(_, image)| image)
    }
}

impl CaptureStrategy for StaticCaptureStrategy {
    fn capture_full_screen(&self, screen: &ScreenDescriptor) -> anyhow::Result<Option<RgbaImage>> {
        Ok(self.image_for(screen).cloned())
    }

    fn capture_window(&self, window_id: u64) -> anyhow::Result<Option<RgbaImage>> {
        anyhow::bail!("window {window_id} capture is not available")
    }

    fn capture_region(
        &self,
        screen: &ScreenDescriptor,
        region: PixelRect,
    ) -> anyhow::Result<Option<RgbaImage>> {
        let Some(image) = self.image_for(screen) else {
            return Ok(None);
        };
        let Some(dims) = region.dimensions() else {
            return Ok(None);
        };
        let mut target = RgbaImage::new(dims.width(), dims.height());
        image::imageops::overlay(&mut target, image, -region.x, -region.y);
        Ok(Some(target))
    }
}
