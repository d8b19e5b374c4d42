//! Region extraction and annotation composition
//!
//! A capture either crops the frozen background taken when the selection
//! started, or falls back to a live platform capture. Either way the result has
//! the selection's physical pixel size, not its logical size.

use std::rc::Rc;

use anyhow::Context;
use image::RgbaImage;

use super::strategy::CaptureStrategy;
use crate::domain::{AnnotationItem, PixelRect, Rect, ScreenDescriptor, Size};
use crate::placement::logical_to_physical;
use crate::render::{Compositor, SkiaCompositor};

/// Full-resolution snapshot of one screen, taken once per session
#[derive(Clone, Debug)]
pub struct FrozenBackground {
    pub screen: String,
    pub image: RgbaImage,
    /// Size of the overlay window covering the screen, in logical units
    pub logical_size: Size,
}

impl FrozenBackground {
    pub fn new(screen: impl Into<String>, image: RgbaImage, logical_size: Size) -> Self {
        Self {
            screen: screen.into(),
            image,
            logical_size,
        }
    }

    /// Physical pixels per logical unit along each axis
    pub fn scale(&self) -> (f64, f64) {
        (
            self.image.width() as f64 / self.logical_size.width,
            self.image.height() as f64 / self.logical_size.height,
        )
    }

    /// Copy the physical region behind `selection` into a new buffer
    pub fn extract(&self, selection: Rect) -> anyhow::Result<RgbaImage> {
        let (scale_x, scale_y) = self.scale();
        anyhow::ensure!(
            scale_x.is_finite() && scale_y.is_finite() && scale_x > 0.0 && scale_y > 0.0,
            "frozen background of {} has no usable scale",
            self.screen
        );
        let bounds = Rect::from_xywh(0.0, 0.0, self.logical_size.width, self.logical_size.height);
        let selection = selection
            .normalized()
            .intersect(bounds)
            .with_context(|| format!("selection {selection:?} is outside the frozen image"))?;
        let source = PixelRect::from_logical(selection, scale_x, scale_y);
        let dims = source
            .dimensions()
            .with_context(|| format!("selection {selection:?} covers no pixels"))?;

        let mut target = RgbaImage::new(dims.width(), dims.height());
        image::imageops::overlay(&mut target, &self.image, -source.x, -source.y);
        log::debug!(
            "Extracted {}x{} from frozen {} at ({}, {})",
            target.width(),
            target.height(),
            self.screen,
            source.x,
            source.y
        );
        Ok(target)
    }
}

/// Captures regions and draws annotations onto them
pub struct CaptureService {
    strategy: Rc<dyn CaptureStrategy>,
    compositor: Box<dyn Compositor>,
}

impl CaptureService {
    pub fn new(strategy: Rc<dyn CaptureStrategy>) -> Self {
        Self::with_compositor(strategy, Box::new(SkiaCompositor))
    }

    pub fn with_compositor(strategy: Rc<dyn CaptureStrategy>, compositor: Box<dyn Compositor>) -> Self {
        Self {
            strategy,
            compositor,
        }
    }

    /// Snapshot a whole screen to serve later captures from
    pub fn freeze_screen(&self, screen: &ScreenDescriptor) -> Option<FrozenBackground> {
        match self.strategy.capture_full_screen(screen) {
            Ok(Some(image)) => {
                log::debug!(
                    "Froze {}: {}x{} pixels",
                    screen.name,
                    image.width(),
                    image.height()
                );
                Some(FrozenBackground::new(
                    screen.name.clone(),
                    image,
                    screen.bounds.size(),
                ))
            }
            Ok(None) => {
                log::warn!("Full-screen capture of {} returned nothing", screen.name);
                None
            }
            Err(err) => {
                log::warn!("Full-screen capture of {} failed: {:?}", screen.name, err);
                None
            }
        }
    }

    /// Capture `selection` (overlay-local logical coordinates on `screen`) and
    /// draw `annotations` onto it.
    ///
    /// Returns `None` on any failure; the reason is logged.
    pub fn capture_region(
        &self,
        selection: Rect,
        screen: &ScreenDescriptor,
        frozen: Option<&FrozenBackground>,
        annotations: &[AnnotationItem],
    ) -> Option<RgbaImage> {
        match self.try_capture_region(selection, screen, frozen, annotations) {
            Ok(image) => Some(image),
            Err(err) => {
                log::warn!("Capture of {:?} on {} failed: {:?}", selection, screen.name, err);
                None
            }
        }
    }

    fn try_capture_region(
        &self,
        selection: Rect,
        screen: &ScreenDescriptor,
        frozen: Option<&FrozenBackground>,
        annotations: &[AnnotationItem],
    ) -> anyhow::Result<RgbaImage> {
        let visible = Rect::from_xywh(0.0, 0.0, screen.bounds.width(), screen.bounds.height());
        let selection = selection
            .normalized()
            .intersect(visible)
            .with_context(|| format!("selection {selection:?} is outside {}", screen.name))?;
        let (mut image, scale) = match frozen {
            Some(frozen) => (frozen.extract(selection)?, frozen.scale().0),
            None => {
                let global = selection.translate(screen.bounds.left, screen.bounds.top);
                let region = logical_to_physical(global, screen);
                log::debug!("No frozen background, live capture of {:?}", region);
                let image = self
                    .strategy
                    .capture_region(screen, region)
                    .context("live region capture")?
                    .context("live region capture returned no image")?;
                (image, screen.scale_factor)
            }
        };

        if annotations.is_empty() {
            return Ok(image);
        }

        let mut ordered = annotations.to_vec();
        ordered.sort_by_key(|item| item.z_index);
        self.compositor
            .composite(&mut image, &ordered, selection.top_left(), scale)
            .context("compositing annotations")?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::StaticCaptureStrategy;
    use crate::domain::{AnnotationId, AnnotationKind, Point, RedactAnnotation};
    use std::cell::RefCell;

    fn screen(scale: f64) -> ScreenDescriptor {
        ScreenDescriptor::new("main", Rect::new(0.0, 0.0, 400.0, 300.0), scale)
    }

    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| image::Rgba([(x % 251) as u8, (y % 251) as u8, 9, 255]))
    }

    fn service(strategy: StaticCaptureStrategy) -> CaptureService {
        CaptureService::new(Rc::new(strategy))
    }

    #[test]
    fn test_frozen_fast_path_uses_physical_size() {
        let screen = screen(2.0);
        let frozen = FrozenBackground::new("main", checker(800, 600), screen.bounds.size());
        let service = service(StaticCaptureStrategy::new());
        let img = service
            .capture_region(
                Rect::from_xywh(10.0, 20.0, 100.0, 50.0),
                &screen,
                Some(&frozen),
                &[],
            )
            .unwrap();
        assert_eq!(img.dimensions(), (200, 100));
        assert_eq!(img.get_pixel(0, 0).0, [20, 40, 9, 255]);
    }

    #[test]
    fn test_live_fallback_maps_to_screen_pixels() {
        let screen = ScreenDescriptor::new("side", Rect::new(1000.0, 0.0, 1400.0, 300.0), 2.0);
        let strategy = StaticCaptureStrategy::new().with_screen("side", checker(800, 600));
        let img = service(strategy)
            .capture_region(Rect::from_xywh(5.0, 5.0, 30.0, 10.0), &screen, None, &[])
            .unwrap();
        assert_eq!(img.dimensions(), (60, 20));
        assert_eq!(img.get_pixel(0, 0).0, [10, 10, 9, 255]);
    }

    #[test]
    fn test_failures_become_none() {
        let screen = screen(1.0);
        let service = service(StaticCaptureStrategy::new());
        // No frozen background and nothing to capture live
        assert!(
            service
                .capture_region(Rect::from_xywh(0.0, 0.0, 10.0, 10.0), &screen, None, &[])
                .is_none()
        );
        // Empty selection
        let frozen = FrozenBackground::new("main", checker(400, 300), screen.bounds.size());
        assert!(
            service
                .capture_region(Rect::new(5.0, 5.0, 5.0, 9.0), &screen, Some(&frozen), &[])
                .is_none()
        );
        assert!(service.freeze_screen(&screen).is_none());
    }

    #[test]
    fn test_selection_is_clipped_to_screen() {
        let screen = screen(2.0);
        let frozen = FrozenBackground::new("main", checker(800, 600), screen.bounds.size());
        let service = service(StaticCaptureStrategy::new());

        let img = service
            .capture_region(Rect::new(350.0, 250.0, 450.0, 350.0), &screen, Some(&frozen), &[])
            .unwrap();
        assert_eq!(img.dimensions(), (100, 100));
        assert_eq!(img.get_pixel(0, 0).0, [198, 249, 9, 255]);

        let huge = Rect::new(-1e12, -1e12, 1e12, 1e12);
        let img = service
            .capture_region(huge, &screen, Some(&frozen), &[])
            .unwrap();
        assert_eq!(img.dimensions(), (800, 600));
        assert!(
            service
                .capture_region(Rect::new(500.0, 0.0, 600.0, 50.0), &screen, Some(&frozen), &[])
                .is_none()
        );
    }

    struct Recorder {
        calls: Rc<RefCell<Vec<(Vec<i64>, Point, f64)>>>,
    }

    impl Compositor for Recorder {
        fn composite(
            &self,
            _base: &mut RgbaImage,
            items: &[AnnotationItem],
            origin: Point,
            scale: f64,
        ) -> anyhow::Result<()> {
            let z = items.iter().map(|i| i.z_index).collect();
            self.calls.borrow_mut().push((z, origin, scale));
            Ok(())
        }
    }

    #[test]
    fn test_annotations_composited_in_z_order() {
        let screen = screen(2.0);
        let frozen = FrozenBackground::new("main", checker(800, 600), screen.bounds.size());
        let calls = Rc::new(RefCell::new(Vec::new()));
        let service = CaptureService::with_compositor(
            Rc::new(StaticCaptureStrategy::new()),
            Box::new(Recorder {
                calls: calls.clone(),
            }),
        );
        let redact = |z: i64| {
            AnnotationItem::new(
                AnnotationId(z as u64),
                z,
                AnnotationKind::Redact(RedactAnnotation {
                    start: Point::new(0.0, 0.0),
                    end: Point::new(1.0, 1.0),
                }),
            )
        };
        let selection = Rect::from_xywh(10.0, 10.0, 20.0, 20.0);
        service
            .capture_region(selection, &screen, Some(&frozen), &[redact(3), redact(1), redact(2)])
            .unwrap();
        // Without annotations the compositor is never consulted
        service
            .capture_region(selection, &screen, Some(&frozen), &[])
            .unwrap();

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (vec![1, 2, 3], Point::new(10.0, 10.0), 2.0));
    }

    #[test]
    fn test_freeze_screen_records_logical_size() {
        let screen = screen(1.5);
        let strategy = StaticCaptureStrategy::new().with_screen("main", checker(600, 450));
        let frozen = service(strategy).freeze_screen(&screen).unwrap();
        assert_eq!(frozen.logical_size, Size::new(400.0, 300.0));
        assert_eq!(frozen.scale(), (1.5, 1.5));
    }
}
