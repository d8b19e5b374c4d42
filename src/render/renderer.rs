//! On-screen annotation renderer boundary
//!
//! The overlay window's drawing surface implements [`AnnotationRenderer`].
//! Commands call into it after every mutation so the view follows the
//! annotation collection, never the other way around.

use std::cell::RefCell;
use std::rc::Rc;

use crate::domain::{AnnotationItem, Rect};

/// Drawing surface that displays annotations in an overlay window
pub trait AnnotationRenderer {
    /// Draw a single annotation
    fn render_item(&mut self, item: &AnnotationItem);
    /// Redraw every annotation, lowest z-order first
    fn render_all(&mut self, items: &[&AnnotationItem]);
    /// Mark a region as needing repaint
    fn invalidate(&mut self, region: Rect);
    /// Erase everything
    fn clear(&mut self);
}

/// Headless renderer that only accumulates dirty regions.
///
/// Used when the overlay has no drawing surface attached and in tests.
#[derive(Debug, Default, Clone)]
pub struct DirtyRegionRenderer {
    dirty: Option<Rect>,
    invalidations: usize,
    rendered_items: usize,
    cleared: bool,
}

impl DirtyRegionRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of all regions invalidated since the last call
    pub fn take_dirty(&mut self) -> Option<Rect> {
        self.dirty.take()
    }

    pub fn dirty(&self) -> Option<Rect> {
        self.dirty
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations
    }

    pub fn rendered_items(&self) -> usize {
        self.rendered_items
    }

    pub fn was_cleared(&self) -> bool {
        self.cleared
    }
}

impl AnnotationRenderer for DirtyRegionRenderer {
    fn render_item(&mut self, item: &AnnotationItem) {
        self.rendered_items += 1;
        self.invalidate(item.bounds());
    }

    fn render_all(&mut self, items: &[&AnnotationItem]) {
        for item in items {
            self.render_item(item);
        }
    }

    fn invalidate(&mut self, region: Rect) {
        let region = region.normalized();
        self.invalidations += 1;
        self.dirty = Some(match self.dirty {
            Some(dirty) => dirty.union(region),
            None => region,
        });
    }

    fn clear(&mut self) {
        self.cleared = true;
        self.dirty = None;
    }
}

/// Shared renderer, lets the host keep a handle to the surface it gave the canvas
impl<R: AnnotationRenderer> AnnotationRenderer for Rc<RefCell<R>> {
    fn render_item(&mut self, item: &AnnotationItem) {
        self.borrow_mut().render_item(item);
    }

    fn render_all(&mut self, items: &[&AnnotationItem]) {
        self.borrow_mut().render_all(items);
    }

    fn invalidate(&mut self, region: Rect) {
        self.borrow_mut().invalidate(region);
    }

    fn clear(&mut self) {
        self.borrow_mut().clear();
    }
}
