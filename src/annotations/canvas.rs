//! Mutable annotation canvas: the collection plus the surface that shows it

use crate::domain::{AnnotationId, AnnotationItem, Rect};
use crate::error::OverlayError;
use crate::render::renderer::{AnnotationRenderer, DirtyRegionRenderer};

use super::collection::AnnotationCollection;

/// Extra repaint margin around changed bounds, covers strokes and shadows
const REPAINT_PADDING: f64 = 12.0;

pub struct Canvas {
    items: AnnotationCollection,
    renderer: Box<dyn AnnotationRenderer>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(Box::new(DirtyRegionRenderer::new()))
    }
}

impl Canvas {
    pub fn new(renderer: Box<dyn AnnotationRenderer>) -> Self {
        Self {
            items: AnnotationCollection::new(),
            renderer,
        }
    }

    pub fn items(&self) -> &AnnotationCollection {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut AnnotationCollection {
        &mut self.items
    }

    /// Repaint a changed region, padded for stroke width
    pub fn invalidate(&mut self, region: Rect) {
        self.renderer.invalidate(region.normalized().inflate(REPAINT_PADDING));
    }

    /// Insert an item and draw it
    pub fn insert(&mut self, item: AnnotationItem) -> anyhow::Result<()> {
        let bounds = item.bounds();
        self.items.insert(item.clone())?;
        self.renderer.render_item(&item);
        self.invalidate(bounds);
        Ok(())
    }

    /// Remove an item and repaint where it was
    pub fn remove(&mut self, id: AnnotationId) -> anyhow::Result<AnnotationItem> {
        let item = self
            .items
            .remove(id)
            .ok_or(OverlayError::UnknownAnnotation(id))?;
        self.invalidate(item.bounds());
        Ok(item)
    }

    /// Apply `f` to one item, bump its timestamp and repaint old and new bounds
    pub fn modify<R>(
        &mut self,
        id: AnnotationId,
        f: impl FnOnce(&mut AnnotationItem) -> anyhow::Result<R>,
    ) -> anyhow::Result<R> {
        let item = self
            .items
            .get_mut(id)
            .ok_or(OverlayError::UnknownAnnotation(id))?;
        let before = item.bounds();
        let result = f(item)?;
        item.touch();
        let after = item.bounds();
        self.invalidate(before.union(after));
        Ok(result)
    }

    /// Redraw everything from the collection
    pub fn render_all(&mut self) {
        self.renderer.clear();
        let sorted = self.items.sorted_by_z();
        self.renderer.render_all(&sorted);
    }

    /// Drop every item and wipe the surface
    pub fn reset(&mut self) {
        self.items.clear();
        self.renderer.clear();
    }
}
