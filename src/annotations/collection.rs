//! Annotation collection owned by one overlay session

use crate::domain::{AnnotationId, AnnotationItem, AnnotationKind, ItemState, Point};
use crate::error::{OverlayError, Result};

/// Annotations of a session plus id/z-order allocation
#[derive(Debug, Default, Clone)]
pub struct AnnotationCollection {
    items: Vec<AnnotationItem>,
    next_id: u64,
    next_z: i64,
}

impl AnnotationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new item on top of the stack without inserting it
    pub fn create(&mut self, kind: AnnotationKind) -> AnnotationItem {
        self.next_id += 1;
        self.next_z += 1;
        AnnotationItem::new(AnnotationId(self.next_id), self.next_z, kind)
    }

    /// Insert an item, keeping its id and z-order
    pub fn insert(&mut self, item: AnnotationItem) -> Result<()> {
        if self.contains(item.id) {
            return Err(OverlayError::DuplicateAnnotation(item.id));
        }
        self.next_id = self.next_id.max(item.id.0);
        self.next_z = self.next_z.max(item.z_index);
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, id: AnnotationId) -> Option<AnnotationItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&AnnotationItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut AnnotationItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationItem> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<AnnotationId> {
        self.items.iter().map(|item| item.id).collect()
    }

    /// Items in draw order, lowest z first
    pub fn sorted_by_z(&self) -> Vec<&AnnotationItem> {
        let mut sorted: Vec<&AnnotationItem> = self.items.iter().collect();
        sorted.sort_by_key(|item| item.z_index);
        sorted
    }

    /// Owned copies in draw order, for handing to capture
    pub fn snapshot(&self) -> Vec<AnnotationItem> {
        self.sorted_by_z().into_iter().cloned().collect()
    }

    /// Topmost item under `point`
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Option<AnnotationId> {
        self.sorted_by_z()
            .into_iter()
            .rev()
            .find(|item| item.kind.hit_test(point, tolerance))
            .map(|item| item.id)
    }

    /// Ids of selected (or editing) items, in draw order
    pub fn selected_ids(&self) -> Vec<AnnotationId> {
        self.sorted_by_z()
            .into_iter()
            .filter(|item| item.is_selected())
            .map(|item| item.id)
            .collect()
    }

    pub fn set_state(&mut self, id: AnnotationId, state: ItemState) -> Result<()> {
        let item = self
            .get_mut(id)
            .ok_or(OverlayError::UnknownAnnotation(id))?;
        item.state = state;
        Ok(())
    }

    pub fn select_all(&mut self) {
        for item in &mut self.items {
            if item.state == ItemState::Normal {
                item.state = ItemState::Selected;
            }
        }
    }

    pub fn clear_selection(&mut self) {
        for item in &mut self.items {
            item.state = ItemState::Normal;
        }
    }

    /// Drop every item, used at session teardown
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Rect, StickerAnnotation};

    fn sticker(x: f64) -> AnnotationKind {
        AnnotationKind::Sticker(StickerAnnotation {
            glyph: "⭐".into(),
            bounds: Rect::from_xywh(x, 0.0, 20.0, 20.0),
        })
    }

    #[test]
    fn test_create_assigns_unique_ids_and_rising_z() {
        let mut items = AnnotationCollection::new();
        let a = items.create(sticker(0.0));
        let b = items.create(sticker(0.0));
        assert_ne!(a.id, b.id);
        assert!(b.z_index > a.z_index);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut items = AnnotationCollection::new();
        let a = items.create(sticker(0.0));
        items.insert(a.clone()).unwrap();
        assert_eq!(items.insert(a.clone()), Err(OverlayError::DuplicateAnnotation(a.id)));
    }

    #[test]
    fn test_reinsert_keeps_draw_order() {
        let mut items = AnnotationCollection::new();
        let a = items.create(sticker(0.0));
        let b = items.create(sticker(0.0));
        items.insert(a.clone()).unwrap();
        items.insert(b.clone()).unwrap();
        let removed = items.remove(a.id).unwrap();
        items.insert(removed).unwrap();
        let order: Vec<_> = items.sorted_by_z().iter().map(|i| i.id).collect();
        assert_eq!(order, vec![a.id, b.id]);
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut items = AnnotationCollection::new();
        let bottom = items.create(sticker(0.0));
        let top = items.create(sticker(10.0));
        items.insert(top.clone()).unwrap();
        items.insert(bottom.clone()).unwrap();
        assert_eq!(items.hit_test(Point::new(15.0, 5.0), 0.0), Some(top.id));
        assert_eq!(items.hit_test(Point::new(5.0, 5.0), 0.0), Some(bottom.id));
        assert_eq!(items.hit_test(Point::new(500.0, 5.0), 0.0), None);
    }

    #[test]
    fn test_selection_helpers() {
        let mut items = AnnotationCollection::new();
        let a = items.create(sticker(0.0));
        let b = items.create(sticker(40.0));
        items.insert(a.clone()).unwrap();
        items.insert(b.clone()).unwrap();
        items.set_state(b.id, ItemState::Selected).unwrap();
        assert_eq!(items.selected_ids(), vec![b.id]);
        items.select_all();
        assert_eq!(items.selected_ids(), vec![a.id, b.id]);
        items.clear_selection();
        assert!(items.selected_ids().is_empty());
        assert!(items.set_state(AnnotationId(99), ItemState::Selected).is_err());
    }
}
