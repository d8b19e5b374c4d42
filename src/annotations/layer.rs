//! Annotation layer: the canvas, its command history and the annotation clipboard
//!
//! Every mutation goes through [`CommandHistory`] so undo/redo sees it.

use anyhow::bail;

use super::canvas::Canvas;
use crate::config::EngineConfig;
use crate::domain::{
    AnnotationId, AnnotationItem, AnnotationKind, ItemState, Point, Rect, Tool,
};
use crate::error::OverlayError;
use crate::history::{
    AddAnnotationCommand, Command, CommandHistory, CompositeCommand, EditPointsCommand,
    ModifyPropertyCommand, MoveCommand, RemoveAnnotationCommand, TransformCommand,
};
use crate::render::renderer::AnnotationRenderer;

/// Pointer tolerance for picking annotations, in logical pixels
pub const HIT_TOLERANCE: f64 = 4.0;

pub struct AnnotationLayer {
    canvas: Canvas,
    history: CommandHistory,
    clipboard: Vec<AnnotationItem>,
    /// Number of pastes since the last copy, each one offset a bit further
    paste_count: u32,
    tool: Tool,
    nudge_step: f64,
    nudge_step_large: f64,
    paste_offset: f64,
}

impl AnnotationLayer {
    pub fn new(config: &EngineConfig, renderer: Box<dyn AnnotationRenderer>) -> Self {
        Self {
            canvas: Canvas::new(renderer),
            history: CommandHistory::new(config.undo_capacity),
            clipboard: Vec::new(),
            paste_count: 0,
            tool: Tool::default(),
            nudge_step: config.nudge_step,
            nudge_step_large: config.nudge_step_large,
            paste_offset: config.paste_offset,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Annotations in draw order, for capture composition
    pub fn snapshot(&self) -> Vec<AnnotationItem> {
        self.canvas.items().snapshot()
    }

    pub fn selected_ids(&self) -> Vec<AnnotationId> {
        self.canvas.items().selected_ids()
    }

    /// Run a command through the history
    pub fn execute(&mut self, command: Box<dyn Command>) -> anyhow::Result<()> {
        self.history.execute(command, &mut self.canvas)
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.canvas)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.canvas)
    }

    /// Switch tools. Leaving the select tool drops the current selection.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool == self.tool {
            return;
        }
        if tool.is_drawing() {
            self.canvas.items_mut().clear_selection();
            self.canvas.render_all();
        }
        log::debug!("Tool {:?} -> {:?}", self.tool, tool);
        self.tool = tool;
    }

    /// Add a finished annotation on top of the stack
    pub fn add(&mut self, kind: AnnotationKind) -> anyhow::Result<AnnotationId> {
        let item = self.canvas.items_mut().create(kind);
        let id = item.id;
        self.execute(Box::new(AddAnnotationCommand::new(item)))?;
        Ok(id)
    }

    /// Select the topmost annotation under `point`
    pub fn select_at(&mut self, point: Point, extend: bool) -> Option<AnnotationId> {
        let hit = self.canvas.items().hit_test(point, HIT_TOLERANCE);
        let items = self.canvas.items_mut();
        if !extend {
            items.clear_selection();
        }
        if let Some(id) = hit {
            // Hit ids come from the collection itself
            let _ = items.set_state(id, ItemState::Selected);
        }
        self.canvas.render_all();
        hit
    }

    pub fn select_all(&mut self) -> usize {
        self.canvas.items_mut().select_all();
        self.canvas.render_all();
        self.selected_ids().len()
    }

    /// Remove selected annotations as one undoable step
    pub fn delete_selected(&mut self) -> anyhow::Result<usize> {
        let ids = self.selected_ids();
        self.remove_all_of(ids, "Delete")
    }

    /// Remove every annotation as one undoable step
    pub fn clear(&mut self) -> anyhow::Result<usize> {
        let ids = self.canvas.items().ids();
        self.remove_all_of(ids, "Clear annotations")
    }

    fn remove_all_of(&mut self, ids: Vec<AnnotationId>, label: &str) -> anyhow::Result<usize> {
        let count = ids.len();
        if count == 0 {
            return Ok(0);
        }
        let commands: Vec<Box<dyn Command>> = ids
            .into_iter()
            .map(|id| Box::new(RemoveAnnotationCommand::new(id)) as Box<dyn Command>)
            .collect();
        self.execute(Box::new(CompositeCommand::new(label, commands)))?;
        Ok(count)
    }

    /// Move selected annotations one keyboard step in the direction of (dx, dy)
    pub fn nudge(&mut self, dx: f64, dy: f64, large: bool) -> anyhow::Result<bool> {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return Ok(false);
        }
        let step = if large {
            self.nudge_step_large
        } else {
            self.nudge_step
        };
        self.execute(Box::new(MoveCommand::new(
            ids,
            step_toward(dx, step),
            step_toward(dy, step),
        )))?;
        Ok(true)
    }

    /// Move arbitrary annotations by an exact delta (mouse drag)
    pub fn move_by(&mut self, ids: Vec<AnnotationId>, dx: f64, dy: f64) -> anyhow::Result<()> {
        self.execute(Box::new(MoveCommand::new(ids, dx, dy)))
    }

    /// Scale the selected annotations about the center of their combined bounds
    pub fn scale_selected(&mut self, sx: f64, sy: f64) -> anyhow::Result<bool> {
        let ids = self.selected_ids();
        let Some(bounds) = self.bounds_of(&ids) else {
            return Ok(false);
        };
        self.execute(Box::new(TransformCommand::new(ids, bounds.center(), sx, sy)))?;
        Ok(true)
    }

    /// Replace the control points of one annotation
    pub fn edit_points(&mut self, id: AnnotationId, points: Vec<Point>) -> anyhow::Result<()> {
        let old = self
            .canvas
            .items()
            .get(id)
            .ok_or(OverlayError::UnknownAnnotation(id))?
            .kind
            .points();
        self.execute(Box::new(EditPointsCommand::new(id, old, points)))
    }

    fn bounds_of(&self, ids: &[AnnotationId]) -> Option<Rect> {
        ids.iter()
            .filter_map(|id| self.canvas.items().get(*id))
            .map(|item| item.bounds())
            .reduce(|a, b| a.union(b))
    }

    /// Copy selected annotations to the layer clipboard
    pub fn copy(&mut self) -> usize {
        let items = self.canvas.items();
        let copied: Vec<AnnotationItem> = self
            .selected_ids()
            .into_iter()
            .filter_map(|id| items.get(id).cloned())
            .collect();
        if copied.is_empty() {
            return 0;
        }
        self.clipboard = copied;
        self.paste_count = 0;
        self.clipboard.len()
    }

    /// Paste the clipboard, offset from the originals, and select the copies
    pub fn paste(&mut self) -> anyhow::Result<Vec<AnnotationId>> {
        if self.clipboard.is_empty() {
            return Ok(Vec::new());
        }
        self.paste_count += 1;
        let offset = self.paste_offset * self.paste_count as f64;
        let kinds: Vec<AnnotationKind> = self.clipboard.iter().map(|i| i.kind.clone()).collect();
        self.insert_copies(kinds, offset, "Paste")
    }

    /// Copy and paste the selection in one step, leaving the clipboard alone
    pub fn duplicate(&mut self) -> anyhow::Result<Vec<AnnotationId>> {
        let items = self.canvas.items();
        let kinds: Vec<AnnotationKind> = self
            .selected_ids()
            .into_iter()
            .filter_map(|id| items.get(id).map(|i| i.kind.clone()))
            .collect();
        if kinds.is_empty() {
            return Ok(Vec::new());
        }
        self.insert_copies(kinds, self.paste_offset, "Duplicate")
    }

    fn insert_copies(
        &mut self,
        kinds: Vec<AnnotationKind>,
        offset: f64,
        label: &str,
    ) -> anyhow::Result<Vec<AnnotationId>> {
        let items: Vec<AnnotationItem> = kinds
            .into_iter()
            .map(|mut kind| {
                kind.translate(offset, offset);
                let mut item = self.canvas.items_mut().create(kind);
                item.state = ItemState::Selected;
                item
            })
            .collect();
        self.insert_selected(items, label)
    }

    /// Insert `items` as one undoable step, then move the selection onto them
    fn insert_selected(
        &mut self,
        items: Vec<AnnotationItem>,
        label: &str,
    ) -> anyhow::Result<Vec<AnnotationId>> {
        let previous = self.selected_ids();
        let ids: Vec<AnnotationId> = items.iter().map(|item| item.id).collect();
        let commands: Vec<Box<dyn Command>> = items
            .into_iter()
            .map(|item| Box::new(AddAnnotationCommand::new(item)) as Box<dyn Command>)
            .collect();
        self.execute(Box::new(CompositeCommand::new(label, commands)))?;

        let collection = self.canvas.items_mut();
        for id in previous {
            // Read from the collection just above and nothing was removed since
            let _ = collection.set_state(id, ItemState::Normal);
        }
        self.canvas.render_all();
        Ok(ids)
    }

    /// Enter in-place editing of a text annotation
    pub fn begin_text_edit(&mut self, id: AnnotationId) -> anyhow::Result<()> {
        let item = self
            .canvas
            .items()
            .get(id)
            .ok_or(OverlayError::UnknownAnnotation(id))?;
        if !matches!(item.kind, AnnotationKind::Text(_)) {
            bail!("annotation {id} is a {}, not text", item.kind.name());
        }
        let items = self.canvas.items_mut();
        items.clear_selection();
        items.set_state(id, ItemState::Editing)?;
        Ok(())
    }

    /// Leave text editing and commit `text`. Empty text removes the annotation.
    pub fn end_text_edit(&mut self, id: AnnotationId, text: String) -> anyhow::Result<()> {
        let item = self
            .canvas
            .items()
            .get(id)
            .ok_or(OverlayError::UnknownAnnotation(id))?;
        let AnnotationKind::Text(current) = &item.kind else {
            bail!("annotation {id} is a {}, not text", item.kind.name());
        };
        let old = current.text.clone();
        self.canvas.items_mut().set_state(id, ItemState::Selected)?;

        if text.trim().is_empty() {
            return self.execute(Box::new(RemoveAnnotationCommand::new(id)));
        }
        if text != old {
            self.execute(Box::new(ModifyPropertyCommand::text(id, old, text)))?;
        }
        Ok(())
    }

    /// Drop annotations and history at session teardown
    pub fn reset(&mut self) {
        self.history.clear();
        self.clipboard.clear();
        self.paste_count = 0;
        self.canvas.reset();
    }
}

/// `step` in the direction of `v`, zero when `v` is zero
fn step_toward(v: f64, step: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v.signum() * step }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShapeColor;
    use crate::domain::{ArrowAnnotation, TextAnnotation};
    use crate::render::renderer::DirtyRegionRenderer;

    fn layer() -> AnnotationLayer {
        AnnotationLayer::new(&EngineConfig::default(), Box::new(DirtyRegionRenderer::new()))
    }

    fn arrow_at(x: f64) -> AnnotationKind {
        AnnotationKind::Arrow(ArrowAnnotation {
            start: Point::new(x, 0.0),
            end: Point::new(x + 50.0, 0.0),
            color: ShapeColor::default(),
            shadow: true,
        })
    }

    fn text(s: &str) -> AnnotationKind {
        AnnotationKind::Text(TextAnnotation {
            origin: Point::new(200.0, 200.0),
            text: s.into(),
            font_size: 16.0,
            color: ShapeColor::BLACK,
            background: None,
        })
    }

    #[test]
    fn test_delete_selected_is_one_undo_step() {
        let mut layer = layer();
        layer.add(arrow_at(0.0)).unwrap();
        layer.add(arrow_at(100.0)).unwrap();
        assert_eq!(layer.select_all(), 2);
        assert_eq!(layer.delete_selected().unwrap(), 2);
        assert!(layer.canvas().items().is_empty());
        assert!(layer.undo());
        assert_eq!(layer.canvas().items().len(), 2);
    }

    #[test]
    fn test_delete_with_nothing_selected_records_nothing() {
        let mut layer = layer();
        layer.add(arrow_at(0.0)).unwrap();
        assert_eq!(layer.delete_selected().unwrap(), 0);
        assert_eq!(layer.history().undo_len(), 1);
    }

    #[test]
    fn test_clear_then_undo() {
        let mut layer = layer();
        layer.add(arrow_at(0.0)).unwrap();
        layer.add(text("hello")).unwrap();
        assert_eq!(layer.clear().unwrap(), 2);
        assert!(layer.canvas().items().is_empty());
        assert!(layer.undo());
        assert_eq!(layer.canvas().items().len(), 2);
    }

    #[test]
    fn test_nudge_moves_selection_by_step() {
        let mut layer = layer();
        let id = layer.add(arrow_at(0.0)).unwrap();
        assert!(!layer.nudge(1.0, 0.0, false).unwrap());
        layer.select_at(Point::new(25.0, 1.0), false);
        assert!(layer.nudge(1.0, 0.0, false).unwrap());
        assert!(layer.nudge(0.0, -1.0, true).unwrap());
        let bounds = layer.canvas().items().get(id).unwrap().bounds();
        assert_eq!(bounds.top_left(), Point::new(1.0, -10.0));
        assert!(layer.undo());
        assert!(layer.undo());
        let bounds = layer.canvas().items().get(id).unwrap().bounds();
        assert_eq!(bounds.top_left(), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_copy_paste_offsets_and_selects_copies() {
        let mut layer = layer();
        let original = layer.add(arrow_at(0.0)).unwrap();
        assert_eq!(layer.copy(), 0);
        layer.select_at(Point::new(10.0, 0.0), false);
        assert_eq!(layer.copy(), 1);

        let first = layer.paste().unwrap();
        let second = layer.paste().unwrap();
        assert_eq!(first.len(), 1);
        assert_ne!(first[0], original);
        let items = layer.canvas().items();
        assert_eq!(items.get(first[0]).unwrap().bounds().left, 10.0);
        assert_eq!(items.get(second[0]).unwrap().bounds().left, 20.0);
        assert_eq!(layer.selected_ids(), second);

        assert!(layer.undo());
        assert!(!layer.canvas().items().contains(second[0]));
    }

    #[test]
    fn test_failed_paste_keeps_selection_and_history() {
        let mut layer = layer();
        let id = layer.add(arrow_at(0.0)).unwrap();
        layer.select_all();
        let existing = layer.canvas().items().get(id).cloned().unwrap();
        let fresh = layer.canvas.items_mut().create(arrow_at(100.0));

        assert!(layer.insert_selected(vec![fresh, existing], "Paste").is_err());
        assert_eq!(layer.selected_ids(), vec![id]);
        assert_eq!(layer.canvas().items().len(), 1);
        assert_eq!(layer.history().undo_len(), 1);
    }

    #[test]
    fn test_duplicate_keeps_clipboard() {
        let mut layer = layer();
        layer.add(arrow_at(0.0)).unwrap();
        layer.select_all();
        let copies = layer.duplicate().unwrap();
        assert_eq!(copies.len(), 1);
        assert_eq!(layer.canvas().items().len(), 2);
        assert!(layer.paste().unwrap().is_empty());
    }

    #[test]
    fn test_text_edit_commit_and_undo() {
        let mut layer = layer();
        let id = layer.add(text("draft")).unwrap();
        layer.begin_text_edit(id).unwrap();
        assert_eq!(
            layer.canvas().items().get(id).unwrap().state,
            ItemState::Editing
        );
        layer.end_text_edit(id, "final".into()).unwrap();
        let item = layer.canvas().items().get(id).unwrap();
        assert!(matches!(&item.kind, AnnotationKind::Text(t) if t.text == "final"));
        assert_eq!(item.state, ItemState::Selected);

        assert!(layer.undo());
        let item = layer.canvas().items().get(id).unwrap();
        assert!(matches!(&item.kind, AnnotationKind::Text(t) if t.text == "draft"));
    }

    #[test]
    fn test_empty_text_removes_annotation() {
        let mut layer = layer();
        let id = layer.add(text("draft")).unwrap();
        layer.begin_text_edit(id).unwrap();
        layer.end_text_edit(id, "   ".into()).unwrap();
        assert!(!layer.canvas().items().contains(id));
    }

    #[test]
    fn test_text_edit_on_arrow_fails() {
        let mut layer = layer();
        let id = layer.add(arrow_at(0.0)).unwrap();
        assert!(layer.begin_text_edit(id).is_err());
        assert!(layer.begin_text_edit(AnnotationId(77)).is_err());
    }

    #[test]
    fn test_scale_and_edit_points_undo() {
        let mut layer = layer();
        let id = layer.add(arrow_at(0.0)).unwrap();
        layer.select_all();
        assert!(layer.scale_selected(2.0, 2.0).unwrap());
        assert_eq!(layer.canvas().items().get(id).unwrap().bounds().width(), 100.0);
        layer
            .edit_points(id, vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)])
            .unwrap();
        assert!(layer.undo());
        assert!(layer.undo());
        assert_eq!(layer.canvas().items().get(id).unwrap().bounds().width(), 50.0);
    }

    #[test]
    fn test_drawing_tool_clears_selection() {
        let mut layer = layer();
        layer.add(arrow_at(0.0)).unwrap();
        layer.select_all();
        layer.set_tool(Tool::Rectangle);
        assert!(layer.selected_ids().is_empty());
        assert_eq!(layer.tool(), Tool::Rectangle);
    }
}
