//! Concrete annotation commands

use anyhow::{Context, bail};
use chrono::{DateTime, Local};

use super::command::Command;
use crate::annotations::canvas::Canvas;
use crate::config::ShapeColor;
use crate::domain::{AnnotationId, AnnotationItem, AnnotationKind, Point};
use crate::error::OverlayError;

// ============================================================================
// Add / remove
// ============================================================================

/// Insert a new annotation
pub struct AddAnnotationCommand {
    item: AnnotationItem,
    created_at: DateTime<Local>,
}

impl AddAnnotationCommand {
    pub fn new(item: AnnotationItem) -> Self {
        Self {
            item,
            created_at: Local::now(),
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.item.id
    }
}

impl Command for AddAnnotationCommand {
    fn execute(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        canvas.insert(self.item.clone())
    }

    fn undo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        // Keep the latest state so redo brings back any edits made in between
        self.item = canvas.remove(self.item.id)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Add {}", self.item.kind.name())
    }

    fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

/// Remove an existing annotation, keeping it for undo
pub struct RemoveAnnotationCommand {
    id: AnnotationId,
    removed: Option<AnnotationItem>,
    created_at: DateTime<Local>,
}

impl RemoveAnnotationCommand {
    pub fn new(id: AnnotationId) -> Self {
        Self {
            id,
            removed: None,
            created_at: Local::now(),
        }
    }
}

impl Command for RemoveAnnotationCommand {
    fn execute(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.removed = Some(canvas.remove(self.id)?);
        Ok(())
    }

    fn undo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        let item = self
            .removed
            .take()
            .with_context(|| format!("annotation {} was never removed", self.id))?;
        if let Err(err) = canvas.insert(item.clone()) {
            self.removed = Some(item);
            return Err(err);
        }
        Ok(())
    }

    fn description(&self) -> String {
        match &self.removed {
            Some(item) => format!("Remove {}", item.kind.name()),
            None => "Remove annotation".to_string(),
        }
    }

    fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

// ============================================================================
// Property changes
// ============================================================================

/// Setter applying a property value to an annotation
pub type PropertySetter<V> = Box<dyn Fn(&mut AnnotationItem, &V) -> anyhow::Result<()>>;

/// Change one property of an annotation, remembering old and new values
pub struct ModifyPropertyCommand<V> {
    id: AnnotationId,
    property: &'static str,
    old: V,
    new: V,
    setter: PropertySetter<V>,
    created_at: DateTime<Local>,
}

impl<V> ModifyPropertyCommand<V> {
    pub fn new(
        id: AnnotationId,
        property: &'static str,
        old: V,
        new: V,
        setter: PropertySetter<V>,
    ) -> Self {
        Self {
            id,
            property,
            old,
            new,
            setter,
            created_at: Local::now(),
        }
    }

    fn apply(&self, canvas: &mut Canvas, value: &V) -> anyhow::Result<()> {
        canvas.modify(self.id, |item| (self.setter)(item, value))
    }
}

impl ModifyPropertyCommand<ShapeColor> {
    /// Recolor a text, arrow or shape annotation
    pub fn color(id: AnnotationId, old: ShapeColor, new: ShapeColor) -> Self {
        Self::new(
            id,
            "color",
            old,
            new,
            Box::new(|item: &mut AnnotationItem, color: &ShapeColor| {
                match &mut item.kind {
                    AnnotationKind::Text(t) => t.color = *color,
                    AnnotationKind::Arrow(a) => a.color = *color,
                    AnnotationKind::Rectangle(s) | AnnotationKind::Ellipse(s) => s.color = *color,
                    AnnotationKind::Pen(p) => p.color = *color,
                    other => bail!("{} has no color", other.name()),
                }
                Ok(())
            }),
        )
    }
}

impl ModifyPropertyCommand<String> {
    /// Replace the content of a text annotation
    pub fn text(id: AnnotationId, old: String, new: String) -> Self {
        Self::new(
            id,
            "text",
            old,
            new,
            Box::new(|item: &mut AnnotationItem, text: &String| match &mut item.kind {
                AnnotationKind::Text(t) => {
                    t.text.clone_from(text);
                    Ok(())
                }
                other => bail!("{} has no text", other.name()),
            }),
        )
    }
}

impl<V> Command for ModifyPropertyCommand<V> {
    fn execute(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.apply(canvas, &self.new)
    }

    fn undo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.apply(canvas, &self.old)
    }

    fn description(&self) -> String {
        format!("Change {}", self.property)
    }

    fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Translate annotations by a delta
pub struct MoveCommand {
    ids: Vec<AnnotationId>,
    dx: f64,
    dy: f64,
    created_at: DateTime<Local>,
}

impl MoveCommand {
    pub fn new(ids: Vec<AnnotationId>, dx: f64, dy: f64) -> Self {
        Self {
            ids,
            dx,
            dy,
            created_at: Local::now(),
        }
    }

    fn shift(&self, canvas: &mut Canvas, dx: f64, dy: f64) -> anyhow::Result<()> {
        ensure_all_exist(canvas, &self.ids)?;
        for id in &self.ids {
            canvas.modify(*id, |item| {
                item.kind.translate(dx, dy);
                Ok(())
            })?;
        }
        Ok(())
    }
}

impl Command for MoveCommand {
    fn execute(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.shift(canvas, self.dx, self.dy)
    }

    fn undo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.shift(canvas, -self.dx, -self.dy)
    }

    fn description(&self) -> String {
        match self.ids.len() {
            1 => "Move annotation".to_string(),
            n => format!("Move {n} annotations"),
        }
    }

    fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

/// Scale annotations about a pivot point
pub struct TransformCommand {
    ids: Vec<AnnotationId>,
    pivot: Point,
    sx: f64,
    sy: f64,
    created_at: DateTime<Local>,
}

impl TransformCommand {
    pub fn new(ids: Vec<AnnotationId>, pivot: Point, sx: f64, sy: f64) -> Self {
        Self {
            ids,
            pivot,
            sx,
            sy,
            created_at: Local::now(),
        }
    }

    fn scale(&self, canvas: &mut Canvas, sx: f64, sy: f64) -> anyhow::Result<()> {
        ensure_all_exist(canvas, &self.ids)?;
        for id in &self.ids {
            canvas.modify(*id, |item| {
                item.kind.scale_about(self.pivot, sx, sy);
                Ok(())
            })?;
        }
        Ok(())
    }
}

fn invertible(factor: f64) -> bool {
    factor.is_finite() && factor != 0.0
}

impl Command for TransformCommand {
    fn execute(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.scale(canvas, self.sx, self.sy)
    }

    fn undo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        if !self.can_undo() {
            bail!("scale {}x{} cannot be reversed", self.sx, self.sy);
        }
        self.scale(canvas, self.sx.recip(), self.sy.recip())
    }

    fn description(&self) -> String {
        "Scale annotation".to_string()
    }

    fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// A zero factor collapses geometry and has no reciprocal
    fn can_undo(&self) -> bool {
        invertible(self.sx) && invertible(self.sy)
    }
}

/// Replace the control points of one annotation, e.g. both arrow endpoints
pub struct EditPointsCommand {
    id: AnnotationId,
    old: Vec<Point>,
    new: Vec<Point>,
    created_at: DateTime<Local>,
}

impl EditPointsCommand {
    pub fn new(id: AnnotationId, old: Vec<Point>, new: Vec<Point>) -> Self {
        Self {
            id,
            old,
            new,
            created_at: Local::now(),
        }
    }

    fn set(&self, canvas: &mut Canvas, points: &[Point]) -> anyhow::Result<()> {
        let id = self.id;
        canvas.modify(id, |item| Ok(item.kind.set_points(id, points)?))
    }
}

impl Command for EditPointsCommand {
    fn execute(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.set(canvas, &self.new)
    }

    fn undo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.set(canvas, &self.old)
    }

    fn description(&self) -> String {
        "Edit points".to_string()
    }

    fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

fn ensure_all_exist(canvas: &Canvas, ids: &[AnnotationId]) -> anyhow::Result<()> {
    if let Some(missing) = ids.iter().find(|id| !canvas.items().contains(**id)) {
        return Err(OverlayError::UnknownAnnotation(*missing).into());
    }
    Ok(())
}

// ============================================================================
// Composite
// ============================================================================

/// Ordered group of commands applied as one history entry
pub struct CompositeCommand {
    description: String,
    commands: Vec<Box<dyn Command>>,
    created_at: DateTime<Local>,
}

impl CompositeCommand {
    pub fn new(description: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            description: description.into(),
            commands,
            created_at: Local::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run `forward` on each command in order; on failure reverse the ones already done
    fn run_forward(
        &mut self,
        canvas: &mut Canvas,
        forward: fn(&mut dyn Command, &mut Canvas) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        for index in 0..self.commands.len() {
            if let Err(err) = forward(self.commands[index].as_mut(), canvas) {
                for done in self.commands[..index].iter_mut().rev() {
                    if let Err(rollback) = done.undo(canvas) {
                        log::error!(
                            "Rollback of '{}' failed: {:?}",
                            done.description(),
                            rollback
                        );
                    }
                }
                return Err(err.context(format!("step {} of '{}'", index + 1, self.description)));
            }
        }
        Ok(())
    }
}

impl Command for CompositeCommand {
    fn execute(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.run_forward(canvas, |c, canvas| c.execute(canvas))
    }

    fn redo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.run_forward(canvas, |c, canvas| c.redo(canvas))
    }

    fn undo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        let count = self.commands.len();
        for index in (0..count).rev() {
            if let Err(err) = self.commands[index].undo(canvas) {
                // Put back what was already undone so the canvas matches the history
                for undone in self.commands[index + 1..].iter_mut() {
                    if let Err(restore) = undone.redo(canvas) {
                        log::error!(
                            "Restoring '{}' failed: {:?}",
                            undone.description(),
                            restore
                        );
                    }
                }
                return Err(err.context(format!("undoing '{}'", self.description)));
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    fn can_undo(&self) -> bool {
        self.commands.iter().all(|c| c.can_undo())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArrowAnnotation, TextAnnotation};
    use crate::render::renderer::DirtyRegionRenderer;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn arrow_kind() -> AnnotationKind {
        AnnotationKind::Arrow(ArrowAnnotation {
            start: Point::new(10.0, 10.0),
            end: Point::new(60.0, 40.0),
            color: ShapeColor::default(),
            shadow: false,
        })
    }

    fn text_kind() -> AnnotationKind {
        AnnotationKind::Text(TextAnnotation {
            origin: Point::new(5.0, 5.0),
            text: "before".into(),
            font_size: 12.0,
            color: ShapeColor::BLACK,
            background: None,
        })
    }

    fn canvas_with(kinds: Vec<AnnotationKind>) -> (Canvas, Vec<AnnotationId>) {
        let mut canvas = Canvas::default();
        let mut ids = Vec::new();
        for kind in kinds {
            let item = canvas.items_mut().create(kind);
            ids.push(item.id);
            canvas.insert(item).unwrap();
        }
        (canvas, ids)
    }

    /// Observable state of the collection, ignoring timestamps
    fn observable(canvas: &Canvas) -> Vec<(AnnotationId, i64, AnnotationKind)> {
        canvas
            .items()
            .sorted_by_z()
            .into_iter()
            .map(|i| (i.id, i.z_index, i.kind.clone()))
            .collect()
    }

    fn assert_undo_restores(mut canvas: Canvas, mut command: Box<dyn Command>) {
        let before = observable(&canvas);
        command.execute(&mut canvas).unwrap();
        assert_ne!(observable(&canvas), before, "{}", command.description());
        command.undo(&mut canvas).unwrap();
        assert_eq!(observable(&canvas), before, "{}", command.description());
    }

    #[test]
    fn test_add_then_undo() {
        let (mut canvas, _) = canvas_with(vec![]);
        let item = canvas.items_mut().create(arrow_kind());
        assert_undo_restores(canvas, Box::new(AddAnnotationCommand::new(item)));
    }

    #[test]
    fn test_remove_then_undo() {
        let (canvas, ids) = canvas_with(vec![arrow_kind(), text_kind()]);
        assert_undo_restores(canvas, Box::new(RemoveAnnotationCommand::new(ids[0])));
    }

    #[test]
    fn test_modify_then_undo() {
        let (canvas, ids) = canvas_with(vec![text_kind()]);
        assert_undo_restores(
            canvas,
            Box::new(ModifyPropertyCommand::text(ids[0], "before".into(), "after".into())),
        );
        let (canvas, ids) = canvas_with(vec![arrow_kind()]);
        let blue = ShapeColor {
            r: 0.0,
            g: 0.0,
            b: 1.0,
        };
        assert_undo_restores(
            canvas,
            Box::new(ModifyPropertyCommand::color(ids[0], ShapeColor::default(), blue)),
        );
    }

    #[test]
    fn test_move_then_undo() {
        let (canvas, ids) = canvas_with(vec![arrow_kind(), text_kind()]);
        assert_undo_restores(canvas, Box::new(MoveCommand::new(ids, 5.0, -8.0)));
    }

    #[test]
    fn test_transform_then_undo() {
        let (canvas, ids) = canvas_with(vec![arrow_kind()]);
        assert_undo_restores(
            canvas,
            Box::new(TransformCommand::new(ids, Point::new(10.0, 10.0), 2.0, 4.0)),
        );
    }

    #[test]
    fn test_edit_points_then_undo() {
        let (canvas, ids) = canvas_with(vec![arrow_kind()]);
        let cmd = EditPointsCommand::new(
            ids[0],
            vec![Point::new(10.0, 10.0), Point::new(60.0, 40.0)],
            vec![Point::new(0.0, 0.0), Point::new(100.0, 100.0)],
        );
        assert_undo_restores(canvas, Box::new(cmd));
    }

    #[test]
    fn test_zero_scale_is_not_undoable() {
        let cmd = TransformCommand::new(vec![AnnotationId(1)], Point::default(), 0.0, 1.0);
        assert!(!cmd.can_undo());
        assert!(TransformCommand::new(vec![], Point::default(), 0.5, 2.0).can_undo());
    }

    #[test]
    fn test_modify_wrong_kind_fails_without_change() {
        let (mut canvas, ids) = canvas_with(vec![arrow_kind()]);
        let before = observable(&canvas);
        let mut cmd = ModifyPropertyCommand::text(ids[0], String::new(), "x".into());
        assert!(cmd.execute(&mut canvas).is_err());
        assert_eq!(observable(&canvas), before);
    }

    #[test]
    fn test_composite_undo_runs_in_reverse() {
        let (canvas, ids) = canvas_with(vec![arrow_kind()]);
        // Move then scale about the origin: reverse order matters for the result
        let composite = CompositeCommand::new(
            "Move and scale",
            vec![
                Box::new(MoveCommand::new(ids.clone(), 10.0, 0.0)),
                Box::new(TransformCommand::new(ids, Point::new(0.0, 0.0), 2.0, 2.0)),
            ],
        );
        assert_undo_restores(canvas, Box::new(composite));
    }

    #[test]
    fn test_composite_can_undo_is_and_of_members() {
        let composite = CompositeCommand::new(
            "Mixed",
            vec![
                Box::new(MoveCommand::new(vec![], 1.0, 1.0)),
                Box::new(TransformCommand::new(vec![], Point::default(), 0.0, 0.0)),
                Box::new(MoveCommand::new(vec![], 2.0, 2.0)),
            ],
        );
        assert_eq!(composite.len(), 3);
        assert!(!composite.can_undo());
    }

    #[test]
    fn test_composite_failure_rolls_back_completed_steps() {
        let (mut canvas, ids) = canvas_with(vec![arrow_kind()]);
        let before = observable(&canvas);
        let mut composite = CompositeCommand::new(
            "Broken",
            vec![
                Box::new(MoveCommand::new(ids.clone(), 3.0, 3.0)),
                Box::new(RemoveAnnotationCommand::new(AnnotationId(404))),
            ],
        );
        let err = composite.execute(&mut canvas).unwrap_err();
        assert!(format!("{err:#}").contains("step 2"));
        assert_eq!(observable(&canvas), before);
    }

    #[test]
    fn test_commands_repaint_affected_region() {
        let surface = Rc::new(RefCell::new(DirtyRegionRenderer::new()));
        let mut canvas = Canvas::new(Box::new(surface.clone()));
        let item = canvas.items_mut().create(arrow_kind());
        let id = item.id;
        let mut add = AddAnnotationCommand::new(item);
        add.execute(&mut canvas).unwrap();
        surface.borrow_mut().take_dirty();

        let mut mv = MoveCommand::new(vec![id], 100.0, 0.0);
        mv.execute(&mut canvas).unwrap();
        let dirty = surface.borrow_mut().take_dirty().unwrap();
        // Old and new positions both repaint
        assert!(dirty.left <= 10.0 && dirty.right >= 160.0);

        mv.undo(&mut canvas).unwrap();
        assert!(surface.borrow().dirty().is_some());
    }
}
