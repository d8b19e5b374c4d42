//! The reversible command contract

use chrono::{DateTime, Local};

use crate::annotations::canvas::Canvas;

/// One reversible annotation mutation.
///
/// `execute` and `undo` repaint whatever they change through the canvas.
pub trait Command {
    /// Perform the mutation
    fn execute(&mut self, canvas: &mut Canvas) -> anyhow::Result<()>;

    /// Reverse a previous `execute`
    fn undo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()>;

    /// Perform the mutation again after an undo
    fn redo(&mut self, canvas: &mut Canvas) -> anyhow::Result<()> {
        self.execute(canvas)
    }

    /// Human-readable label for menus and logs
    fn description(&self) -> String;

    fn created_at(&self) -> DateTime<Local>;

    /// Whether `undo` can reverse this command
    fn can_undo(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for dyn Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("description", &self.description())
            .field("can_undo", &self.can_undo())
            .finish()
    }
}
