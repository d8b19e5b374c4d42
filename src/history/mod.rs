//! Bounded undo/redo history of annotation commands
//!
//! This module contains:
//! - The [`Command`] contract
//! - Concrete commands (add, remove, modify, move, transform, edit points, composite)
//! - [`CommandHistory`], the two-stack manager

pub mod command;
pub mod commands;

use std::collections::VecDeque;

pub use command::Command;
pub use commands::*;

use crate::annotations::canvas::Canvas;
use crate::error::OverlayError;

/// Default number of undo entries kept
pub const DEFAULT_CAPACITY: usize = 50;

/// Undo and redo stacks over one canvas
pub struct CommandHistory {
    /// Oldest entry at the front, most recent at the back
    undo: VecDeque<Box<dyn Command>>,
    redo: Vec<Box<dyn Command>>,
    capacity: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            undo: VecDeque::with_capacity(capacity),
            redo: Vec::new(),
            capacity,
        }
    }

    /// Run `command` and record it.
    ///
    /// Any new command invalidates the redo stack. A failing command is not
    /// recorded and its error is returned to the caller.
    pub fn execute(&mut self, mut command: Box<dyn Command>, canvas: &mut Canvas) -> anyhow::Result<()> {
        if let Err(err) = command.execute(canvas) {
            log::error!("Command '{}' failed: {:?}", command.description(), err);
            return Err(err.context(OverlayError::CommandExecution(command.description())));
        }
        log::debug!("Executed '{}'", command.description());
        self.undo.push_back(command);
        self.redo.clear();
        self.evict_overflow();
        Ok(())
    }

    fn evict_overflow(&mut self) {
        while self.undo.len() > self.capacity {
            if let Some(oldest) = self.undo.pop_front() {
                log::debug!("Undo history full, dropping '{}'", oldest.description());
            }
        }
    }

    /// True when the top entry exists and can be reversed
    pub fn can_undo(&self) -> bool {
        self.undo.back().is_some_and(|c| c.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Reverse the most recent command. Returns false if nothing was undone.
    ///
    /// On failure both stacks stay as they were before the call.
    pub fn undo(&mut self, canvas: &mut Canvas) -> bool {
        if !self.can_undo() {
            return false;
        }
        let Some(mut command) = self.undo.pop_back() else {
            return false;
        };
        match command.undo(canvas) {
            Ok(()) => {
                log::debug!("Undid '{}'", command.description());
                self.redo.push(command);
                true
            }
            Err(err) => {
                log::error!("Undo of '{}' failed: {:?}", command.description(), err);
                self.undo.push_back(command);
                false
            }
        }
    }

    /// Re-apply the most recently undone command. Returns false if nothing was redone.
    pub fn redo(&mut self, canvas: &mut Canvas) -> bool {
        let Some(mut command) = self.redo.pop() else {
            return false;
        };
        match command.redo(canvas) {
            Ok(()) => {
                log::debug!("Redid '{}'", command.description());
                self.undo.push_back(command);
                self.evict_overflow();
                true
            }
            Err(err) => {
                log::error!("Redo of '{}' failed: {:?}", command.description(), err);
                self.redo.push(command);
                false
            }
        }
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo.back().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo.last().map(|c| c.description())
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, dropping the oldest entries if needed
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict_overflow();
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
