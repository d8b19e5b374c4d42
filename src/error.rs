//! Error types for the overlay engine.
//!
//! Collaborator calls (capture strategies, action handlers, commands) return
//! `anyhow::Result`; the engine's own invariant violations are [`OverlayError`].

use thiserror::Error;

use crate::domain::{AnnotationId, OverlayMode};

/// Errors raised by the overlay engine itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverlayError {
    /// Switching to annotation mode without any stored selection.
    #[error("Selection is empty, cannot switch to {0:?}")]
    EmptySelection(OverlayMode),

    /// A selection exists in the overlay but was never pushed into the session.
    #[error("Selection has not been synchronized into the session")]
    SelectionNotSynced,

    /// The mode state machine does not allow this transition.
    #[error("Invalid mode transition from {from:?} to {to:?}")]
    InvalidTransition { from: OverlayMode, to: OverlayMode },

    /// No annotation with this id exists in the collection.
    #[error("Unknown annotation {0}")]
    UnknownAnnotation(AnnotationId),

    /// An annotation id was reused while the original is still present.
    #[error("Annotation {0} already exists")]
    DuplicateAnnotation(AnnotationId),

    /// Control point edit does not match the annotation's point count.
    #[error("Annotation {id} expects {expected} points, got {actual}")]
    PointCountMismatch {
        id: AnnotationId,
        expected: usize,
        actual: usize,
    },

    /// A command's forward action failed and was not recorded.
    #[error("Command '{0}' failed")]
    CommandExecution(String),

    /// Capture produced no image.
    #[error("Capture failed: {0}")]
    CaptureFailure(String),
}

impl OverlayError {
    /// Creates a capture failure with the given message.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::CaptureFailure(msg.into())
    }

    /// True for errors caused by calling the mode state machine incorrectly.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptySelection(_) | Self::SelectionNotSynced | Self::InvalidTransition { .. }
        )
    }
}

/// A convenient alias for Result with [`OverlayError`].
pub type Result<T> = std::result::Result<T, OverlayError>;
