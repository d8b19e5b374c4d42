//! Event types published on the overlay bus
//!
//! Every event is a plain `Send` value so it can be queued from a background
//! thread through [`crate::events::dispatch::DispatchHandle`].

use crate::domain::{AnnotationId, AnnotationKind, Point, Rect, Tool};

// ============================================================================
// Selection
// ============================================================================

/// Pointer pressed on the overlay with no selection yet
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionStarted {
    pub origin: Point,
}

/// Selection rectangle changed while dragging
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChanged {
    pub rect: Rect,
}

/// Pointer released, selection rectangle fixed
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionFinished {
    pub rect: Rect,
}

/// Drop the current selection and start selecting again
#[derive(Debug, Clone, PartialEq)]
pub struct ReselectRequested;

// ============================================================================
// Tools and annotation editing
// ============================================================================

/// Active drawing tool changed
#[derive(Debug, Clone, PartialEq)]
pub struct ToolChanged {
    pub tool: Tool,
}

/// A drawing gesture finished and produced a new annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationCreated {
    pub kind: AnnotationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UndoRequested;

#[derive(Debug, Clone, PartialEq)]
pub struct RedoRequested;

/// Delete selected annotations
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequested;

/// Remove every annotation
#[derive(Debug, Clone, PartialEq)]
pub struct ClearRequested;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectAllRequested;

/// Move selected annotations by a keyboard step
#[derive(Debug, Clone, PartialEq)]
pub struct NudgeRequested {
    pub dx: f64,
    pub dy: f64,
    /// Use the large step from the config
    pub large: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyRequested;

#[derive(Debug, Clone, PartialEq)]
pub struct PasteRequested;

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateRequested;

/// Pointer click used to select an annotation under the cursor
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationClicked {
    pub point: Point,
    /// Add to the current selection instead of replacing it
    pub extend: bool,
}

/// In-place text editing began on an annotation
#[derive(Debug, Clone, PartialEq)]
pub struct TextEditStarted {
    pub id: AnnotationId,
}

/// In-place text editing ended; `text` is the committed content
#[derive(Debug, Clone, PartialEq)]
pub struct TextEditEnded {
    pub id: AnnotationId,
    pub text: String,
}

// ============================================================================
// Output
// ============================================================================

/// Save/export the selected region
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequested;

/// Confirm the selected region (copy and close)
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmRequested;

/// Abort the session
#[derive(Debug, Clone, PartialEq)]
pub struct CancelRequested {
    pub reason: String,
}

/// Capture or delivery failed; hosts show a non-blocking notification
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFailed {
    pub region: Rect,
    pub message: String,
}
