//! Session phase and drawing tool selection

use serde::{Deserialize, Serialize};

/// Phase of an overlay session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverlayMode {
    /// Overlay shown, nothing selected yet
    #[default]
    Idle,
    /// User is dragging out a selection
    Selecting,
    /// Selection fixed, annotation tools active
    Annotating,
    /// Capture/export in flight
    Exporting,
}

impl OverlayMode {
    /// Whether the state machine allows moving from `self` to `to`
    pub fn can_transition_to(self, to: OverlayMode) -> bool {
        use OverlayMode::*;
        match (self, to) {
            (a, b) if a == b => true,
            (_, Idle) => true,
            (Idle, Selecting) => true,
            (Selecting, Annotating) => true,
            (Annotating, Selecting) => true,
            (Annotating, Exporting) => true,
            (Exporting, Annotating) => true,
            _ => false,
        }
    }
}

/// Annotation tool type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tool {
    /// Pick, move and edit existing annotations
    #[default]
    Select,
    Arrow,
    Rectangle,
    Ellipse,
    Text,
    Sticker,
    Pen,
    Redact,
    Pixelate,
}

impl Tool {
    /// Tools that create annotations on drag
    pub fn is_drawing(self) -> bool {
        !matches!(self, Tool::Select)
    }

    /// Get the icon name for this tool
    pub fn icon_name(self) -> &'static str {
        match self {
            Tool::Select => "edit-select-symbolic",
            Tool::Arrow => "arrow-symbolic",
            Tool::Rectangle => "square-symbolic",
            Tool::Ellipse => "circle-symbolic",
            Tool::Text => "insert-text-symbolic",
            Tool::Sticker => "face-smile-symbolic",
            Tool::Pen => "pencil-symbolic",
            Tool::Redact => "redact-symbolic",
            Tool::Pixelate => "pixelate-symbolic",
        }
    }
}
