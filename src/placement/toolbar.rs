//! Floating toolbar placement next to a selection
//!
//! The toolbar goes below the selection when it fits, above it otherwise, and
//! inside its bottom-right corner as a last resort. It is right-aligned with the
//! selection and always kept entirely on one screen.

use super::screens::screen_from_rect;
use crate::domain::{Point, Rect, ScreenDescriptor, Size};

/// Default distance of the screen probe from the selection's bottom-right corner
pub const DEFAULT_PROBE_INSET: f64 = 2.0;

/// Everything needed to place the toolbar
#[derive(Debug, Clone)]
pub struct ToolbarPositionContext<'a> {
    /// Selection in overlay-local logical coordinates
    pub selection: Rect,
    pub toolbar_size: Size,
    /// Global position of the overlay window's top-left corner
    pub window_position: Point,
    pub screens: &'a [ScreenDescriptor],
    pub margin: f64,
    pub probe_inset: f64,
}

impl<'a> ToolbarPositionContext<'a> {
    pub fn new(
        selection: Rect,
        toolbar_size: Size,
        window_position: Point,
        screens: &'a [ScreenDescriptor],
        margin: f64,
    ) -> Self {
        Self {
            selection,
            toolbar_size,
            window_position,
            screens,
            margin,
            probe_inset: DEFAULT_PROBE_INSET,
        }
    }

    pub fn with_probe_inset(mut self, inset: f64) -> Self {
        self.probe_inset = inset;
        self
    }
}

/// Which side of the selection the toolbar ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAnchor {
    Below,
    Above,
    Inside,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolbarPlacement {
    /// Top-left of the toolbar in overlay-local coordinates
    pub position: Point,
    pub anchor: ToolbarAnchor,
    /// Name of the screen the toolbar was fitted to
    pub screen: Option<String>,
}

/// Compute where the toolbar goes for the given selection
pub fn calculate_position(ctx: &ToolbarPositionContext<'_>) -> ToolbarPlacement {
    let offset = ctx.window_position;
    let selection = ctx.selection.normalized().translate(offset.x, offset.y);
    let Size { width, height } = ctx.toolbar_size;
    let margin = ctx.margin;

    let screen = screen_from_rect(selection, ctx.probe_inset, ctx.screens).or_else(|| {
        log::debug!("Selection {:?} is off every screen, using the first", selection);
        ctx.screens.first()
    });

    let Some(screen) = screen else {
        log::warn!("No screens known, toolbar placed without clamping");
        return ToolbarPlacement {
            position: Point::new(
                selection.right - width - offset.x,
                selection.bottom + margin - offset.y,
            ),
            anchor: ToolbarAnchor::Below,
            screen: None,
        };
    };

    let bounds = screen.bounds;
    let clipped = selection.intersect(bounds).unwrap_or(selection);

    let (y, anchor) = if bounds.bottom - clipped.bottom >= height + margin {
        (clipped.bottom + margin, ToolbarAnchor::Below)
    } else if clipped.top - bounds.top >= height + margin {
        (clipped.top - margin - height, ToolbarAnchor::Above)
    } else {
        (clipped.bottom - height - margin, ToolbarAnchor::Inside)
    };

    let mut x = clipped.right - width;
    if x < bounds.left {
        x = bounds.left;
    } else if x + width > bounds.right {
        x = bounds.right - width;
    }

    // Prefer the top edge when the toolbar is taller than the screen
    let y = y.min(bounds.bottom - height).max(bounds.top);

    log::trace!(
        "Toolbar {:?} on {} at ({}, {})",
        anchor,
        screen.name,
        x,
        y
    );

    ToolbarPlacement {
        position: Point::new(x - offset.x, y - offset.y),
        anchor,
        screen: Some(screen.name.clone()),
    }
}
