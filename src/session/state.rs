//! Per-window session state
//!
//! One [`OverlaySession`] exists per overlay window. It holds the mode state
//! machine, the selection and the frozen background of that window's screen.

use crate::capture::FrozenBackground;
use crate::domain::{OverlayMode, Point, Rect, ScreenDescriptor};
use crate::error::{OverlayError, Result};

#[derive(Debug, Clone)]
pub struct OverlaySession {
    screen: ScreenDescriptor,
    mode: OverlayMode,
    /// Selection the overlay is still dragging, not yet pushed into the session
    draft: Option<Rect>,
    /// Selection fixed by the last sync
    selection: Option<Rect>,
    frozen: Option<FrozenBackground>,
}

impl OverlaySession {
    pub fn new(screen: ScreenDescriptor) -> Self {
        Self {
            screen,
            mode: OverlayMode::Idle,
            draft: None,
            selection: None,
            frozen: None,
        }
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn screen(&self) -> &ScreenDescriptor {
        &self.screen
    }

    /// Global position of the overlay window's top-left corner
    pub fn window_position(&self) -> Point {
        self.screen.bounds.top_left()
    }

    /// Synced selection in overlay-local coordinates
    pub fn selection(&self) -> Option<Rect> {
        self.selection
    }

    /// Selection as the user currently sees it, synced or not
    pub fn visible_selection(&self) -> Option<Rect> {
        self.draft.or(self.selection)
    }

    /// Selection in global logical coordinates
    pub fn global_selection(&self) -> Option<Rect> {
        let origin = self.window_position();
        self.selection.map(|r| r.translate(origin.x, origin.y))
    }

    pub fn is_synced(&self) -> bool {
        self.draft.is_none()
    }

    pub fn frozen_background(&self) -> Option<&FrozenBackground> {
        self.frozen.as_ref()
    }

    pub fn set_frozen_background(&mut self, frozen: Option<FrozenBackground>) {
        self.frozen = frozen;
    }

    /// Replace the screen after a monitor change. Drops a frozen background
    /// taken with the old geometry.
    pub fn set_screen(&mut self, screen: ScreenDescriptor) {
        if screen != self.screen {
            self.frozen = None;
        }
        self.screen = screen;
    }

    /// Record the rectangle being dragged without syncing it
    pub fn update_selection(&mut self, rect: Rect) {
        self.draft = Some(rect.normalized());
    }

    /// Push the final selection into the session
    pub fn sync_selection(&mut self, rect: Rect) {
        let rect = rect.normalized();
        log::debug!("Selection synced: {:?}", rect);
        self.selection = Some(rect);
        self.draft = None;
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.draft = None;
    }

    /// Move to `target`, validating the transition.
    ///
    /// Entering [`OverlayMode::Annotating`] requires a non-empty selection that
    /// has already been synced. On error the session is left unchanged.
    pub fn switch_mode(&mut self, target: OverlayMode) -> Result<()> {
        let from = self.mode;
        if from == target {
            return Ok(());
        }
        if !from.can_transition_to(target) {
            return Err(OverlayError::InvalidTransition { from, to: target });
        }
        if target == OverlayMode::Annotating {
            if !self.is_synced() {
                return Err(OverlayError::SelectionNotSynced);
            }
            match self.selection {
                Some(rect) if !rect.is_empty() => {}
                _ => return Err(OverlayError::EmptySelection(target)),
            }
        }

        match target {
            OverlayMode::Idle => {
                self.clear_selection();
                self.frozen = None;
            }
            OverlayMode::Selecting => self.clear_selection(),
            OverlayMode::Annotating | OverlayMode::Exporting => {}
        }
        log::debug!("{}: {:?} -> {:?}", self.screen.name, from, target);
        self.mode = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Size;

    fn session() -> OverlaySession {
        OverlaySession::new(ScreenDescriptor::new(
            "main",
            Rect::new(1920.0, 0.0, 3840.0, 1080.0),
            1.0,
        ))
    }

    fn selecting() -> OverlaySession {
        let mut s = session();
        s.switch_mode(OverlayMode::Selecting).unwrap();
        s
    }

    #[test]
    fn test_annotating_after_sync_succeeds() {
        let mut s = selecting();
        s.update_selection(Rect::new(10.0, 10.0, 50.0, 50.0));
        s.sync_selection(Rect::new(10.0, 10.0, 60.0, 60.0));
        assert!(s.switch_mode(OverlayMode::Annotating).is_ok());
        assert_eq!(s.selection(), Some(Rect::new(10.0, 10.0, 60.0, 60.0)));
    }

    #[test]
    fn test_switch_before_sync_is_rejected() {
        let mut s = selecting();
        s.update_selection(Rect::new(10.0, 10.0, 50.0, 50.0));
        assert_eq!(
            s.switch_mode(OverlayMode::Annotating),
            Err(OverlayError::SelectionNotSynced)
        );
        assert_eq!(s.mode(), OverlayMode::Selecting);
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let mut s = selecting();
        assert_eq!(
            s.switch_mode(OverlayMode::Annotating),
            Err(OverlayError::EmptySelection(OverlayMode::Annotating))
        );
        s.sync_selection(Rect::new(5.0, 5.0, 5.0, 40.0));
        assert_eq!(
            s.switch_mode(OverlayMode::Annotating),
            Err(OverlayError::EmptySelection(OverlayMode::Annotating))
        );
        assert_eq!(s.mode(), OverlayMode::Selecting);
    }

    #[test]
    fn test_invalid_transition_leaves_mode() {
        let mut s = session();
        assert_eq!(
            s.switch_mode(OverlayMode::Exporting),
            Err(OverlayError::InvalidTransition {
                from: OverlayMode::Idle,
                to: OverlayMode::Exporting
            })
        );
        assert_eq!(s.mode(), OverlayMode::Idle);
        assert!(s.switch_mode(OverlayMode::Idle).is_ok());
    }

    #[test]
    fn test_idle_drops_selection_and_background() {
        let mut s = selecting();
        s.sync_selection(Rect::new(0.0, 0.0, 10.0, 10.0));
        s.set_frozen_background(Some(FrozenBackground::new(
            "main",
            image::RgbaImage::new(4, 4),
            Size::new(4.0, 4.0),
        )));
        s.switch_mode(OverlayMode::Annotating).unwrap();
        s.switch_mode(OverlayMode::Idle).unwrap();
        assert_eq!(s.selection(), None);
        assert!(s.frozen_background().is_none());
    }

    #[test]
    fn test_global_selection_adds_window_origin() {
        let mut s = selecting();
        s.sync_selection(Rect::new(50.0, 10.0, 20.0, 40.0));
        assert_eq!(s.global_selection(), Some(Rect::new(1940.0, 10.0, 1970.0, 40.0)));
    }
}
