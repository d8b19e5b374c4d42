//! Collaborators the session hands finished work to

use futures::future::LocalBoxFuture;
use image::RgbaImage;

use crate::domain::Rect;

/// Composed capture of the selection, ready for delivery
#[derive(Clone, Debug)]
pub struct CapturedRegion {
    /// Name of the screen the selection lives on
    pub screen: String,
    /// Selection in overlay-local logical coordinates
    pub selection: Rect,
    /// Selection in global logical coordinates
    pub global: Rect,
    /// Pixels at the screen's physical resolution, annotations included
    pub image: RgbaImage,
}

/// What to do with a capture once the user is done
///
/// Export and confirm may suspend on platform calls (file dialogs, clipboard).
/// The returned futures run on the overlay thread and may be aborted at any
/// await point when the session is cancelled.
pub trait ActionHandler {
    /// Save or share the region; the session keeps annotating afterwards
    fn handle_export(&self, region: CapturedRegion) -> LocalBoxFuture<'static, anyhow::Result<()>>;

    /// Deliver the region and end the session
    fn handle_confirm(&self, region: CapturedRegion) -> LocalBoxFuture<'static, anyhow::Result<()>>;

    fn handle_cancel(&self, reason: &str);
}

/// Back-reference from a session to the orchestrator that owns its window
pub trait OverlayHost {
    /// Route keyboard input through the input method while text is edited
    fn set_ime_enabled(&self, enabled: bool);
}
