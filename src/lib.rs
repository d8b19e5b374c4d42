//! Overlay session engine for screenshot selection and annotation
//!
//! One transient overlay window per monitor drives a
//! selection, annotation and export cycle. User input is published on a
//! per-window event bus; the event coordinator turns it into mode changes,
//! undoable annotation edits and capture of the selected region.

pub mod annotations;
pub mod capture;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod export;
pub mod history;
pub mod placement;
pub mod render;
pub mod session;

pub use config::EngineConfig;
pub use error::{OverlayError, Result};
pub use session::{
    ActionHandler, CapturedRegion, EventCoordinator, OverlayHost, OverlayOrchestrator,
    OverlaySession,
};
