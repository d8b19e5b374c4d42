//! Overlay session management
//!
//! This module contains:
//! - Per-window session state and the mode state machine
//! - The event coordinator that drives a session from its bus
//! - The collaborators export, confirm and cancel are delegated to
//! - The orchestrator that opens one overlay window per screen

pub mod actions;
pub mod coordinator;
pub mod orchestrator;
pub mod state;

pub use actions::{ActionHandler, CapturedRegion, OverlayHost};
pub use coordinator::EventCoordinator;
pub use orchestrator::{OverlayOrchestrator, OverlayWindow, RendererFactory};
pub use state::OverlaySession;
