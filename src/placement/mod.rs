//! Multi-monitor geometry
//!
//! Stateless helpers consulted on demand:
//! - Which screen contains a point or owns a region
//! - Where the floating toolbar goes for a selection

pub mod screens;
pub mod toolbar;

pub use screens::{inset_probe, logical_to_physical, screen_from_point, screen_from_rect};
pub use toolbar::{
    ToolbarAnchor, ToolbarPlacement, ToolbarPositionContext, calculate_position,
};
