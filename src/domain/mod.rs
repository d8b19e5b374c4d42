//! Pure domain types with minimal dependencies
//!
//! This module contains core types used throughout the engine.
//! Types here have no knowledge of buses, sessions or collaborators.

pub mod annotation;
pub mod geometry;
pub mod mode;
pub mod screen;

pub use annotation::*;
pub use geometry::*;
pub use mode::*;
pub use screen::*;
