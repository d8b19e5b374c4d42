//! Annotation collection, canvas and layer
//!
//! This module provides:
//! - The per-session annotation collection (ids, z-order, selection)
//! - The canvas that pairs the collection with its renderer
//! - The annotation layer that routes edits through the command history

pub mod canvas;
pub mod collection;
pub mod layer;

pub use canvas::Canvas;
pub use collection::AnnotationCollection;
pub use layer::AnnotationLayer;
