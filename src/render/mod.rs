//! Annotation rendering
//!
//! This module contains:
//! - The renderer seam the canvas notifies about repaints
//! - Stroke geometry shared by the image compositor
//! - Composition of annotations onto captured images using tiny-skia

pub mod geometry;
pub mod image;
pub mod renderer;

pub use self::image::{Compositor, SkiaCompositor};
pub use renderer::{AnnotationRenderer, DirtyRegionRenderer};
