//! Image capture and composition
//!
//! This module consolidates:
//! - The platform capture collaborator (strategy.rs)
//! - Frozen backgrounds and region extraction (service.rs)

pub mod service;
pub mod strategy;

pub use service::{CaptureService, FrozenBackground};
pub use strategy::{CaptureStrategy, CaptureTarget, StaticCaptureStrategy};
