//! Overlay event plumbing
//!
//! This module contains:
//! - The typed publish/subscribe bus
//! - The overlay event types
//! - The cross-thread dispatch queue

pub mod bus;
pub mod dispatch;
pub mod types;

pub use bus::{EventBus, Handler, handler};
pub use dispatch::{DispatchHandle, DispatchQueue};
pub use types::*;
