//! Event system for Toolbelt Studio
//!
//! This crate provides the typed progress events emitted during a session
//! run, together with the broadcast bus used by the global observation
//! stream.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
