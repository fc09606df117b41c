//! # Memory Management
//!
//! Page-per-object storage for simulation objects.
//!
//! ## Design Philosophy
//!
//! Pages are created on demand and then recycled for the rest of the game:
//! - No fragmentation (every page fits exactly one object)
//! - No object ever moves once stored
//! - Handles carry a generation, so use-after-release is detectable

mod pool;

pub use pool::{SlotHandle, SlotPool};
