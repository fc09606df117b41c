//! # TELLUS Shared
//!
//! Math types and simulation constants used by both the object pools and the
//! feature handler.
//!
//! ## Determinism Rule
//!
//! Every value in here is part of the synced simulation. Changing a constant
//! changes the simulation for all peers; bump the protocol when you do.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    DEFAULT_GRAVITY, GAME_SPEED, HEADING_UNITS, MAX_FEATURES, SQUARE_SIZE,
};
pub use math::Vec3;
