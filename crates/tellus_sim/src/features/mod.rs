//! # Features
//!
//! Wreckage, rocks and other map debris: their defs, the objects themselves
//! and the handler that owns them.

mod def;
mod events;
mod feature;
mod handler;
mod params;

pub use def::{FeatureDef, FeatureDefId, FeatureDefRegistry, UnitDefId};
pub use events::FeatureEvent;
pub use feature::{Feature, FeatureId, UpdateSignal};
pub use handler::FeatureHandler;
pub use params::FeatureLoadParams;
