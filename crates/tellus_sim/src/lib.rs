//! # TELLUS Simulation
//!
//! Lifecycle management for features: wreckage, rocks and other map debris
//! that live in the synced simulation.
//!
//! ## Design Principles
//!
//! 1. **Stable small IDs** - features are addressed by dense integer IDs that
//!    are identical on every peer
//! 2. **Deferred recycling** - a destroyed feature's ID is not reused inside
//!    its deferral window
//! 3. **All-or-nothing creation** - a feature is fully registered or not
//!    created at all
//! 4. **Deterministic ticks** - the worklist is visited in ascending ID order
//!
//! ## Example
//!
//! ```rust
//! use tellus_sim::{
//!     FeatureDefRegistry, FeatureHandler, FeatureLoadParams, FlatTerrain, SimConfig, TickDriver,
//! };
//! use tellus_shared::Vec3;
//!
//! let defs = FeatureDefRegistry::from_toml_str(r#"
//!     [[feature]]
//!     name = "rock"
//! "#)?;
//! let rock = defs.id_of("rock").unwrap();
//!
//! let mut handler = FeatureHandler::new(SimConfig::default(), defs)?;
//! let mut driver = TickDriver::new();
//!
//! let id = handler.create(FeatureLoadParams::new(rock, Vec3::ZERO))?;
//! assert!(handler.feature(id).is_some());
//!
//! driver.step(&mut handler, &FlatTerrain::new(0.0))?;
//! # Ok::<(), tellus_sim::FeatureError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod features;
pub mod map;
pub mod snapshot;
pub mod terrain;
pub mod tick;
pub mod view;

pub use config::SimConfig;
pub use error::{FeatureError, FeatureResult};
pub use features::{
    Feature, FeatureDef, FeatureDefId, FeatureDefRegistry, FeatureEvent, FeatureHandler,
    FeatureId, FeatureLoadParams, UnitDefId, UpdateSignal,
};
pub use map::{MapFeature, MapFeatureList, MapFeatureSource, MapLoadReport};
pub use snapshot::{FeatureRecord, IdentitySnapshot};
pub use terrain::{FlatTerrain, SpatialIndex, Terrain, TerrainRegion};
pub use tick::{TickDriver, TickReport, TickStats};
pub use view::{FeatureView, ViewEntry, ViewFrame};
