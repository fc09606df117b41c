//! # Feature Events
//!
//! Lifecycle notifications for collaborators that mirror the feature set
//! (scripting, rendering, the spatial index). Recorded only when
//! [`SimConfig::record_events`](crate::SimConfig::record_events) is set.

use super::def::FeatureDefId;
use super::feature::FeatureId;

/// Something that happened to a feature, in simulation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureEvent {
    /// A feature was created and registered.
    Created {
        /// The new feature.
        id: FeatureId,
        /// Its def.
        def: FeatureDefId,
    },
    /// A feature left the update worklist.
    Settled {
        /// The settled feature.
        id: FeatureId,
    },
    /// A feature was destroyed; its ID is now deferred.
    Destroyed {
        /// The destroyed feature.
        id: FeatureId,
    },
}
