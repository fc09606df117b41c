//! # Identity Snapshots
//!
//! The part of the feature state that must survive save/load and resync
//! exactly: which IDs exist, what is bound to them, which are deferred.
//!
//! Defs are referenced by name so a snapshot stays valid if the def file is
//! reordered.

use serde::{Deserialize, Serialize};
use tellus_core::IdPoolState;
use tellus_shared::Vec3;

use crate::error::{FeatureError, FeatureResult};
use crate::features::{Feature, FeatureDef, FeatureDefId, FeatureId, UnitDefId};

/// Persisted form of one feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// The feature's ID.
    pub id: FeatureId,
    /// Name of its def.
    pub def_name: String,
    /// Originating unit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_def: Option<UnitDefId>,
    /// Owning team.
    pub team: i32,
    /// Owning alliance.
    pub ally_team: i32,
    /// Heading.
    pub heading: i16,
    /// Build facing.
    pub facing: i16,
    /// Frames of smoke left.
    pub smoke_time: i32,
    /// Remaining health.
    pub health: f32,
    /// Fraction not yet reclaimed.
    pub reclaim_left: f32,
    /// Whether it was at rest.
    pub resting: bool,
    /// World position.
    pub pos: Vec3,
    /// Velocity.
    pub speed: Vec3,
}

impl FeatureRecord {
    /// Captures a feature.
    #[must_use]
    pub fn from_feature(feature: &Feature, def_name: String) -> Self {
        Self {
            id: feature.id(),
            def_name,
            unit_def: feature.unit_def(),
            pos: feature.pos,
            speed: feature.speed,
            team: feature.team(),
            ally_team: feature.ally_team(),
            heading: feature.heading(),
            facing: feature.facing(),
            smoke_time: feature.smoke_time(),
            health: feature.health(),
            reclaim_left: feature.reclaim_left(),
            resting: feature.is_resting(),
        }
    }

    pub(crate) fn to_feature(&self, def_id: FeatureDefId, def: &FeatureDef) -> Feature {
        let params = crate::FeatureLoadParams {
            def: def_id,
            unit_def: self.unit_def,
            pos: self.pos,
            speed: self.speed,
            requested_id: Some(self.id),
            team: self.team,
            ally_team: self.ally_team,
            heading: self.heading,
            facing: self.facing,
            smoke_time: self.smoke_time,
        };
        Feature::restored(
            self.id,
            def_id,
            def,
            &params,
            self.health,
            self.reclaim_left,
            self.resting,
        )
    }
}

/// Everything needed to rebuild the feature registry exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    /// Frame the snapshot was taken on.
    pub frame: u64,
    /// Length of the dense ID → object array.
    pub id_space_len: usize,
    /// Worklist members in ascending ID order.
    pub update_worklist: Vec<FeatureId>,
    /// ID pool state, including deferred IDs.
    pub ids: IdPoolState,
    /// Live features in ascending ID order.
    pub features: Vec<FeatureRecord>,
}

impl IdentitySnapshot {
    /// Active IDs in ascending order.
    pub fn active_ids(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.features.iter().map(|r| r.id)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::CorruptSnapshot`] if a value cannot be
    /// represented in TOML.
    pub fn to_toml_string(&self) -> FeatureResult<String> {
        toml::to_string(self).map_err(|e| FeatureError::CorruptSnapshot(e.to_string()))
    }

    /// Parses a TOML snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::CorruptSnapshot`] on malformed input.
    pub fn from_toml_str(text: &str) -> FeatureResult<Self> {
        toml::from_str(text).map_err(|e| FeatureError::CorruptSnapshot(e.to_string()))
    }
}
