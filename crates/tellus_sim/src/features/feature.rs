//! # Features
//!
//! A feature is identity plus a small amount of lifecycle state. Combat and
//! rendering live elsewhere; this type only knows how to fall, smoke, settle
//! and die.

use std::fmt;

use serde::{Deserialize, Serialize};
use tellus_shared::Vec3;

use super::def::{FeatureDef, FeatureDefId, UnitDefId};
use super::params::FeatureLoadParams;
use crate::terrain::Terrain;

/// Synced feature identifier. Dense, small, identical on every peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u32);

impl FeatureId {
    /// Creates a feature ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the ID as an index into ID-addressed arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the tick driver should do with a feature after its update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateSignal {
    /// Still moving or smoking; stay on the worklist.
    Keep,
    /// At rest; leave the worklist but stay active.
    Settle,
    /// Dead; destroy it.
    Destroy,
}

/// A live feature.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    id: FeatureId,
    def: FeatureDefId,
    unit_def: Option<UnitDefId>,
    /// World position.
    pub pos: Vec3,
    /// Velocity, world units per frame.
    pub speed: Vec3,
    team: i32,
    ally_team: i32,
    heading: i16,
    facing: i16,
    smoke_time: i32,
    health: f32,
    reclaim_left: f32,
    reclaimable: bool,
    half_extents: (f32, f32),
    resting: bool,
    pub(crate) in_update_queue: bool,
}

impl Feature {
    /// Builds a feature from its def and creation request.
    pub(crate) fn new(
        id: FeatureId,
        def_id: FeatureDefId,
        def: &FeatureDef,
        params: &FeatureLoadParams,
    ) -> Self {
        Self {
            id,
            def: def_id,
            unit_def: params.unit_def,
            pos: params.pos,
            speed: params.speed,
            team: params.team,
            ally_team: params.ally_team,
            heading: params.heading,
            facing: params.facing,
            smoke_time: params.smoke_time.max(0),
            health: def.health,
            reclaim_left: 1.0,
            reclaimable: def.reclaimable,
            half_extents: def.half_extents(),
            resting: false,
            in_update_queue: false,
        }
    }

    /// Rebuilds a feature from persisted lifecycle state.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restored(
        id: FeatureId,
        def_id: FeatureDefId,
        def: &FeatureDef,
        params: &FeatureLoadParams,
        health: f32,
        reclaim_left: f32,
        resting: bool,
    ) -> Self {
        Self {
            health,
            reclaim_left,
            resting,
            ..Self::new(id, def_id, def, params)
        }
    }

    /// Returns the feature's ID.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> FeatureId {
        self.id
    }

    /// Returns the feature's def.
    #[inline]
    #[must_use]
    pub const fn def(&self) -> FeatureDefId {
        self.def
    }

    /// Returns the unit this is the wreck of, if any.
    #[inline]
    #[must_use]
    pub const fn unit_def(&self) -> Option<UnitDefId> {
        self.unit_def
    }

    /// Returns the owning team.
    #[inline]
    #[must_use]
    pub const fn team(&self) -> i32 {
        self.team
    }

    /// Returns the owning alliance.
    #[inline]
    #[must_use]
    pub const fn ally_team(&self) -> i32 {
        self.ally_team
    }

    /// Returns the heading.
    #[inline]
    #[must_use]
    pub const fn heading(&self) -> i16 {
        self.heading
    }

    /// Returns the build facing.
    #[inline]
    #[must_use]
    pub const fn facing(&self) -> i16 {
        self.facing
    }

    /// Returns the frames of smoke left.
    #[inline]
    #[must_use]
    pub const fn smoke_time(&self) -> i32 {
        self.smoke_time
    }

    /// Returns the remaining health.
    #[inline]
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Returns the fraction not yet reclaimed (1.0 = untouched).
    #[inline]
    #[must_use]
    pub const fn reclaim_left(&self) -> f32 {
        self.reclaim_left
    }

    /// Returns the footprint half extents in world units (x, z).
    #[inline]
    #[must_use]
    pub const fn half_extents(&self) -> (f32, f32) {
        self.half_extents
    }

    /// True if the feature came to rest on its last update.
    #[inline]
    #[must_use]
    pub const fn is_resting(&self) -> bool {
        self.resting
    }

    /// True while the feature is on the update worklist.
    #[inline]
    #[must_use]
    pub const fn in_update_queue(&self) -> bool {
        self.in_update_queue
    }

    /// True once health or reclaim has run out.
    #[inline]
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0 || self.reclaim_left <= 0.0
    }

    /// True if the feature has per-tick work to do.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        !self.resting || self.smoke_time > 0 || !self.speed.is_zero() || self.is_dead()
    }

    /// Applies damage. Returns true if this killed the feature.
    pub(crate) fn apply_damage(&mut self, amount: f32) -> bool {
        let was_dead = self.is_dead();
        self.health -= amount.max(0.0);
        !was_dead && self.is_dead()
    }

    /// Removes a fraction of the feature. Returns true if it is now gone.
    ///
    /// Features whose def is not reclaimable ignore this.
    pub(crate) fn reclaim(&mut self, fraction: f32) -> bool {
        if !self.reclaimable {
            return false;
        }
        let was_dead = self.is_dead();
        self.reclaim_left = (self.reclaim_left - fraction.max(0.0)).max(0.0);
        !was_dead && self.is_dead()
    }

    /// Marks the feature as disturbed so its next update re-checks the ground.
    pub(crate) fn wake(&mut self) {
        self.resting = false;
    }

    /// Advances the feature by one simulation frame.
    ///
    /// Falls under `gravity` until it meets the ground, snaps up if the ground
    /// rose beneath it, and counts down its smoke.
    pub fn update(&mut self, terrain: &dyn Terrain, gravity: f32) -> UpdateSignal {
        if self.is_dead() {
            return UpdateSignal::Destroy;
        }

        let mut busy = false;
        if self.smoke_time > 0 {
            self.smoke_time -= 1;
            busy = self.smoke_time > 0;
        }

        let ground = terrain.ground_height(self.pos.x, self.pos.z);
        if !self.speed.is_zero() || self.pos.y > ground {
            self.speed.y += gravity;
            self.pos += self.speed;

            let ground = terrain.ground_height(self.pos.x, self.pos.z);
            if self.pos.y <= ground {
                self.pos.y = ground;
                self.speed = Vec3::ZERO;
            } else {
                busy = true;
            }
        } else if self.pos.y < ground {
            self.pos.y = ground;
        }

        self.resting = !busy;
        if busy {
            UpdateSignal::Keep
        } else {
            UpdateSignal::Settle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::FlatTerrain;

    fn rock(pos: Vec3) -> Feature {
        let def = FeatureDef::new("rock");
        Feature::new(
            FeatureId(1),
            FeatureDefId(0),
            &def,
            &FeatureLoadParams::new(FeatureDefId(0), pos),
        )
    }

    #[test]
    fn test_feature_falls_and_settles() {
        let mut feature = rock(Vec3::new(0.0, 10.0, 0.0));
        let ground = FlatTerrain::new(0.0);

        let mut frames = 0;
        while feature.update(&ground, -1.0) == UpdateSignal::Keep {
            frames += 1;
            assert!(frames < 100, "feature never landed");
        }

        assert_eq!(feature.pos.y, 0.0);
        assert!(feature.speed.is_zero());
        assert!(feature.is_resting());
        assert!(!feature.needs_update());
    }

    #[test]
    fn test_feature_on_ground_settles_immediately() {
        let mut feature = rock(Vec3::new(5.0, 2.0, 5.0));
        assert!(feature.needs_update());
        assert_eq!(
            feature.update(&FlatTerrain::new(2.0), -1.0),
            UpdateSignal::Settle
        );
    }

    #[test]
    fn test_smoke_keeps_feature_busy() {
        let mut feature = rock(Vec3::ZERO);
        feature.smoke_time = 2;
        let ground = FlatTerrain::new(0.0);

        assert_eq!(feature.update(&ground, -1.0), UpdateSignal::Keep);
        assert_eq!(feature.update(&ground, -1.0), UpdateSignal::Settle);
        assert_eq!(feature.smoke_time(), 0);
    }

    #[test]
    fn test_raised_ground_lifts_feature() {
        let mut feature = rock(Vec3::ZERO);
        assert_eq!(
            feature.update(&FlatTerrain::new(4.0), -1.0),
            UpdateSignal::Settle
        );
        assert_eq!(feature.pos.y, 4.0);
    }

    #[test]
    fn test_dead_feature_signals_destroy() {
        let mut feature = rock(Vec3::ZERO);
        assert!(!feature.apply_damage(50.0));
        assert!(feature.apply_damage(60.0));
        assert!(!feature.apply_damage(10.0)); // already dead
        assert_eq!(
            feature.update(&FlatTerrain::new(0.0), -1.0),
            UpdateSignal::Destroy
        );
    }

    #[test]
    fn test_reclaim() {
        let mut feature = rock(Vec3::ZERO);
        assert!(!feature.reclaim(0.5));
        assert!(feature.reclaim(0.75));
        assert_eq!(feature.reclaim_left(), 0.0);
        assert!(feature.is_dead());
    }
}
