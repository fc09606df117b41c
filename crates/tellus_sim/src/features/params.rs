//! # Creation Requests

use tellus_shared::Vec3;

use super::def::{FeatureDefId, UnitDefId};
use super::feature::FeatureId;

/// Everything needed to create one feature.
///
/// A plain value: consumed by a single
/// [`create`](crate::FeatureHandler::create) call and never stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureLoadParams {
    /// Type of the feature.
    pub def: FeatureDefId,
    /// Unit the feature is the wreck of, if any.
    pub unit_def: Option<UnitDefId>,
    /// World position.
    pub pos: Vec3,
    /// Initial velocity, world units per frame.
    pub speed: Vec3,
    /// `Some(id)` to request a specific ID, `None` for any free one.
    pub requested_id: Option<FeatureId>,
    /// Owning team (`-1` for none).
    pub team: i32,
    /// Owning alliance (`-1` for none).
    pub ally_team: i32,
    /// Heading in [`HEADING_UNITS`](tellus_shared::HEADING_UNITS) per circle.
    pub heading: i16,
    /// Build facing (0-3).
    pub facing: i16,
    /// Frames the feature keeps smoking.
    pub smoke_time: i32,
}

impl FeatureLoadParams {
    /// Creates a request for an ownerless, motionless feature at `pos`.
    #[must_use]
    pub const fn new(def: FeatureDefId, pos: Vec3) -> Self {
        Self {
            def,
            unit_def: None,
            pos,
            speed: Vec3::ZERO,
            requested_id: None,
            team: -1,
            ally_team: -1,
            heading: 0,
            facing: 0,
            smoke_time: 0,
        }
    }

    /// Requests a specific ID.
    #[must_use]
    pub const fn with_id(mut self, id: FeatureId) -> Self {
        self.requested_id = Some(id);
        self
    }

    /// Sets the owning team and alliance.
    #[must_use]
    pub const fn with_team(mut self, team: i32, ally_team: i32) -> Self {
        self.team = team;
        self.ally_team = ally_team;
        self
    }

    /// Sets the initial velocity.
    #[must_use]
    pub const fn with_speed(mut self, speed: Vec3) -> Self {
        self.speed = speed;
        self
    }

    /// Sets the originating unit.
    #[must_use]
    pub const fn with_unit_def(mut self, unit_def: UnitDefId) -> Self {
        self.unit_def = Some(unit_def);
        self
    }

    /// Sets how many frames the feature smokes.
    #[must_use]
    pub const fn with_smoke(mut self, smoke_time: i32) -> Self {
        self.smoke_time = smoke_time;
        self
    }
}
