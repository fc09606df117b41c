//! # Terrain Collaborators
//!
//! The feature handler does not own the map. It asks a [`Terrain`] for
//! ground heights while features settle, and it can ask a [`SpatialIndex`]
//! which features sit inside a region when the terrain changes.

use serde::{Deserialize, Serialize};
use tellus_shared::Vec3;

use crate::features::FeatureId;

/// Ground height queries.
pub trait Terrain {
    /// Returns the ground height at world position (`x`, `z`).
    fn ground_height(&self, x: f32, z: f32) -> f32;
}

impl<F> Terrain for F
where
    F: Fn(f32, f32) -> f32,
{
    fn ground_height(&self, x: f32, z: f32) -> f32 {
        self(x, z)
    }
}

/// Terrain with the same height everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatTerrain {
    /// Ground height.
    pub height: f32,
}

impl FlatTerrain {
    /// Creates a flat terrain at `height`.
    #[must_use]
    pub const fn new(height: f32) -> Self {
        Self { height }
    }
}

impl Terrain for FlatTerrain {
    fn ground_height(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }
}

/// Region-to-features lookup owned by the map layer.
pub trait SpatialIndex {
    /// Returns every feature whose footprint may overlap `region`.
    ///
    /// False positives are fine; the handler re-checks the footprint.
    fn features_in_region(&self, region: &TerrainRegion) -> Vec<FeatureId>;
}

/// Inclusive rectangle of changed terrain in world units, on the `x`/`z` plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainRegion {
    /// Min X
    pub x1: i32,
    /// Min Z
    pub z1: i32,
    /// Max X
    pub x2: i32,
    /// Max Z
    pub z2: i32,
}

impl TerrainRegion {
    /// Creates a region from two corners in any order.
    #[must_use]
    pub fn new(x1: i32, z1: i32, x2: i32, z2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            z1: z1.min(z2),
            x2: x1.max(x2),
            z2: z1.max(z2),
        }
    }

    /// True if a footprint centered on `center` with the given half extents
    /// touches this region.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn intersects(&self, center: Vec3, half_x: f32, half_z: f32) -> bool {
        center.x + half_x >= self.x1 as f32
            && center.x - half_x <= self.x2 as f32
            && center.z + half_z >= self.z1 as f32
            && center.z - half_z <= self.z2 as f32
    }
}
