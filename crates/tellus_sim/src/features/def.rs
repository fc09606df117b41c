//! # Feature Definitions
//!
//! Static per-type data for features, loaded from TOML at startup:
//!
//! ```toml
//! [[feature]]
//! name = "tank_dead"
//! footprint_x = 3
//! footprint_z = 3
//! health = 900.0
//! death_feature = "tank_heap"
//! resurrectable = 1
//!
//! [[feature]]
//! name = "tank_heap"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tellus_shared::SQUARE_SIZE;
use tracing::warn;

use crate::error::{FeatureError, FeatureResult};

/// Dense index of a def inside a [`FeatureDefRegistry`], in file order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureDefId(pub u32);

/// Opaque reference to the unit type a wreck came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitDefId(pub u32);

/// Static data shared by all features of one type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureDef {
    /// Unique name, compared case-insensitively.
    pub name: String,
    /// Footprint width in map squares.
    #[serde(default = "default_footprint")]
    pub footprint_x: u16,
    /// Footprint depth in map squares.
    #[serde(default = "default_footprint")]
    pub footprint_z: u16,
    /// Model height in world units.
    #[serde(default)]
    pub height: f32,
    /// Starting health.
    #[serde(default = "default_health")]
    pub health: f32,
    /// Whether builders can reclaim it.
    #[serde(default = "default_true")]
    pub reclaimable: bool,
    /// Whether it blocks movement.
    #[serde(default = "default_true")]
    pub blocking: bool,
    /// Whether it stays upright on slopes.
    #[serde(default)]
    pub upright: bool,
    /// Def that replaces this one when it is destroyed.
    #[serde(default)]
    pub death_feature: Option<String>,
    /// `1` always keeps the originating unit, `0` never does, `-1` keeps it
    /// only when the wreck is created without walking the death chain.
    #[serde(default = "default_resurrectable")]
    pub resurrectable: i8,
}

const fn default_footprint() -> u16 {
    1
}

const fn default_health() -> f32 {
    100.0
}

const fn default_true() -> bool {
    true
}

const fn default_resurrectable() -> i8 {
    -1
}

impl FeatureDef {
    /// Creates a def with default values.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            footprint_x: default_footprint(),
            footprint_z: default_footprint(),
            height: 0.0,
            health: default_health(),
            reclaimable: true,
            blocking: true,
            upright: false,
            death_feature: None,
            resurrectable: default_resurrectable(),
        }
    }

    /// Half extents of the footprint in world units (x, z).
    #[must_use]
    pub fn half_extents(&self) -> (f32, f32) {
        (
            f32::from(self.footprint_x) * SQUARE_SIZE * 0.5,
            f32::from(self.footprint_z) * SQUARE_SIZE * 0.5,
        )
    }
}

/// On-disk layout of a def file.
#[derive(Deserialize)]
struct DefFile {
    #[serde(rename = "feature", default)]
    features: Vec<FeatureDef>,
}

/// All feature defs of a game, indexed by [`FeatureDefId`] and by name.
#[derive(Clone, Debug, Default)]
pub struct FeatureDefRegistry {
    /// Defs in insertion order.
    defs: Vec<FeatureDef>,
    /// Lower-cased name to id.
    by_name: HashMap<String, FeatureDefId>,
}

impl FeatureDefRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a def file.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidConfig`] on malformed TOML or a duplicate
    /// name.
    pub fn from_toml_str(text: &str) -> FeatureResult<Self> {
        let file: DefFile =
            toml::from_str(text).map_err(|e| FeatureError::InvalidConfig(e.to_string()))?;

        let mut registry = Self::new();
        for def in file.features {
            registry.insert(def)?;
        }
        registry.warn_broken_chains();

        Ok(registry)
    }

    /// Loads a def file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> FeatureResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Adds a def and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidConfig`] if a def with the same name
    /// (case-insensitive) exists.
    pub fn insert(&mut self, def: FeatureDef) -> FeatureResult<FeatureDefId> {
        let key = def.name.to_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(FeatureError::InvalidConfig(format!(
                "duplicate feature def: {}",
                def.name
            )));
        }

        let id = FeatureDefId(u32::try_from(self.defs.len()).map_err(|_| {
            FeatureError::InvalidConfig("too many feature defs".to_string())
        })?);
        self.by_name.insert(key, id);
        self.defs.push(def);

        Ok(id)
    }

    /// Returns the number of defs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// True if no defs are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Looks up a def by id.
    #[must_use]
    pub fn get(&self, id: FeatureDefId) -> Option<&FeatureDef> {
        self.defs.get(id.0 as usize)
    }

    /// Looks up a def id by name (case-insensitive).
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<FeatureDefId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Returns the def that replaces `id` on destruction, if it exists.
    #[must_use]
    pub fn death_feature_of(&self, id: FeatureDefId) -> Option<FeatureDefId> {
        let name = self.get(id)?.death_feature.as_deref()?;
        self.id_of(name)
    }

    fn warn_broken_chains(&self) {
        for def in &self.defs {
            if let Some(next) = def.death_feature.as_deref() {
                if self.id_of(next).is_none() {
                    warn!(def = %def.name, death_feature = next, "death feature not defined");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFS: &str = r#"
        [[feature]]
        name = "Tank_Dead"
        footprint_x = 3
        footprint_z = 2
        death_feature = "tank_heap"

        [[feature]]
        name = "tank_heap"
        resurrectable = 0
    "#;

    #[test]
    fn test_parse_defs() {
        let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();
        assert_eq!(defs.len(), 2);

        let dead = defs.id_of("tank_dead").unwrap();
        assert_eq!(dead, FeatureDefId(0));

        let def = defs.get(dead).unwrap();
        assert_eq!(def.footprint_x, 3);
        assert_eq!(def.half_extents(), (12.0, 8.0));
        assert!(def.reclaimable);
        assert_eq!(def.resurrectable, -1);
    }

    #[test]
    fn test_death_chain() {
        let defs = FeatureDefRegistry::from_toml_str(DEFS).unwrap();
        let dead = defs.id_of("TANK_DEAD").unwrap();
        let heap = defs.death_feature_of(dead).unwrap();

        assert_eq!(defs.get(heap).unwrap().name, "tank_heap");
        assert_eq!(defs.death_feature_of(heap), None);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut defs = FeatureDefRegistry::new();
        defs.insert(FeatureDef::new("rock")).unwrap();
        assert!(matches!(
            defs.insert(FeatureDef::new("ROCK")),
            Err(FeatureError::InvalidConfig(_))
        ));
    }
}
