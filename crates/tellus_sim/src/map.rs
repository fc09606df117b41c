//! # Map Features
//!
//! Features placed by the map author, created once when a game starts.
//!
//! ```toml
//! [[feature]]
//! name = "rock"
//! x = 128.0
//! z = 64.0
//! rotation = 16384
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tellus_shared::Vec3;
use tracing::{info, warn};

use crate::error::{FeatureError, FeatureResult};
use crate::features::{FeatureHandler, FeatureLoadParams};
use crate::terrain::Terrain;

/// One feature placement from a map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapFeature {
    /// Def name, case-insensitive.
    pub name: String,
    /// World X.
    pub x: f32,
    /// World Z.
    pub z: f32,
    /// Heading in [`HEADING_UNITS`](tellus_shared::HEADING_UNITS) per circle.
    #[serde(default)]
    pub rotation: i16,
}

/// Anything that can list a map's feature placements.
pub trait MapFeatureSource {
    /// Returns the placements in map order.
    ///
    /// # Errors
    ///
    /// Returns whatever the source fails with while reading.
    fn map_features(&self) -> FeatureResult<Vec<MapFeature>>;
}

/// Placements read from a TOML file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapFeatureList {
    /// Placements in file order.
    #[serde(rename = "feature", default)]
    pub features: Vec<MapFeature>,
}

impl MapFeatureList {
    /// Parses a placement list.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidConfig`] on malformed TOML.
    pub fn from_toml_str(text: &str) -> FeatureResult<Self> {
        toml::from_str(text).map_err(|e| FeatureError::InvalidConfig(e.to_string()))
    }

    /// Loads a placement file.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> FeatureResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl MapFeatureSource for MapFeatureList {
    fn map_features(&self) -> FeatureResult<Vec<MapFeature>> {
        Ok(self.features.clone())
    }
}

/// Outcome of a map load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MapLoadReport {
    /// Features created.
    pub created: usize,
    /// Placements skipped because their def is unknown.
    pub skipped: usize,
}

impl FeatureHandler {
    /// Creates every feature a map places, standing on the ground.
    ///
    /// Placements naming an unknown def are skipped with a warning. Map
    /// features belong to no team and take IDs in map order.
    ///
    /// # Errors
    ///
    /// Propagates a failing source, and any creation error other than an
    /// unknown def (capacity exhaustion is fatal to the load).
    pub fn load_features_from_map(
        &mut self,
        source: &dyn MapFeatureSource,
        terrain: &dyn Terrain,
    ) -> FeatureResult<MapLoadReport> {
        let mut report = MapLoadReport::default();

        for placement in source.map_features()? {
            let Some(def) = self.defs().id_of(&placement.name) else {
                warn!(name = %placement.name, "unknown map feature");
                report.skipped += 1;
                continue;
            };

            let ground = terrain.ground_height(placement.x, placement.z);
            let mut params =
                FeatureLoadParams::new(def, Vec3::new(placement.x, ground, placement.z));
            params.heading = placement.rotation;

            self.create(params)?;
            report.created += 1;
        }

        info!(
            created = report.created,
            skipped = report.skipped,
            "map features loaded"
        );
        Ok(report)
    }
}
