//! # Simulation Configuration
//!
//! Limits and tuning for the feature handler, loaded once at startup from a
//! TOML file. Every peer must run with the same values.
//!
//! ```toml
//! max_features = 32000
//! max_pages = 4096
//! id_deferral_ticks = 1
//! gravity = -0.144
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tellus_shared::{DEFAULT_GRAVITY, MAX_FEATURES};

use crate::error::{FeatureError, FeatureResult};

/// Configuration for a [`FeatureHandler`](crate::FeatureHandler).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Hard ceiling on feature IDs.
    pub max_features: u32,
    /// Optional ceiling on slot pages. `None` grows until memory runs out.
    pub max_pages: Option<usize>,
    /// Ticks a destroyed feature's ID is held back before reuse.
    pub id_deferral_ticks: u64,
    /// Pages to reserve room for up front.
    pub initial_reserve: usize,
    /// Gravity applied to falling features, world units per frame squared.
    pub gravity: f32,
    /// Record [`FeatureEvent`](crate::FeatureEvent)s for `drain_events`.
    ///
    /// Events are kept until drained; a caller that turns this on must drain
    /// every tick or the buffer grows for the rest of the game.
    pub record_events: bool,
    /// Log a summary line after every tick.
    pub enable_tick_logs: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        // MAX_FEATURES is checked to fit in an i32, so it fits in a u32.
        #[allow(clippy::cast_possible_truncation)]
        let max_features = MAX_FEATURES as u32;

        Self {
            max_features,
            max_pages: None,
            id_deferral_ticks: 1,
            initial_reserve: 0,
            gravity: DEFAULT_GRAVITY,
            record_events: false,
            enable_tick_logs: false,
        }
    }
}

impl SimConfig {
    /// Parses a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidConfig`] on malformed TOML or values
    /// that fail [`validate`](Self::validate).
    pub fn from_toml_str(text: &str) -> FeatureResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| FeatureError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> FeatureResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks that the values can drive a handler.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidConfig`] for a zero ID ceiling, a zero
    /// page ceiling, a zero deferral window or a non-finite gravity.
    pub fn validate(&self) -> FeatureResult<()> {
        if self.max_features == 0 {
            return Err(FeatureError::InvalidConfig(
                "max_features must be greater than zero".to_string(),
            ));
        }
        if self.max_pages == Some(0) {
            return Err(FeatureError::InvalidConfig(
                "max_pages must be greater than zero".to_string(),
            ));
        }
        if self.id_deferral_ticks == 0 {
            return Err(FeatureError::InvalidConfig(
                "id_deferral_ticks must be at least one tick".to_string(),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(FeatureError::InvalidConfig(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        Ok(())
    }
}
