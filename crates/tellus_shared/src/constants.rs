//! # Simulation Constants
//!
//! **CRITICAL:** These values feed the synced simulation. Every peer must be
//! built with the same numbers or the game desyncs.

// =============================================================================
// SIMULATION CLOCK
// =============================================================================

/// Simulation frames per second of game time.
pub const GAME_SPEED: u32 = 30;

// =============================================================================
// WORLD GEOMETRY
// =============================================================================

/// Size of one map square in world units. Footprints are measured in squares.
pub const SQUARE_SIZE: f32 = 8.0;

/// Heading units in a full circle (headings are stored as `i16`).
pub const HEADING_UNITS: i32 = 65_536;

/// Default gravity, in world units per frame squared (negative is down).
pub const DEFAULT_GRAVITY: f32 = -130.0 / (GAME_SPEED * GAME_SPEED) as f32;

// =============================================================================
// OBJECT LIMITS
// =============================================================================

/// Hard ceiling on feature IDs. IDs at or above this are structurally invalid.
pub const MAX_FEATURES: usize = 32_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravity_points_down() {
        assert!(DEFAULT_GRAVITY < 0.0);
        assert!((DEFAULT_GRAVITY * 900.0 + 130.0).abs() < 1e-3);
    }

    #[test]
    fn test_feature_ceiling_fits_i32() {
        assert!(i32::try_from(MAX_FEATURES).is_ok());
    }
}
