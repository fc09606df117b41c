//! # Tick Driver
//!
//! Runs one simulation frame over the feature worklist.
//!
//! ## Design
//!
//! Each step:
//! 1. Copies the worklist (ascending feature ID) into a reused buffer
//! 2. Updates every copied feature that is still queued, exactly once
//! 3. Settles or destroys features according to their [`UpdateSignal`]
//!    and runs the caller's hook, if any
//! 4. Advances the frame, which opens the next deferral window
//!
//! Features that join the worklist while a step runs were not in the copy,
//! so they are first updated on the next step. The order is the same on every
//! peer because it only depends on feature IDs.

use std::time::Instant;

use tracing::info;

use crate::error::FeatureResult;
use crate::features::{FeatureHandler, FeatureId, UpdateSignal};
use crate::terrain::Terrain;

/// Outcome of one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frame that was simulated.
    pub frame: u64,
    /// Features updated.
    pub visited: u32,
    /// Features that stayed on the worklist.
    pub kept: u32,
    /// Features that left the worklist.
    pub settled: u32,
    /// Features destroyed.
    pub destroyed: u32,
}

/// Step timing and totals.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickStats {
    /// Minimum step duration observed.
    pub min_tick_us: u64,
    /// Maximum step duration observed.
    pub max_tick_us: u64,
    /// Average step duration (rolling).
    pub avg_tick_us: u64,
    /// Total steps run.
    pub total_ticks: u64,
    /// Total features destroyed by the driver.
    pub total_destroyed: u64,
}

/// Drives the per-frame feature update.
///
/// # Example
///
/// ```rust,ignore
/// let mut driver = TickDriver::new();
/// loop {
///     let report = driver.step(&mut handler, &terrain)?;
///     // ...
/// }
/// ```
#[derive(Debug, Default)]
pub struct TickDriver {
    /// Worklist copy, reused between steps.
    scratch: Vec<FeatureId>,
    /// Timing statistics.
    stats: TickStats,
}

impl TickDriver {
    /// Creates a driver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scratch: Vec::new(),
            stats: TickStats {
                min_tick_us: u64::MAX,
                ..TickStats::default()
            },
        }
    }

    /// Returns the accumulated statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Simulates one frame.
    ///
    /// # Errors
    ///
    /// Propagates a failed destroy, which means the handler's pools are out
    /// of sync with its registry.
    pub fn step(
        &mut self,
        handler: &mut FeatureHandler,
        terrain: &dyn Terrain,
    ) -> FeatureResult<TickReport> {
        self.step_with(handler, terrain, |_, _, _| Ok(()))
    }

    /// Simulates one frame, calling `on_update` after each visited feature's
    /// signal has been applied.
    ///
    /// The hook may create, wake or destroy features. Anything it adds to the
    /// worklist is first updated on the next step.
    ///
    /// # Errors
    ///
    /// As [`step`](Self::step), plus any error returned by `on_update`.
    pub fn step_with<F>(
        &mut self,
        handler: &mut FeatureHandler,
        terrain: &dyn Terrain,
        mut on_update: F,
    ) -> FeatureResult<TickReport>
    where
        F: FnMut(&mut FeatureHandler, FeatureId, UpdateSignal) -> FeatureResult<()>,
    {
        let start = Instant::now();
        let gravity = handler.config().gravity;
        let mut report = TickReport {
            frame: handler.frame(),
            ..TickReport::default()
        };

        handler.copy_worklist(&mut self.scratch);

        for &id in &self.scratch {
            // Settled or destroyed earlier in this step.
            if !handler.is_queued(id) {
                continue;
            }
            let Some(feature) = handler.feature_mut(id) else {
                continue;
            };

            report.visited += 1;
            let signal = feature.update(terrain, gravity);
            match signal {
                UpdateSignal::Keep => report.kept += 1,
                UpdateSignal::Settle => {
                    handler.set_settled(id)?;
                    report.settled += 1;
                }
                UpdateSignal::Destroy => {
                    handler.destroy(id)?;
                    report.destroyed += 1;
                }
            }
            on_update(handler, id, signal)?;
        }

        handler.advance_frame();
        self.end_tick(start, &report);

        if handler.config().enable_tick_logs {
            info!(
                frame = report.frame,
                visited = report.visited,
                settled = report.settled,
                destroyed = report.destroyed,
                active = handler.len(),
                "feature tick"
            );
        }

        Ok(report)
    }

    /// Runs `count` steps back to back.
    ///
    /// # Errors
    ///
    /// As [`step`](Self::step); stops at the first failure.
    pub fn run(
        &mut self,
        handler: &mut FeatureHandler,
        terrain: &dyn Terrain,
        count: u32,
    ) -> FeatureResult<TickReport> {
        let mut total = TickReport {
            frame: handler.frame(),
            ..TickReport::default()
        };
        for _ in 0..count {
            let report = self.step(handler, terrain)?;
            total.visited += report.visited;
            total.kept += report.kept;
            total.settled += report.settled;
            total.destroyed += report.destroyed;
        }
        Ok(total)
    }

    fn end_tick(&mut self, start: Instant, report: &TickReport) {
        let duration_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        self.stats.total_ticks += 1;
        self.stats.total_destroyed += u64::from(report.destroyed);
        self.stats.min_tick_us = self.stats.min_tick_us.min(duration_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(duration_us);

        // Rolling average
        self.stats.avg_tick_us = if self.stats.total_ticks == 1 {
            duration_us
        } else {
            (self.stats.avg_tick_us * 15 + duration_us) / 16
        };
    }
}
