//! # Feature View
//!
//! Read-only copy of the feature set for threads outside the simulation.
//!
//! ## Architecture
//!
//! ```text
//!   Simulation thread                 Render / UI threads
//!   ┌──────────────┐   publish()     ┌──────────────────────┐
//!   │FeatureHandler│────────────────►│ RwLock<Arc<ViewFrame>>│
//!   └──────────────┘  between ticks  └──────────┬───────────┘
//!                                               │ latest()
//!                                               ▼
//!                                       Arc<ViewFrame> (immutable)
//! ```
//!
//! The lock is only held to swap or clone the `Arc`, so readers never wait
//! on a tick and the simulation never waits on a reader.

use std::sync::Arc;

use parking_lot::RwLock;
use tellus_shared::Vec3;

use crate::features::{FeatureDefId, FeatureHandler, FeatureId};

/// One feature as seen by readers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewEntry {
    /// Feature ID.
    pub id: FeatureId,
    /// Feature type.
    pub def: FeatureDefId,
    /// World position at publish time.
    pub pos: Vec3,
    /// Owning team.
    pub team: i32,
}

/// Immutable copy of the feature set at the end of a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewFrame {
    /// Frame the copy was published after.
    pub frame: u64,
    /// Active features in ascending ID order.
    pub features: Vec<ViewEntry>,
}

/// Latest published [`ViewFrame`], shareable across threads.
///
/// ## Usage
///
/// ```rust,ignore
/// let view = FeatureView::new();
/// let reader = Arc::clone(&view);
///
/// // Simulation thread, after each step
/// driver.step(&mut handler, &terrain)?;
/// view.publish(&handler);
///
/// // Any other thread
/// for entry in &reader.latest().features {
///     // draw...
/// }
/// ```
#[derive(Debug, Default)]
pub struct FeatureView {
    current: RwLock<Arc<ViewFrame>>,
}

impl FeatureView {
    /// Creates a view holding an empty frame.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replaces the published frame with the handler's current state.
    ///
    /// Call between ticks.
    pub fn publish(&self, handler: &FeatureHandler) {
        let frame = ViewFrame {
            frame: handler.frame(),
            features: handler
                .iter()
                .map(|f| ViewEntry {
                    id: f.id(),
                    def: f.def(),
                    pos: f.pos,
                    team: f.team(),
                })
                .collect(),
        };

        *self.current.write() = Arc::new(frame);
    }

    /// Returns the most recently published frame.
    #[must_use]
    pub fn latest(&self) -> Arc<ViewFrame> {
        Arc::clone(&*self.current.read())
    }
}
