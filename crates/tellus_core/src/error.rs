//! # Core Error Types
//!
//! Everything the pools can refuse to do.

use thiserror::Error;

/// Errors raised by [`SlotPool`](crate::SlotPool) and [`IdPool`](crate::IdPool).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The slot pool reached its page ceiling. Not recoverable.
    #[error("slot pool exhausted: all {pages} pages in use")]
    PoolExhausted {
        /// Number of pages at the ceiling.
        pages: usize,
    },

    /// Every ID below the ceiling is live or deferred. Not recoverable.
    #[error("id space exhausted: ceiling {max}")]
    IdSpaceExhausted {
        /// The hard ID ceiling.
        max: u32,
    },

    /// An explicit ID at or beyond the ceiling.
    #[error("id {id} out of range: ceiling {max}")]
    IdOutOfRange {
        /// The requested ID.
        id: u32,
        /// The hard ID ceiling.
        max: u32,
    },

    /// An explicit ID that is currently live.
    #[error("id {0} already in use")]
    IdInUse(u32),

    /// An explicit ID that was released too recently to be handed out again.
    #[error("id {id} deferred until tick {until}")]
    IdDeferred {
        /// The requested ID.
        id: u32,
        /// First tick on which the ID becomes eligible.
        until: u64,
    },

    /// Release or cancel of an ID that is not live.
    #[error("id {0} is not live")]
    IdNotLive(u32),

    /// A persisted pool state that violates the pool invariants.
    #[error("corrupt id pool state: {0}")]
    CorruptState(String),
}

/// Result type for core pool operations.
pub type CoreResult<T> = Result<T, CoreError>;
