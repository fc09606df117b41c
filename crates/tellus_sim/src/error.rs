//! # Feature Error Types
//!
//! All errors that can occur while creating, looking up or destroying
//! features.

use tellus_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the feature handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    /// An explicitly requested ID is bound to another feature.
    #[error("feature id {0} already in use")]
    IdInUse(u32),

    /// An explicitly requested ID was released too recently.
    #[error("feature id {id} recycled too recently, free again at tick {until}")]
    IdDeferred {
        /// The requested ID.
        id: u32,
        /// First tick on which the ID may be requested.
        until: u64,
    },

    /// A structurally invalid ID: negative or at/above the ceiling.
    #[error("invalid feature id {0}")]
    InvalidId(i64),

    /// The ID is valid but no feature is bound to it.
    #[error("feature {0} is not active")]
    NotActive(u32),

    /// Feature def not found in the registry.
    #[error("unknown feature def: {0}")]
    UnknownDef(String),

    /// The slot pool or the ID space is full. The simulation cannot go on.
    #[error("feature capacity exhausted: {0}")]
    CapacityExhausted(CoreError),

    /// Invalid configuration or def file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A snapshot that cannot be restored.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Reading a file failed.
    #[error("io error: {0}")]
    Io(String),
}

impl From<CoreError> for FeatureError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::IdInUse(id) => Self::IdInUse(id),
            CoreError::IdDeferred { id, until } => Self::IdDeferred { id, until },
            CoreError::IdOutOfRange { id, .. } => Self::InvalidId(i64::from(id)),
            CoreError::IdNotLive(id) => Self::NotActive(id),
            CoreError::CorruptState(reason) => Self::CorruptSnapshot(reason),
            CoreError::PoolExhausted { .. } | CoreError::IdSpaceExhausted { .. } => {
                Self::CapacityExhausted(err)
            }
        }
    }
}

impl From<std::io::Error> for FeatureError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for feature operations.
pub type FeatureResult<T> = Result<T, FeatureError>;
