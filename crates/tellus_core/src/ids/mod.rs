//! # ID Management
//!
//! Small integer identifiers for synced simulation objects.
//!
//! An ID is always in exactly one of three states:
//! - free (never handed out, or eligible for reuse)
//! - live (bound to an object)
//! - deferred (released, waiting out its deferral window)

mod pool;

pub use pool::{DeferredId, IdPool, IdPoolState};
