//! # TELLUS Core
//!
//! The two allocators underneath every simulation object:
//!
//! - [`SlotPool`] stores objects one per page, recycles pages through a free
//!   stack and hands out generational [`SlotHandle`]s so a stale handle is
//!   caught instead of aliasing a newer object.
//! - [`IdPool`] hands out small integer IDs and holds released IDs back for a
//!   deferral window, so no two objects share an ID inside one tick.
//!
//! ## Architecture Rules
//!
//! 1. **Objects never move** - pages are boxed and only ever appended
//! 2. **Deterministic reuse** - lowest eligible ID first, LIFO page reuse
//! 3. **Contract violations are reported, never undefined** - stale handles and
//!    double releases return errors instead of corrupting state
//!
//! ## Example
//!
//! ```rust
//! use tellus_core::{IdPool, SlotPool};
//!
//! let mut ids = IdPool::new(1024, 1);
//! let mut slots: SlotPool<&str> = SlotPool::new();
//!
//! let id = ids.acquire()?;
//! let handle = slots.allocate("rock")?;
//!
//! slots.release(handle);
//! ids.release(id)?;
//! assert!(ids.is_deferred(id));
//! # Ok::<(), tellus_core::CoreError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod ids;
pub mod memory;

pub use error::{CoreError, CoreResult};
pub use ids::{DeferredId, IdPool, IdPoolState};
pub use memory::{SlotHandle, SlotPool};
