//! # ID Pool
//!
//! Hands out small non-negative integer IDs and recycles released ones only
//! after their deferral window has elapsed.
//!
//! ## Deferral
//!
//! Every release is tagged with the tick it happened on. An ID released on
//! tick `N` becomes eligible again at tick `N + deferral_ticks`. With the
//! default window of one tick, an ID is never reassigned within the tick it
//! was released on, so systems that cache IDs for a tick never see the ID
//! change identity under them.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// State of one ID below the high-water mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IdState {
    /// Unassigned and eligible for reuse.
    Free,
    /// Bound to an object.
    Live,
    /// Released on the given tick, not yet eligible.
    Deferred(u64),
}

/// A released ID together with the tick it was released on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredId {
    /// The released ID.
    pub id: u32,
    /// Tick of the release.
    pub since: u64,
}

/// Serializable form of an [`IdPool`].
///
/// Free IDs are implied: every ID below `id_space_len` that is neither live
/// nor deferred.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdPoolState {
    /// Hard ID ceiling.
    pub max_ids: u32,
    /// Deferral window in ticks.
    pub deferral_ticks: u64,
    /// Current tick.
    pub tick: u64,
    /// High-water mark: one past the largest ID ever handed out.
    pub id_space_len: u32,
    /// Live IDs in ascending order.
    pub live: Vec<u32>,
    /// Deferred IDs in release order.
    pub deferred: Vec<DeferredId>,
}

/// Deterministic ID allocator with tick-deferred recycling.
///
/// Reuse always picks the lowest eligible ID, which keeps dense ID-indexed
/// arrays small and makes the assignment order identical on every peer.
///
/// # Example
///
/// ```rust
/// use tellus_core::IdPool;
///
/// let mut ids = IdPool::new(100, 1);
/// ids.begin_tick(0);
///
/// let a = ids.acquire()?;
/// ids.release(a)?;
///
/// // Same tick: `a` is still deferred, a fresh ID is handed out.
/// assert_ne!(ids.acquire()?, a);
///
/// // Next tick: `a` is the lowest eligible ID again.
/// ids.begin_tick(1);
/// assert_eq!(ids.acquire()?, a);
/// # Ok::<(), tellus_core::CoreError>(())
/// ```
#[derive(Clone, Debug)]
pub struct IdPool {
    /// Per-ID state, indexed by ID; length is the high-water mark.
    states: Vec<IdState>,
    /// Released IDs waiting out their window, oldest first.
    deferred: VecDeque<DeferredId>,
    /// IDs free for reuse.
    eligible: BTreeSet<u32>,
    /// Number of live IDs.
    live_count: usize,
    /// Hard ceiling; IDs are always below it.
    max_ids: u32,
    /// Ticks a released ID waits before becoming eligible.
    deferral_ticks: u64,
    /// Current tick.
    tick: u64,
}

impl IdPool {
    /// Creates an empty pool.
    ///
    /// # Arguments
    ///
    /// * `max_ids` - Hard ceiling on IDs
    /// * `deferral_ticks` - Ticks a released ID is held back (at least 1)
    ///
    /// # Panics
    ///
    /// Panics if `max_ids` or `deferral_ticks` is zero.
    #[must_use]
    pub fn new(max_ids: u32, deferral_ticks: u64) -> Self {
        assert!(max_ids > 0, "ID ceiling must be greater than zero");
        assert!(deferral_ticks > 0, "Deferral window must be at least one tick");

        Self {
            states: Vec::new(),
            deferred: VecDeque::new(),
            eligible: BTreeSet::new(),
            live_count: 0,
            max_ids,
            deferral_ticks,
            tick: 0,
        }
    }

    /// Returns the hard ID ceiling.
    #[inline]
    #[must_use]
    pub const fn max_ids(&self) -> u32 {
        self.max_ids
    }

    /// Returns the deferral window in ticks.
    #[inline]
    #[must_use]
    pub const fn deferral_ticks(&self) -> u64 {
        self.deferral_ticks
    }

    /// Returns the current tick.
    #[inline]
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Returns the number of live IDs.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live_count
    }

    /// Returns the number of IDs inside their deferral window.
    #[inline]
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Returns one past the largest ID ever handed out.
    #[inline]
    #[must_use]
    pub fn id_space_len(&self) -> usize {
        self.states.len()
    }

    /// True if `id` is neither live nor deferred.
    #[inline]
    #[must_use]
    pub fn is_free(&self, id: u32) -> bool {
        matches!(self.state(id), None | Some(IdState::Free))
    }

    /// True if `id` is bound to an object.
    #[inline]
    #[must_use]
    pub fn is_live(&self, id: u32) -> bool {
        self.state(id) == Some(IdState::Live)
    }

    /// True if `id` was released and is still inside its deferral window.
    #[inline]
    #[must_use]
    pub fn is_deferred(&self, id: u32) -> bool {
        matches!(self.state(id), Some(IdState::Deferred(_)))
    }

    /// Advances the tick clock and promotes every ID whose window elapsed.
    ///
    /// The clock never runs backwards; an older tick is ignored.
    pub fn begin_tick(&mut self, tick: u64) {
        self.tick = self.tick.max(tick);

        while let Some(front) = self.deferred.front().copied() {
            if front.since + self.deferral_ticks > self.tick {
                break;
            }
            self.deferred.pop_front();

            let slot = &mut self.states[front.id as usize];
            if *slot == IdState::Deferred(front.since) {
                *slot = IdState::Free;
                self.eligible.insert(front.id);
            }
        }
    }

    /// Hands out an ID: the lowest eligible one, else the next unused one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdSpaceExhausted`] when every ID below the ceiling
    /// is live or deferred.
    pub fn acquire(&mut self) -> CoreResult<u32> {
        if let Some(id) = self.eligible.pop_first() {
            self.states[id as usize] = IdState::Live;
            self.live_count += 1;
            return Ok(id);
        }

        let id = self.next_fresh()?;
        self.states.push(IdState::Live);
        self.live_count += 1;

        Ok(id)
    }

    /// Hands out a specific ID.
    ///
    /// IDs between the high-water mark and `id` that get skipped become
    /// eligible for later reuse.
    ///
    /// # Errors
    ///
    /// - [`CoreError::IdOutOfRange`] if `id` is at or above the ceiling
    /// - [`CoreError::IdInUse`] if `id` is live
    /// - [`CoreError::IdDeferred`] if `id` is inside its deferral window
    pub fn acquire_specific(&mut self, id: u32) -> CoreResult<u32> {
        if id >= self.max_ids {
            return Err(CoreError::IdOutOfRange {
                id,
                max: self.max_ids,
            });
        }

        match self.state(id) {
            Some(IdState::Live) => return Err(CoreError::IdInUse(id)),
            Some(IdState::Deferred(since)) => {
                return Err(CoreError::IdDeferred {
                    id,
                    until: since + self.deferral_ticks,
                });
            }
            Some(IdState::Free) => {
                self.eligible.remove(&id);
                self.states[id as usize] = IdState::Live;
            }
            None => {
                let first_gap = self.high_water();
                self.eligible.extend(first_gap..id);
                self.states.resize(id as usize, IdState::Free);
                self.states.push(IdState::Live);
            }
        }

        self.live_count += 1;
        Ok(id)
    }

    /// Releases a live ID into its deferral window.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdNotLive`] if `id` is not live. Nothing changes
    /// in that case.
    pub fn release(&mut self, id: u32) -> CoreResult<()> {
        if !self.is_live(id) {
            return Err(CoreError::IdNotLive(id));
        }

        self.states[id as usize] = IdState::Deferred(self.tick);
        self.deferred.push_back(DeferredId {
            id,
            since: self.tick,
        });
        self.live_count -= 1;

        Ok(())
    }

    /// Returns an acquired but never published ID straight to the free set.
    ///
    /// Used to roll back a creation that failed after its ID was acquired;
    /// no other system can have seen the ID, so no deferral is needed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdNotLive`] if `id` is not live.
    pub fn cancel(&mut self, id: u32) -> CoreResult<()> {
        if !self.is_live(id) {
            return Err(CoreError::IdNotLive(id));
        }

        self.states[id as usize] = IdState::Free;
        self.eligible.insert(id);
        self.live_count -= 1;

        Ok(())
    }

    /// Captures the pool for persistence.
    #[must_use]
    pub fn to_state(&self) -> IdPoolState {
        let live = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == IdState::Live)
            .map(|(id, _)| id_from_index(id))
            .collect();

        IdPoolState {
            max_ids: self.max_ids,
            deferral_ticks: self.deferral_ticks,
            tick: self.tick,
            id_space_len: self.high_water(),
            live,
            deferred: self.deferred.iter().copied().collect(),
        }
    }

    /// Rebuilds a pool from a persisted state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptState`] if the state violates a pool
    /// invariant (IDs past the high-water mark or the ceiling, an ID both live
    /// and deferred, deferrals out of tick order, a zero window).
    pub fn from_state(state: &IdPoolState) -> CoreResult<Self> {
        if state.max_ids == 0 || state.deferral_ticks == 0 {
            return Err(CoreError::CorruptState(
                "zero ceiling or deferral window".to_string(),
            ));
        }
        if state.id_space_len > state.max_ids {
            return Err(CoreError::CorruptState(format!(
                "id space {} exceeds ceiling {}",
                state.id_space_len, state.max_ids
            )));
        }

        let mut states = vec![IdState::Free; state.id_space_len as usize];

        for &id in &state.live {
            let slot = states.get_mut(id as usize).ok_or_else(|| {
                CoreError::CorruptState(format!("live id {id} past high-water mark"))
            })?;
            if *slot != IdState::Free {
                return Err(CoreError::CorruptState(format!("id {id} listed twice")));
            }
            *slot = IdState::Live;
        }

        let mut last_since = 0;
        for deferred in &state.deferred {
            if deferred.since < last_since || deferred.since > state.tick {
                return Err(CoreError::CorruptState(format!(
                    "deferred id {} out of tick order",
                    deferred.id
                )));
            }
            last_since = deferred.since;

            let slot = states.get_mut(deferred.id as usize).ok_or_else(|| {
                CoreError::CorruptState(format!(
                    "deferred id {} past high-water mark",
                    deferred.id
                ))
            })?;
            if *slot != IdState::Free {
                return Err(CoreError::CorruptState(format!(
                    "id {} listed twice",
                    deferred.id
                )));
            }
            *slot = IdState::Deferred(deferred.since);
        }

        let eligible = states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == IdState::Free)
            .map(|(id, _)| id_from_index(id))
            .collect();

        let mut pool = Self {
            states,
            deferred: state.deferred.iter().copied().collect(),
            eligible,
            live_count: state.live.len(),
            max_ids: state.max_ids,
            deferral_ticks: state.deferral_ticks,
            tick: state.tick,
        };
        // Deferrals that elapsed at the saved tick are promoted right away.
        pool.begin_tick(state.tick);

        Ok(pool)
    }

    fn state(&self, id: u32) -> Option<IdState> {
        self.states.get(id as usize).copied()
    }

    fn high_water(&self) -> u32 {
        id_from_index(self.states.len())
    }

    fn next_fresh(&self) -> CoreResult<u32> {
        let id = self.high_water();
        if id >= self.max_ids {
            return Err(CoreError::IdSpaceExhausted { max: self.max_ids });
        }
        Ok(id)
    }
}

/// The state vector never grows past `max_ids`, which is a `u32`.
#[allow(clippy::cast_possible_truncation)]
const fn id_from_index(index: usize) -> u32 {
    index as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    #[test]
    fn test_acquire_sequential() {
        let mut ids = IdPool::new(10, 1);
        assert_eq!(ids.acquire().unwrap(), 0);
        assert_eq!(ids.acquire().unwrap(), 1);
        assert_eq!(ids.acquire().unwrap(), 2);
        assert_eq!(ids.live_count(), 3);
    }

    #[test]
    fn test_release_defers_within_tick() {
        let mut ids = IdPool::new(10, 1);
        ids.begin_tick(5);

        let a = ids.acquire().unwrap();
        ids.release(a).unwrap();
        assert!(ids.is_deferred(a));
        assert!(!ids.is_free(a));

        // Every acquire in the same tick avoids `a`
        for _ in 0..5 {
            assert_ne!(ids.acquire().unwrap(), a);
        }

        ids.begin_tick(6);
        assert!(ids.is_free(a));
        assert_eq!(ids.acquire().unwrap(), a);
    }

    #[test]
    fn test_lowest_eligible_first() {
        let mut ids = IdPool::new(10, 1);
        for _ in 0..5 {
            ids.acquire().unwrap();
        }
        ids.release(3).unwrap();
        ids.release(1).unwrap();
        ids.begin_tick(1);

        assert_eq!(ids.acquire().unwrap(), 1);
        assert_eq!(ids.acquire().unwrap(), 3);
        assert_eq!(ids.acquire().unwrap(), 5);
    }

    #[test]
    fn test_longer_deferral_window() {
        let mut ids = IdPool::new(10, 3);
        let a = ids.acquire().unwrap();
        ids.release(a).unwrap();

        ids.begin_tick(2);
        assert!(ids.is_deferred(a));
        ids.begin_tick(3);
        assert!(ids.is_free(a));
    }

    #[test]
    fn test_acquire_specific() {
        let mut ids = IdPool::new(10, 1);

        assert_eq!(ids.acquire_specific(4).unwrap(), 4);
        assert_eq!(ids.acquire_specific(4), Err(CoreError::IdInUse(4)));
        assert_eq!(ids.id_space_len(), 5);

        // Skipped IDs are handed out lowest first
        assert_eq!(ids.acquire().unwrap(), 0);
        assert_eq!(ids.acquire().unwrap(), 1);

        ids.release(4).unwrap();
        assert_eq!(
            ids.acquire_specific(4),
            Err(CoreError::IdDeferred { id: 4, until: 1 })
        );

        ids.begin_tick(1);
        assert_eq!(ids.acquire_specific(4).unwrap(), 4);
        assert_eq!(ids.acquire().unwrap(), 2);
    }

    #[test]
    fn test_ceiling() {
        let mut ids = IdPool::new(2, 1);
        assert_eq!(
            ids.acquire_specific(2),
            Err(CoreError::IdOutOfRange { id: 2, max: 2 })
        );

        ids.acquire().unwrap();
        ids.acquire().unwrap();
        assert_eq!(ids.acquire(), Err(CoreError::IdSpaceExhausted { max: 2 }));

        // A deferred ID does not count as free space
        ids.release(0).unwrap();
        assert_eq!(ids.acquire(), Err(CoreError::IdSpaceExhausted { max: 2 }));
    }

    #[test]
    fn test_double_release_detected() {
        let mut ids = IdPool::new(10, 1);
        let a = ids.acquire().unwrap();
        ids.release(a).unwrap();

        assert_eq!(ids.release(a), Err(CoreError::IdNotLive(a)));
        assert_eq!(ids.release(9), Err(CoreError::IdNotLive(9)));
        assert_eq!(ids.deferred_count(), 1);
    }

    #[test]
    fn test_cancel_skips_deferral() {
        let mut ids = IdPool::new(10, 1);
        let a = ids.acquire().unwrap();
        ids.cancel(a).unwrap();

        assert!(ids.is_free(a));
        assert_eq!(ids.acquire().unwrap(), a);
    }

    #[test]
    fn test_state_roundtrip() {
        let mut ids = IdPool::new(50, 2);
        for _ in 0..6 {
            ids.acquire().unwrap();
        }
        ids.begin_tick(3);
        ids.release(2).unwrap();
        ids.release(4).unwrap();
        ids.begin_tick(4);
        ids.release(0).unwrap();

        let state = ids.to_state();
        let mut restored = IdPool::from_state(&state).unwrap();
        assert_eq!(restored.to_state(), state);

        restored.begin_tick(5);
        ids.begin_tick(5);
        assert_eq!(restored.acquire().unwrap(), ids.acquire().unwrap());
        assert_eq!(restored.acquire().unwrap(), ids.acquire().unwrap());
    }

    #[test]
    fn test_corrupt_state_rejected() {
        let state = IdPoolState {
            max_ids: 10,
            deferral_ticks: 1,
            tick: 0,
            id_space_len: 3,
            live: vec![1],
            deferred: vec![DeferredId { id: 1, since: 0 }],
        };
        assert!(matches!(
            IdPool::from_state(&state),
            Err(CoreError::CorruptState(_))
        ));
    }

    #[test]
    fn test_random_churn_respects_window() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ids = IdPool::new(32, 2);
        let mut live: Vec<u32> = Vec::new();
        let mut released_on: HashMap<u32, u64> = HashMap::new();

        for tick in 0..200 {
            ids.begin_tick(tick);
            for _ in 0..10 {
                if live.is_empty() || rng.gen_bool(0.5) {
                    let Ok(id) = ids.acquire() else {
                        continue;
                    };
                    assert!(!live.contains(&id));
                    if let Some(&since) = released_on.get(&id) {
                        assert!(since + 2 <= tick, "id {id} reused early");
                    }
                    live.push(id);
                } else {
                    let id = live.swap_remove(rng.gen_range(0..live.len()));
                    ids.release(id).unwrap();
                    released_on.insert(id, tick);
                }
            }
            assert_eq!(ids.live_count(), live.len());
        }
    }
}
