//! # Feature Handler
//!
//! The registry that owns every feature, maps IDs to slots and keeps the
//! active set and the update worklist.
//!
//! ## Structure
//!
//! ```text
//!   FeatureLoadParams
//!          │ create
//!          ▼
//!   ┌──────────────┐  acquire   ┌─────────────┐
//!   │FeatureHandler│───────────►│   IdPool    │  live / deferred / free
//!   │              │  allocate  ├─────────────┤
//!   │ objects_by_id│───────────►│SlotPool<F>  │  one page per feature
//!   │ active_ids   │            └─────────────┘
//!   │ worklist     │◄── TickDriver walks this every tick
//!   └──────────────┘
//! ```
//!
//! `objects_by_id[id]` is `Some(handle)` exactly when `id` is in
//! `active_ids`, and exactly when the ID pool reports `id` as live.

use std::collections::BTreeSet;

use tellus_core::{IdPool, SlotHandle, SlotPool};
use tracing::{debug, error, warn};

use super::def::FeatureDefRegistry;
use super::events::FeatureEvent;
use super::feature::{Feature, FeatureId};
use super::params::FeatureLoadParams;
use crate::config::SimConfig;
use crate::error::{FeatureError, FeatureResult};
use crate::snapshot::{FeatureRecord, IdentitySnapshot};
use crate::terrain::{SpatialIndex, TerrainRegion};

/// Owner of all features in a game.
///
/// There is exactly one handler per simulation; the simulation loop owns it
/// and lends it out for the duration of a tick.
pub struct FeatureHandler {
    /// Limits and tuning.
    config: SimConfig,
    /// Static feature data.
    defs: FeatureDefRegistry,
    /// The ID namespace.
    ids: IdPool,
    /// Feature storage.
    slots: SlotPool<Feature>,
    /// Dense ID → slot map. Grows, never shrinks.
    objects_by_id: Vec<Option<SlotHandle>>,
    /// IDs bound to a feature.
    active_ids: BTreeSet<FeatureId>,
    /// Active IDs that need per-tick processing.
    update_worklist: BTreeSet<FeatureId>,
    /// Recorded lifecycle events.
    events: Vec<FeatureEvent>,
    /// Current simulation frame.
    frame: u64,
}

impl FeatureHandler {
    /// Creates an empty handler.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: SimConfig, defs: FeatureDefRegistry) -> FeatureResult<Self> {
        config.validate()?;

        let mut slots = match config.max_pages {
            Some(max) => SlotPool::with_max_pages(max),
            None => SlotPool::new(),
        };
        slots.reserve(config.initial_reserve);

        Ok(Self {
            ids: IdPool::new(config.max_features, config.id_deferral_ticks),
            slots,
            objects_by_id: Vec::with_capacity(config.initial_reserve),
            active_ids: BTreeSet::new(),
            update_worklist: BTreeSet::new(),
            events: Vec::new(),
            frame: 0,
            defs,
            config,
        })
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Returns the feature defs.
    #[inline]
    #[must_use]
    pub const fn defs(&self) -> &FeatureDefRegistry {
        &self.defs
    }

    /// Returns the ID pool (read-only).
    #[inline]
    #[must_use]
    pub const fn id_pool(&self) -> &IdPool {
        &self.ids
    }

    /// Returns the slot pool (read-only).
    #[inline]
    #[must_use]
    pub const fn slot_pool(&self) -> &SlotPool<Feature> {
        &self.slots
    }

    /// Returns the current simulation frame.
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Returns the IDs bound to a feature, in ascending order.
    #[inline]
    #[must_use]
    pub const fn active_ids(&self) -> &BTreeSet<FeatureId> {
        &self.active_ids
    }

    /// Returns the IDs on the update worklist, in ascending order.
    #[inline]
    #[must_use]
    pub const fn update_worklist(&self) -> &BTreeSet<FeatureId> {
        &self.update_worklist
    }

    /// Returns the length of the dense ID → object array.
    #[inline]
    #[must_use]
    pub fn id_space_len(&self) -> usize {
        self.objects_by_id.len()
    }

    /// Returns the number of active features.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.active_ids.len()
    }

    /// True if no feature is active.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active_ids.is_empty()
    }

    /// True if `id` is bound to a feature.
    #[inline]
    #[must_use]
    pub fn is_active(&self, id: FeatureId) -> bool {
        self.handle_of(id).is_some()
    }

    /// Creates a feature and registers it.
    ///
    /// With `requested_id: None` the lowest eligible ID is used. A requested
    /// ID must be free: not bound to a feature and not inside its deferral
    /// window. Creation is all-or-nothing; on error nothing is registered.
    ///
    /// # Errors
    ///
    /// - [`FeatureError::UnknownDef`] if the def is not registered
    /// - [`FeatureError::IdInUse`] / [`FeatureError::IdDeferred`] for a
    ///   requested ID that is taken; pick another or ask for any
    /// - [`FeatureError::InvalidId`] for a requested ID past the ceiling
    /// - [`FeatureError::CapacityExhausted`] if no ID or slot is left (fatal)
    pub fn create(&mut self, params: FeatureLoadParams) -> FeatureResult<FeatureId> {
        let def = self
            .defs
            .get(params.def)
            .ok_or_else(|| FeatureError::UnknownDef(format!("#{}", params.def.0)))?;

        let acquired = match params.requested_id {
            Some(requested) => {
                if self.handle_of(requested).is_some() {
                    warn!(id = requested.get(), "requested feature id already in use");
                    return Err(FeatureError::IdInUse(requested.get()));
                }
                self.ids.acquire_specific(requested.get())
            }
            None => self.ids.acquire(),
        };
        let id = match acquired {
            Ok(raw) => FeatureId(raw),
            Err(err) => {
                let err = FeatureError::from(err);
                if matches!(err, FeatureError::CapacityExhausted(_)) {
                    error!(%err, "cannot assign feature id");
                } else {
                    warn!(%err, "requested feature id unavailable");
                }
                return Err(err);
            }
        };

        let mut feature = Feature::new(id, params.def, def, &params);
        let needs_update = feature.needs_update();
        feature.in_update_queue = needs_update;

        let handle = match self.slots.allocate(feature) {
            Ok(handle) => handle,
            Err(err) => {
                if let Err(cancel_err) = self.ids.cancel(id.get()) {
                    error!(%cancel_err, id = id.get(), "failed to roll back feature id");
                }
                error!(%err, "cannot allocate feature storage");
                return Err(err.into());
            }
        };

        self.insert_active(id, handle, needs_update);
        self.record(FeatureEvent::Created {
            id,
            def: params.def,
        });
        debug!(id = id.get(), def = params.def.0, frame = self.frame, "feature created");

        Ok(id)
    }

    /// Creates the wreck of a unit, walking `wreck_levels` steps down the
    /// def's death chain first.
    ///
    /// Returns `Ok(None)` if the chain ends before `wreck_levels` steps. The
    /// originating unit is kept only if the final def is resurrectable, and
    /// smoke is dropped unless `emit_smoke` is set.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create).
    pub fn create_wreckage(
        &mut self,
        mut params: FeatureLoadParams,
        wreck_levels: u32,
        emit_smoke: bool,
    ) -> FeatureResult<Option<FeatureId>> {
        if self.defs.get(params.def).is_none() {
            return Err(FeatureError::UnknownDef(format!("#{}", params.def.0)));
        }

        let mut def_id = params.def;
        for _ in 0..wreck_levels {
            match self.defs.death_feature_of(def_id) {
                Some(next) => def_id = next,
                None => return Ok(None),
            }
        }

        let resurrectable = self
            .defs
            .get(def_id)
            .map_or(0, |def| def.resurrectable);
        let keep_unit = match resurrectable {
            0 => false,
            r if r < 0 => wreck_levels == 0,
            _ => true,
        };

        params.def = def_id;
        if !keep_unit {
            params.unit_def = None;
        }
        if !emit_smoke {
            params.smoke_time = 0;
        }

        self.create(params).map(Some)
    }

    /// Looks up a feature by a raw, untrusted ID.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidId`] if `id` is negative or at/above the
    /// ceiling. A valid but unbound ID is `Ok(None)`.
    pub fn get_feature(&self, id: i32) -> FeatureResult<Option<&Feature>> {
        let raw = u32::try_from(id).map_err(|_| FeatureError::InvalidId(i64::from(id)))?;
        if raw >= self.config.max_features {
            return Err(FeatureError::InvalidId(i64::from(id)));
        }
        Ok(self.feature(FeatureId(raw)))
    }

    /// Gets a feature by ID.
    #[inline]
    #[must_use]
    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.slots.get(self.handle_of(id)?)
    }

    /// Gets a mutable feature by ID.
    #[inline]
    pub fn feature_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        let handle = self.handle_of(id)?;
        self.slots.get_mut(handle)
    }

    /// Iterates over all active features in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.active_ids.iter().filter_map(|&id| self.feature(id))
    }

    /// Destroys a feature: takes it off the worklist and the active set,
    /// releases its slot and defers its ID.
    ///
    /// # Returns
    ///
    /// The destroyed feature.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::NotActive`] if no feature is bound to `id`,
    /// including a second destroy of the same feature. Nothing changes.
    pub fn destroy(&mut self, id: FeatureId) -> FeatureResult<Feature> {
        let Some(handle) = self.handle_of(id) else {
            error!(id = id.get(), "destroy of inactive feature");
            return Err(FeatureError::NotActive(id.get()));
        };
        if !self.ids.is_live(id.get()) || !self.slots.contains(handle) {
            error!(id = id.get(), "feature registry out of sync with its pools");
            return Err(FeatureError::NotActive(id.get()));
        }

        self.update_worklist.remove(&id);
        self.active_ids.remove(&id);
        self.objects_by_id[id.index()] = None;

        let mut feature = self
            .slots
            .release(handle)
            .ok_or(FeatureError::NotActive(id.get()))?;
        feature.in_update_queue = false;
        self.ids.release(id.get())?;

        self.record(FeatureEvent::Destroyed { id });
        debug!(id = id.get(), frame = self.frame, "feature destroyed");

        Ok(feature)
    }

    /// Puts a feature on the update worklist.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::NotActive`] if no feature is bound to `id`.
    pub fn set_updateable(&mut self, id: FeatureId) -> FeatureResult<()> {
        let feature = self
            .feature_mut(id)
            .ok_or(FeatureError::NotActive(id.get()))?;
        feature.wake();
        feature.in_update_queue = true;
        self.update_worklist.insert(id);
        Ok(())
    }

    /// Takes a feature off the update worklist. It stays active.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::NotActive`] if no feature is bound to `id`.
    pub fn set_settled(&mut self, id: FeatureId) -> FeatureResult<()> {
        let feature = self
            .feature_mut(id)
            .ok_or(FeatureError::NotActive(id.get()))?;
        let was_queued = feature.in_update_queue;
        feature.in_update_queue = false;
        self.update_worklist.remove(&id);

        if was_queued {
            self.record(FeatureEvent::Settled { id });
            debug!(id = id.get(), frame = self.frame, "feature settled");
        }
        Ok(())
    }

    /// Damages a feature. A killed feature is destroyed on the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::NotActive`] if no feature is bound to `id`.
    pub fn damage(&mut self, id: FeatureId, amount: f32) -> FeatureResult<()> {
        let feature = self
            .feature_mut(id)
            .ok_or(FeatureError::NotActive(id.get()))?;
        if feature.apply_damage(amount) {
            self.set_updateable(id)?;
        }
        Ok(())
    }

    /// Reclaims a fraction of a feature. A used-up feature is destroyed on
    /// the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::NotActive`] if no feature is bound to `id`.
    pub fn reclaim(&mut self, id: FeatureId, fraction: f32) -> FeatureResult<()> {
        let feature = self
            .feature_mut(id)
            .ok_or(FeatureError::NotActive(id.get()))?;
        if feature.reclaim(fraction) {
            self.set_updateable(id)?;
        }
        Ok(())
    }

    /// Re-settles every active feature whose footprint touches `region`.
    ///
    /// Scans the active set in ascending ID order.
    ///
    /// # Returns
    ///
    /// The number of features put back on the worklist.
    pub fn terrain_changed(&mut self, region: TerrainRegion) -> usize {
        let touched: Vec<FeatureId> = self
            .iter()
            .filter(|f| {
                let (hx, hz) = f.half_extents();
                region.intersects(f.pos, hx, hz)
            })
            .map(Feature::id)
            .collect();

        self.wake_all(&touched)
    }

    /// Re-settles the features `index` reports inside `region`.
    ///
    /// Candidates are re-checked against their footprint and processed in
    /// ascending ID order, whatever order the index returns them in.
    ///
    /// # Returns
    ///
    /// The number of features put back on the worklist.
    pub fn terrain_changed_with(&mut self, region: TerrainRegion, index: &dyn SpatialIndex) -> usize {
        let candidates: BTreeSet<FeatureId> =
            index.features_in_region(&region).into_iter().collect();
        let touched: Vec<FeatureId> = candidates
            .into_iter()
            .filter(|&id| {
                self.feature(id).is_some_and(|f| {
                    let (hx, hz) = f.half_extents();
                    region.intersects(f.pos, hx, hz)
                })
            })
            .collect();

        self.wake_all(&touched)
    }

    /// Drains the recorded lifecycle events, oldest first.
    ///
    /// Events accumulate across ticks until drained.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, FeatureEvent> {
        self.events.drain(..)
    }

    /// Captures the identity state: the dense ID array, every live feature,
    /// the worklist and the ID pool.
    #[must_use]
    pub fn snapshot(&self) -> IdentitySnapshot {
        let features = self
            .iter()
            .map(|f| {
                let def_name = self
                    .defs
                    .get(f.def())
                    .map_or_else(String::new, |d| d.name.clone());
                FeatureRecord::from_feature(f, def_name)
            })
            .collect();

        IdentitySnapshot {
            frame: self.frame,
            id_space_len: self.objects_by_id.len(),
            features,
            update_worklist: self.update_worklist.iter().copied().collect(),
            ids: self.ids.to_state(),
        }
    }

    /// Rebuilds a handler from a snapshot.
    ///
    /// Restores `objects_by_id` (same length, same IDs bound), `active_ids`,
    /// the worklist, the ID pool including pending deferrals, and the frame.
    ///
    /// # Errors
    ///
    /// - [`FeatureError::InvalidConfig`] if `config` does not validate
    /// - [`FeatureError::UnknownDef`] if a record names a def not in `defs`
    /// - [`FeatureError::CorruptSnapshot`] if the snapshot is inconsistent, its
    ///   object array exceeds the ID ceiling, or it was taken with a different
    ///   ID ceiling or deferral window
    /// - [`FeatureError::CapacityExhausted`] if the page ceiling is too small
    pub fn restore(
        config: SimConfig,
        defs: FeatureDefRegistry,
        snapshot: &IdentitySnapshot,
    ) -> FeatureResult<Self> {
        let mut handler = Self::new(config, defs)?;

        if snapshot.ids.max_ids != handler.config.max_features
            || snapshot.ids.deferral_ticks != handler.config.id_deferral_ticks
        {
            return Err(FeatureError::CorruptSnapshot(
                "snapshot taken with different id limits".to_string(),
            ));
        }
        let ids = IdPool::from_state(&snapshot.ids)?;
        if ids.live_count() != snapshot.features.len() {
            return Err(FeatureError::CorruptSnapshot(format!(
                "{} live ids but {} feature records",
                ids.live_count(),
                snapshot.features.len()
            )));
        }
        if snapshot.frame != snapshot.ids.tick {
            return Err(FeatureError::CorruptSnapshot(format!(
                "frame {} does not match id pool tick {}",
                snapshot.frame, snapshot.ids.tick
            )));
        }
        // Bounded by the ceiling, not the ID pool: a rolled-back create leaves
        // the pool's high-water mark ahead of the array.
        if snapshot.id_space_len > handler.config.max_features as usize {
            return Err(FeatureError::CorruptSnapshot(format!(
                "object array of {} exceeds ceiling {}",
                snapshot.id_space_len, handler.config.max_features
            )));
        }

        handler.objects_by_id = vec![None; snapshot.id_space_len];

        for record in &snapshot.features {
            let id = record.id;
            if id.index() >= snapshot.id_space_len {
                return Err(FeatureError::CorruptSnapshot(format!(
                    "feature {id} past the object array"
                )));
            }
            if !ids.is_live(id.get()) {
                return Err(FeatureError::CorruptSnapshot(format!(
                    "feature {id} recorded but its id is not live"
                )));
            }
            if handler.handle_of(id).is_some() {
                return Err(FeatureError::CorruptSnapshot(format!(
                    "feature {id} recorded twice"
                )));
            }

            let def_id = handler
                .defs
                .id_of(&record.def_name)
                .ok_or_else(|| FeatureError::UnknownDef(record.def_name.clone()))?;
            let def = handler
                .defs
                .get(def_id)
                .ok_or_else(|| FeatureError::UnknownDef(record.def_name.clone()))?;

            let feature = record.to_feature(def_id, def);
            let handle = handler.slots.allocate(feature)?;
            handler.insert_active(id, handle, false);
        }

        for &id in &snapshot.update_worklist {
            let feature = handler.feature_mut(id).ok_or_else(|| {
                FeatureError::CorruptSnapshot(format!("worklist names inactive feature {id}"))
            })?;
            feature.in_update_queue = true;
            handler.update_worklist.insert(id);
        }

        handler.ids = ids;
        handler.frame = snapshot.frame;
        debug!(
            frame = handler.frame,
            features = handler.len(),
            "feature handler restored"
        );

        Ok(handler)
    }

    // =========================================================================
    // Tick driver hooks
    // =========================================================================

    /// Copies the worklist into `out`, ascending.
    pub(crate) fn copy_worklist(&self, out: &mut Vec<FeatureId>) {
        out.clear();
        out.extend(self.update_worklist.iter().copied());
    }

    /// True if `id` is still on the worklist.
    pub(crate) fn is_queued(&self, id: FeatureId) -> bool {
        self.update_worklist.contains(&id)
    }

    /// Ends the current frame and opens the next one.
    pub(crate) fn advance_frame(&mut self) {
        self.frame += 1;
        self.ids.begin_tick(self.frame);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn handle_of(&self, id: FeatureId) -> Option<SlotHandle> {
        self.objects_by_id.get(id.index()).copied().flatten()
    }

    /// Binds `id` to `handle`, growing the dense array up to and including `id`.
    fn insert_active(&mut self, id: FeatureId, handle: SlotHandle, queued: bool) {
        let index = id.index();
        if index >= self.objects_by_id.len() {
            self.objects_by_id.resize(index + 1, None);
        }
        self.objects_by_id[index] = Some(handle);
        self.active_ids.insert(id);
        if queued {
            self.update_worklist.insert(id);
        }
    }

    fn wake_all(&mut self, ids: &[FeatureId]) -> usize {
        let mut woken = 0;
        for &id in ids {
            if self.set_updateable(id).is_ok() {
                woken += 1;
            }
        }
        woken
    }

    fn record(&mut self, event: FeatureEvent) {
        if self.config.record_events {
            self.events.push(event);
        }
    }
}
