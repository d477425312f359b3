// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Live instance set for one worker type.
//!
//! A [`CacheEntry`] prunes itself on every mutation: once [`CacheEntry::new`],
//! [`CacheEntry::add_workers`] or [`CacheEntry::purge_expired`] returns, no
//! stored instance has a heartbeat older than the expiry window. Reads never
//! purge, so an entry nobody touches keeps its instances until the registry
//! sweeps it.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::DEFAULT_EXPIRE_IN_CACHE_SECS;
use crate::error::{Error, Result};
use crate::instance::CacheWorkerInstance;

/// How long an instance stays alive after its last heartbeat.
///
/// Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindow {
    secs: u64,
    delta: TimeDelta,
}

impl ExpiryWindow {
    /// Build a window of `secs` seconds.
    ///
    /// Zero, and values too large to add to a date, are rejected.
    pub fn from_secs(secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(Error::InvalidExpiry(secs));
        }
        let delta = i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or(Error::InvalidExpiry(secs))?;
        Ok(Self { secs, delta })
    }

    /// Window length in seconds.
    pub fn as_secs(&self) -> u64 {
        self.secs
    }

    /// Window length as a chrono delta.
    pub fn as_delta(&self) -> TimeDelta {
        self.delta
    }
}

impl Default for ExpiryWindow {
    fn default() -> Self {
        Self {
            secs: DEFAULT_EXPIRE_IN_CACHE_SECS,
            delta: TimeDelta::seconds(DEFAULT_EXPIRE_IN_CACHE_SECS as i64),
        }
    }
}

/// What a call to [`CacheEntry::add_workers`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddWorkersOutcome {
    /// Ids seen for the first time.
    pub inserted: usize,
    /// Known ids whose heartbeat date moved forward.
    pub refreshed: usize,
    /// Instances removed by the post-merge purge.
    pub purged: usize,
}

/// The live instances of one worker type.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    worker_ins: HashMap<String, CacheWorkerInstance>,
    expire_in_cache: ExpiryWindow,
    last_update_date: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry from an initial set of instances.
    ///
    /// Instances already outside the expiry window at `now` are dropped
    /// straight away.
    pub fn new(
        initial: impl IntoIterator<Item = CacheWorkerInstance>,
        expire_in_cache: ExpiryWindow,
        now: DateTime<Utc>,
    ) -> Self {
        let mut entry = Self {
            worker_ins: HashMap::new(),
            expire_in_cache,
            last_update_date: now,
        };
        for instance in initial {
            entry.merge(instance);
        }
        entry.purge_expired(now);
        entry
    }

    /// Merge a batch of fresh heartbeats into the entry.
    ///
    /// Known ids get their heartbeat date moved forward, unknown ids are
    /// inserted. A heartbeat older than the one already stored never moves
    /// the date backwards. Afterwards the entry is stamped with `now` and every
    /// expired instance is purged, refreshed in this batch or not.
    pub fn add_workers(
        &mut self,
        incoming: impl IntoIterator<Item = CacheWorkerInstance>,
        now: DateTime<Utc>,
    ) -> AddWorkersOutcome {
        let mut outcome = AddWorkersOutcome::default();
        for instance in incoming {
            match self.merge(instance) {
                Merge::Inserted => outcome.inserted += 1,
                Merge::Refreshed => outcome.refreshed += 1,
                Merge::Ignored => {}
            }
        }
        self.last_update_date = now;
        outcome.purged = self.purge_expired(now);
        outcome
    }

    /// Remove every instance whose heartbeat is outside the window at `now`.
    ///
    /// Does not count as an update: `last_update_date` is left alone.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let window = self.expire_in_cache;
        let before = self.worker_ins.len();
        self.worker_ins.retain(|id, instance| {
            let alive = Self::is_valid_heartbeat(instance.last_heartbeat_date(), window, now);
            if !alive {
                debug!(
                    worker_id = %id,
                    worker_type = %instance.worker_type(),
                    last_heartbeat = %instance.last_heartbeat_date(),
                    "Purging expired worker instance"
                );
            }
            alive
        });
        before - self.worker_ins.len()
    }

    /// Whether a heartbeat sent at `last_heartbeat_date` still proves
    /// liveness at `now`: `last_heartbeat_date + window` is strictly after `now`.
    pub fn is_valid_heartbeat(
        last_heartbeat_date: DateTime<Utc>,
        expire_in_cache: ExpiryWindow,
        now: DateTime<Utc>,
    ) -> bool {
        match last_heartbeat_date.checked_add_signed(expire_in_cache.as_delta()) {
            Some(deadline) => deadline > now,
            // Past the representable range, so certainly after now.
            None => true,
        }
    }

    /// Number of instances currently stored.
    pub fn nb_worker_ins(&self) -> usize {
        self.worker_ins.len()
    }

    /// Whether the entry holds no instance at all.
    pub fn is_empty(&self) -> bool {
        self.worker_ins.is_empty()
    }

    /// Date of the last construction or `add_workers` call.
    pub fn last_update_date(&self) -> DateTime<Utc> {
        self.last_update_date
    }

    /// Expiry window this entry was built with.
    pub fn expire_in_cache(&self) -> ExpiryWindow {
        self.expire_in_cache
    }

    /// Look up a stored instance by id.
    pub fn instance(&self, id: &str) -> Option<&CacheWorkerInstance> {
        self.worker_ins.get(id)
    }

    /// Iterate over the stored instances, in no particular order.
    pub fn instances(&self) -> impl Iterator<Item = &CacheWorkerInstance> {
        self.worker_ins.values()
    }

    fn merge(&mut self, incoming: CacheWorkerInstance) -> Merge {
        match self.worker_ins.entry(incoming.id().to_string()) {
            Entry::Occupied(mut slot) => {
                let stored = slot.get_mut();
                if incoming.last_heartbeat_date() > stored.last_heartbeat_date() {
                    stored.refresh(incoming.last_heartbeat_date());
                    Merge::Refreshed
                } else {
                    if incoming.last_heartbeat_date() < stored.last_heartbeat_date() {
                        debug!(
                            worker_id = %stored.id(),
                            stored = %stored.last_heartbeat_date(),
                            received = %incoming.last_heartbeat_date(),
                            "Ignoring out-of-order heartbeat"
                        );
                    }
                    Merge::Ignored
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(incoming);
                Merge::Inserted
            }
        }
    }
}

enum Merge {
    Inserted,
    Refreshed,
    Ignored,
}
