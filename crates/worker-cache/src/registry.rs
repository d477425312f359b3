// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Registry of worker types and their live instances.
//!
//! [`WorkerCache`] owns one [`CacheEntry`] per worker type. Every mutation of
//! an entry happens under the registry's write lock, so calls into a given
//! entry are always serialized. Entries that become empty during a
//! [`WorkerCache::sweep`] are dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::entry::{CacheEntry, ExpiryWindow};
use crate::events::HeartbeatEvent;
use crate::instance::CacheWorkerInstance;

/// Outcome of registering a batch of heartbeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationSummary {
    /// Heartbeats merged into an entry.
    pub accepted: usize,
    /// Heartbeats already outside the expiry window on arrival.
    pub rejected_stale: usize,
    /// New worker instances.
    pub inserted: usize,
    /// Known instances whose heartbeat date moved forward.
    pub refreshed: usize,
    /// Instances purged as a side effect of the merge.
    pub purged: usize,
}

/// Outcome of a full sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Expired instances removed across all entries.
    pub purged_instances: usize,
    /// Entries dropped because they had no instance left.
    pub reaped_entries: usize,
}

/// Health of a single worker type, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerTypeStatus {
    /// Worker type key.
    pub worker_type: String,
    /// Instances currently held for this type.
    pub nb_worker_instances: usize,
    /// Last time a heartbeat batch touched this type.
    pub last_update_date: DateTime<Utc>,
}

/// In-memory cache of live worker instances, keyed by worker type.
pub struct WorkerCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    expire_in_cache: ExpiryWindow,
    clock: Arc<dyn Clock>,
    log_invalid_heartbeats: bool,
}

impl WorkerCache {
    /// Create a cache using the wall clock.
    pub fn new(expire_in_cache: ExpiryWindow) -> Self {
        Self::with_clock(expire_in_cache, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(expire_in_cache: ExpiryWindow, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            expire_in_cache,
            clock,
            log_invalid_heartbeats: true,
        }
    }

    /// Enable or disable warnings for heartbeats that are stale on arrival.
    pub fn with_invalid_heartbeat_logging(mut self, enabled: bool) -> Self {
        self.log_invalid_heartbeats = enabled;
        self
    }

    /// Expiry window applied to every entry.
    pub fn expire_in_cache(&self) -> ExpiryWindow {
        self.expire_in_cache
    }

    /// Register a single heartbeat.
    pub async fn register_heartbeat(&self, event: &HeartbeatEvent) -> RegistrationSummary {
        self.register_heartbeats(std::slice::from_ref(event)).await
    }

    /// Register a batch of heartbeats, possibly spanning several worker types.
    ///
    /// Heartbeats already outside the expiry window are not merged. Every
    /// worker type named in the batch that is already cached still gets
    /// exactly one `add_workers` call, so it is re-stamped and purged even
    /// when all of its heartbeats were stale. A type seen for the first time
    /// is only created if at least one of its heartbeats is valid.
    ///
    /// The current time is read once the write lock is held, so concurrent
    /// batches stamp an entry in lock order.
    pub async fn register_heartbeats(&self, events: &[HeartbeatEvent]) -> RegistrationSummary {
        let mut summary = RegistrationSummary::default();
        if events.is_empty() {
            return summary;
        }

        let mut entries = self.entries.write().await;
        let now = self.clock.now();

        let mut by_type: HashMap<&str, Vec<CacheWorkerInstance>> = HashMap::new();
        for event in events {
            let instances = by_type.entry(event.worker_type.as_str()).or_default();
            if !CacheEntry::is_valid_heartbeat(event.heartbeat_date, self.expire_in_cache, now) {
                summary.rejected_stale += 1;
                if self.log_invalid_heartbeats {
                    warn!(
                        worker_id = %event.id,
                        worker_type = %event.worker_type,
                        heartbeat_date = %event.heartbeat_date,
                        expire_in_cache_secs = self.expire_in_cache.as_secs(),
                        "Ignoring heartbeat older than the expiry window"
                    );
                }
                continue;
            }
            summary.accepted += 1;
            instances.push(CacheWorkerInstance::build_from_heartbeat_event(event));
        }

        for (worker_type, instances) in by_type {
            match entries.get_mut(worker_type) {
                Some(entry) => {
                    let outcome = entry.add_workers(instances, now);
                    summary.inserted += outcome.inserted;
                    summary.refreshed += outcome.refreshed;
                    summary.purged += outcome.purged;
                    if outcome.inserted > 0 {
                        info!(
                            worker_type = %worker_type,
                            new_instances = outcome.inserted,
                            nb_worker_instances = entry.nb_worker_ins(),
                            "New worker instances registered"
                        );
                    }
                }
                None if instances.is_empty() => {
                    debug!(
                        worker_type = %worker_type,
                        "Only stale heartbeats for unknown worker type"
                    );
                }
                None => {
                    let entry = CacheEntry::new(instances, self.expire_in_cache, now);
                    summary.inserted += entry.nb_worker_ins();
                    info!(
                        worker_type = %worker_type,
                        nb_worker_instances = entry.nb_worker_ins(),
                        "Worker type added to cache"
                    );
                    entries.insert(worker_type.to_string(), entry);
                }
            }
        }

        summary
    }

    /// Number of live instances known for `worker_type` (0 if unknown).
    pub async fn nb_worker_instances(&self, worker_type: &str) -> usize {
        self.entries
            .read()
            .await
            .get(worker_type)
            .map(CacheEntry::nb_worker_ins)
            .unwrap_or(0)
    }

    /// Whether at least one instance of `worker_type` is held.
    pub async fn is_worker_type_alive(&self, worker_type: &str) -> bool {
        self.nb_worker_instances(worker_type).await > 0
    }

    /// Last time a heartbeat batch touched `worker_type`.
    pub async fn last_update_date(&self, worker_type: &str) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .await
            .get(worker_type)
            .map(CacheEntry::last_update_date)
    }

    /// Worker types currently held, sorted.
    pub async fn worker_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entries.read().await.keys().cloned().collect();
        types.sort();
        types
    }

    /// Status of every worker type, sorted by type.
    pub async fn snapshot(&self) -> Vec<WorkerTypeStatus> {
        let mut statuses: Vec<WorkerTypeStatus> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(worker_type, entry)| WorkerTypeStatus {
                worker_type: worker_type.clone(),
                nb_worker_instances: entry.nb_worker_ins(),
                last_update_date: entry.last_update_date(),
            })
            .collect();
        statuses.sort_by(|a, b| a.worker_type.cmp(&b.worker_type));
        statuses
    }

    /// Purge expired instances from every entry and drop empty entries.
    pub async fn sweep(&self) -> SweepSummary {
        let mut summary = SweepSummary::default();

        let mut entries = self.entries.write().await;
        let now = self.clock.now();
        entries.retain(|worker_type, entry| {
            summary.purged_instances += entry.purge_expired(now);
            if entry.is_empty() {
                info!(
                    worker_type = %worker_type,
                    last_update_date = %entry.last_update_date(),
                    "No live instance left, removing worker type from cache"
                );
                summary.reaped_entries += 1;
                false
            } else {
                true
            }
        });

        summary
    }

    /// Forget every worker type.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn cache(clock: Arc<ManualClock>) -> WorkerCache {
        WorkerCache::with_clock(ExpiryWindow::from_secs(60).unwrap(), clock)
    }

    #[tokio::test]
    async fn test_register_groups_by_worker_type() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = cache(clock.clone());

        let summary = cache
            .register_heartbeats(&[
                HeartbeatEvent::new("w1", "thumbnailer", start()),
                HeartbeatEvent::new("w2", "thumbnailer", start()),
                HeartbeatEvent::new("w3", "indexer", start()),
            ])
            .await;

        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.inserted, 3);
        assert_eq!(cache.nb_worker_instances("thumbnailer").await, 2);
        assert_eq!(cache.nb_worker_instances("indexer").await, 1);
        assert_eq!(cache.worker_types().await, vec!["indexer", "thumbnailer"]);
    }

    #[tokio::test]
    async fn test_stale_heartbeat_is_rejected() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = cache(clock.clone()).with_invalid_heartbeat_logging(false);

        let summary = cache
            .register_heartbeat(&HeartbeatEvent::new(
                "w1",
                "T",
                start() - Duration::seconds(61),
            ))
            .await;

        assert_eq!(summary.rejected_stale, 1);
        assert_eq!(summary.accepted, 0);
        assert!(cache.worker_types().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_worker_type() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = cache(clock);

        assert_eq!(cache.nb_worker_instances("missing").await, 0);
        assert!(!cache.is_worker_type_alive("missing").await);
        assert!(cache.last_update_date("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_reaps_silent_worker_types() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = cache(clock.clone());

        cache
            .register_heartbeat(&HeartbeatEvent::new("w1", "silent", start()))
            .await;
        clock.advance(Duration::seconds(30));
        cache
            .register_heartbeat(&HeartbeatEvent::new("w2", "chatty", clock.now()))
            .await;

        clock.advance(Duration::seconds(31));
        let summary = cache.sweep().await;

        assert_eq!(
            summary,
            SweepSummary {
                purged_instances: 1,
                reaped_entries: 1
            }
        );
        assert_eq!(cache.worker_types().await, vec!["chatty"]);
    }

    #[tokio::test]
    async fn test_snapshot_reports_counts_and_dates() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = cache(clock.clone());

        cache
            .register_heartbeat(&HeartbeatEvent::new("w1", "b", start()))
            .await;
        clock.advance(Duration::seconds(5));
        cache
            .register_heartbeats(&[
                HeartbeatEvent::new("w2", "a", clock.now()),
                HeartbeatEvent::new("w3", "a", clock.now()),
            ])
            .await;

        let snapshot = cache.snapshot().await;
        assert_eq!(
            snapshot,
            vec![
                WorkerTypeStatus {
                    worker_type: "a".to_string(),
                    nb_worker_instances: 2,
                    last_update_date: start() + Duration::seconds(5),
                },
                WorkerTypeStatus {
                    worker_type: "b".to_string(),
                    nb_worker_instances: 1,
                    last_update_date: start(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_clear() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = cache(clock);

        cache
            .register_heartbeat(&HeartbeatEvent::new("w1", "T", start()))
            .await;
        cache.clear().await;

        assert!(cache.snapshot().await.is_empty());
    }
}
