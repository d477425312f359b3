// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! A single known worker process.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::events::HeartbeatEvent;

/// One worker process and the date of its most recent heartbeat.
///
/// Identity is the `id` alone: two instances with the same id are the same
/// worker whatever their heartbeat dates. The heartbeat date can only be moved
/// by the owning [`CacheEntry`](crate::entry::CacheEntry).
#[derive(Debug, Clone)]
pub struct CacheWorkerInstance {
    id: String,
    worker_type: String,
    last_heartbeat_date: DateTime<Utc>,
}

impl CacheWorkerInstance {
    /// Create an instance seen alive at `heartbeat_date`.
    pub fn new(
        id: impl Into<String>,
        worker_type: impl Into<String>,
        heartbeat_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            worker_type: worker_type.into(),
            last_heartbeat_date: heartbeat_date,
        }
    }

    /// Map an inbound heartbeat to an instance.
    pub fn build_from_heartbeat_event(event: &HeartbeatEvent) -> Self {
        Self::new(
            event.id.clone(),
            event.worker_type.clone(),
            event.heartbeat_date,
        )
    }

    /// Worker process id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Worker type this instance serves.
    pub fn worker_type(&self) -> &str {
        &self.worker_type
    }

    /// Date of the last heartbeat received.
    pub fn last_heartbeat_date(&self) -> DateTime<Utc> {
        self.last_heartbeat_date
    }

    pub(crate) fn refresh(&mut self, heartbeat_date: DateTime<Utc>) {
        self.last_heartbeat_date = heartbeat_date;
    }
}

impl PartialEq for CacheWorkerInstance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CacheWorkerInstance {}

impl Hash for CacheWorkerInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl From<&HeartbeatEvent> for CacheWorkerInstance {
    fn from(event: &HeartbeatEvent) -> Self {
        Self::build_from_heartbeat_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_build_from_heartbeat_event() {
        let event = HeartbeatEvent::new("w1", "thumbnailer", date());
        let instance = CacheWorkerInstance::build_from_heartbeat_event(&event);

        assert_eq!(instance.id(), "w1");
        assert_eq!(instance.worker_type(), "thumbnailer");
        assert_eq!(instance.last_heartbeat_date(), date());
    }

    #[test]
    fn test_equality_ignores_heartbeat_date() {
        let a = CacheWorkerInstance::new("w1", "T", date());
        let b = CacheWorkerInstance::new("w1", "T", date() + Duration::seconds(30));
        let c = CacheWorkerInstance::new("w2", "T", date());

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_set_insert_does_not_replace_same_id() {
        let mut set = HashSet::new();
        assert!(set.insert(CacheWorkerInstance::new("w1", "T", date())));
        assert!(!set.insert(CacheWorkerInstance::new(
            "w1",
            "T",
            date() + Duration::seconds(30)
        )));

        assert_eq!(set.len(), 1);
        let stored = set.iter().next().unwrap();
        assert_eq!(stored.last_heartbeat_date(), date());
    }
}
