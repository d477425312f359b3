// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Heartbeat ingestion from a line-oriented stream.
//!
//! Each non-blank line is one JSON [`HeartbeatEvent`]. Malformed lines are
//! logged and skipped; they never stop the listener.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::HeartbeatEvent;
use crate::registry::WorkerCache;

/// Counters accumulated by a [`HeartbeatListener`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Non-blank lines read.
    pub received: usize,
    /// Heartbeats merged into the cache.
    pub accepted: usize,
    /// Lines that were not a valid heartbeat.
    pub malformed: usize,
    /// Heartbeats already expired on arrival.
    pub rejected_stale: usize,
}

/// Feeds heartbeats read from a stream into a [`WorkerCache`].
pub struct HeartbeatListener {
    cache: Arc<WorkerCache>,
    shutdown: Arc<Notify>,
}

impl HeartbeatListener {
    /// Create a listener for `cache`.
    pub fn new(cache: Arc<WorkerCache>) -> Self {
        Self {
            cache,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Consume `reader` until end of stream or shutdown.
    ///
    /// Only I/O errors on the stream itself are returned.
    pub async fn run<R>(&self, reader: R) -> Result<ListenerStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stats = ListenerStats::default();
        let mut lines = reader.lines();

        loop {
            let line = tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Heartbeat listener received shutdown signal");
                    break;
                }

                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                debug!("Heartbeat stream closed");
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            stats.received += 1;

            let event = match HeartbeatEvent::from_json(line) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed heartbeat");
                    stats.malformed += 1;
                    continue;
                }
            };

            let summary = self.cache.register_heartbeat(&event).await;
            stats.accepted += summary.accepted;
            stats.rejected_stale += summary.rejected_stale;
        }

        info!(
            received = stats.received,
            accepted = stats.accepted,
            malformed = stats.malformed,
            rejected_stale = stats.rejected_stale,
            "Heartbeat listener stopped"
        );

        Ok(stats)
    }
}
