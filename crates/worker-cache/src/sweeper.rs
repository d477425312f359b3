// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker that purges expired worker instances.
//!
//! Entries only prune themselves when a heartbeat batch reaches them. A worker
//! type whose instances all stop sending heartbeats would therefore stay in
//! the cache forever. The sweeper ticks on a fixed interval and runs
//! [`WorkerCache::sweep`], which purges every entry and drops the empty ones.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info};

use crate::DEFAULT_SWEEP_INTERVAL_SECS;
use crate::registry::WorkerCache;

/// Configuration for the cache sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to sweep the cache.
    pub poll_interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

/// Periodically sweeps a [`WorkerCache`].
pub struct CacheSweeper {
    cache: Arc<WorkerCache>,
    config: SweeperConfig,
    shutdown: Arc<Notify>,
}

impl CacheSweeper {
    /// Create a new sweeper.
    pub fn new(cache: Arc<WorkerCache>, config: SweeperConfig) -> Self {
        Self {
            cache,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the sweep loop until shutdown is signalled.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            expire_in_cache_secs = self.cache.expire_in_cache().as_secs(),
            "Cache sweeper started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Cache sweeper received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    let summary = self.cache.sweep().await;
                    if summary.purged_instances > 0 || summary.reaped_entries > 0 {
                        info!(
                            purged_instances = summary.purged_instances,
                            reaped_entries = summary.reaped_entries,
                            "Swept expired worker instances"
                        );
                    } else {
                        debug!("No expired worker instances found");
                    }
                }
            }
        }

        info!("Cache sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SweeperConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
    }
}
