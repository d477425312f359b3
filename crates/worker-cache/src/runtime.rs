// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for worker-cache.
//!
//! [`WorkerCacheRuntime`] owns a shared [`WorkerCache`] and the background
//! [`CacheSweeper`] that keeps it clean. Heartbeats are fed in by whatever
//! consumer the host application runs, through [`WorkerCacheRuntime::cache`].
//!
//! ```rust,ignore
//! use worker_cache::events::HeartbeatEvent;
//! use worker_cache::runtime::WorkerCacheRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = WorkerCacheRuntime::builder()
//!         .expire_in_cache_secs(60)?
//!         .sweep_interval(std::time::Duration::from_secs(30))
//!         .build()?
//!         .start()
//!         .await;
//!
//!     runtime
//!         .cache()
//!         .register_heartbeat(&HeartbeatEvent::now("worker-1", "thumbnailer"))
//!         .await;
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::entry::ExpiryWindow;
use crate::error::{Error, Result};
use crate::registry::WorkerCache;
use crate::sweeper::{CacheSweeper, SweeperConfig};

/// Builder for creating a [`WorkerCacheRuntime`].
pub struct WorkerCacheRuntimeBuilder {
    expire_in_cache: ExpiryWindow,
    sweep_interval: Duration,
    log_invalid_heartbeats: bool,
    clock: Arc<dyn Clock>,
}

impl Default for WorkerCacheRuntimeBuilder {
    fn default() -> Self {
        let config = Config::default();
        Self {
            expire_in_cache: config.expire_in_cache,
            sweep_interval: config.sweep_interval,
            log_invalid_heartbeats: config.log_invalid_heartbeats,
            clock: Arc::new(SystemClock),
        }
    }
}

impl WorkerCacheRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder configured from environment variables.
    ///
    /// See [`Config::from_env`] for the variables read.
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        Ok(Self::new().config(&config))
    }

    /// Take every setting from a loaded [`Config`].
    pub fn config(mut self, config: &Config) -> Self {
        self.expire_in_cache = config.expire_in_cache;
        self.sweep_interval = config.sweep_interval;
        self.log_invalid_heartbeats = config.log_invalid_heartbeats;
        self
    }

    /// Set the expiry window.
    ///
    /// Default: 60 seconds
    pub fn expire_in_cache(mut self, window: ExpiryWindow) -> Self {
        self.expire_in_cache = window;
        self
    }

    /// Set the expiry window in seconds. Fails for zero.
    pub fn expire_in_cache_secs(self, secs: u64) -> Result<Self> {
        Ok(self.expire_in_cache(ExpiryWindow::from_secs(secs)?))
    }

    /// Set the sweep interval.
    ///
    /// Default: 30 seconds
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Enable or disable warnings for heartbeats that are stale on arrival.
    ///
    /// Default: enabled
    pub fn log_invalid_heartbeats(mut self, enabled: bool) -> Self {
        self.log_invalid_heartbeats = enabled;
        self
    }

    /// Set the time source.
    ///
    /// Default: [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the runtime configuration.
    pub fn build(self) -> Result<WorkerCacheRuntimeConfig> {
        if self.sweep_interval.is_zero() {
            return Err(Error::Other(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }

        let cache = WorkerCache::with_clock(self.expire_in_cache, self.clock)
            .with_invalid_heartbeat_logging(self.log_invalid_heartbeats);

        Ok(WorkerCacheRuntimeConfig {
            cache: Arc::new(cache),
            sweep_interval: self.sweep_interval,
        })
    }
}

/// Configuration for a [`WorkerCacheRuntime`].
pub struct WorkerCacheRuntimeConfig {
    cache: Arc<WorkerCache>,
    sweep_interval: Duration,
}

impl WorkerCacheRuntimeConfig {
    /// Start the runtime, spawning the sweeper task.
    pub async fn start(self) -> WorkerCacheRuntime {
        let sweeper = CacheSweeper::new(
            self.cache.clone(),
            SweeperConfig {
                poll_interval: self.sweep_interval,
            },
        );
        let sweeper_shutdown = sweeper.shutdown_handle();

        let sweeper_handle = tokio::spawn(async move {
            sweeper.run().await;
        });

        info!(
            expire_in_cache_secs = self.cache.expire_in_cache().as_secs(),
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "WorkerCacheRuntime started"
        );

        WorkerCacheRuntime {
            cache: self.cache,
            sweeper_handle,
            sweeper_shutdown,
        }
    }
}

/// A running worker cache with its background sweeper.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct WorkerCacheRuntime {
    cache: Arc<WorkerCache>,
    sweeper_handle: JoinHandle<()>,
    sweeper_shutdown: Arc<Notify>,
}

impl WorkerCacheRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> WorkerCacheRuntimeBuilder {
        WorkerCacheRuntimeBuilder::new()
    }

    /// Shared cache, to register heartbeats and read worker counts.
    pub fn cache(&self) -> &Arc<WorkerCache> {
        &self.cache
    }

    /// Check if the sweeper is still running.
    pub fn is_running(&self) -> bool {
        !self.sweeper_handle.is_finished()
    }

    /// Stop the sweeper and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        info!("WorkerCacheRuntime shutting down...");

        self.sweeper_shutdown.notify_one();

        if let Err(e) = self.sweeper_handle.await {
            error!("Cache sweeper task panicked: {}", e);
            return Err(Error::Other(format!("sweeper task panicked: {}", e)));
        }

        info!("WorkerCacheRuntime shutdown complete");
        Ok(())
    }
}
