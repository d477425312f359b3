// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::time::Duration;

use crate::entry::ExpiryWindow;
use crate::{DEFAULT_EXPIRE_IN_CACHE_SECS, DEFAULT_SWEEP_INTERVAL_SECS};

/// Worker cache configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a worker instance stays alive after its last heartbeat.
    pub expire_in_cache: ExpiryWindow,
    /// How often the background sweeper purges expired instances.
    pub sweep_interval: Duration,
    /// Log a warning for heartbeats that are already stale on arrival.
    pub log_invalid_heartbeats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            expire_in_cache: ExpiryWindow::default(),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            log_invalid_heartbeats: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `WORKER_CACHE_EXPIRE_SECS`: expiry window in seconds (default: 60)
    /// - `WORKER_CACHE_SWEEP_INTERVAL_SECS`: sweep period in seconds (default: 30)
    /// - `WORKER_CACHE_LOG_INVALID_HEARTBEATS`: warn on stale heartbeats (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let expire_secs: u64 = std::env::var("WORKER_CACHE_EXPIRE_SECS")
            .unwrap_or_else(|_| DEFAULT_EXPIRE_IN_CACHE_SECS.to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("WORKER_CACHE_EXPIRE_SECS", "must be a positive integer")
            })?;
        let expire_in_cache = ExpiryWindow::from_secs(expire_secs).map_err(|_| {
            ConfigError::Invalid("WORKER_CACHE_EXPIRE_SECS", "must be greater than zero")
        })?;

        let sweep_secs: u64 = std::env::var("WORKER_CACHE_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid(
                    "WORKER_CACHE_SWEEP_INTERVAL_SECS",
                    "must be a positive integer",
                )
            })?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid(
                "WORKER_CACHE_SWEEP_INTERVAL_SECS",
                "must be greater than zero",
            ));
        }

        let log_invalid_heartbeats = std::env::var("WORKER_CACHE_LOG_INVALID_HEARTBEATS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Ok(Self {
            expire_in_cache,
            sweep_interval: Duration::from_secs(sweep_secs),
            log_invalid_heartbeats,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
