// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker Cache - Live Worker Instance Registry
//!
//! Worker processes announce themselves with periodic heartbeats
//! `{id, type, heartBeatDate}`. This crate keeps, for every worker type, the
//! set of instances whose last heartbeat is recent enough, so that routing and
//! capacity decisions can ask "how many workers of type T are alive?".
//!
//! # Architecture
//!
//! ```text
//!   heartbeats (JSON lines, broker consumer, ...)
//!                     │
//!                     ▼
//!          ┌─────────────────────┐        ┌────────────────┐
//!          │     WorkerCache     │◄───────│  CacheSweeper  │  every sweep_interval
//!          │  type → CacheEntry  │        └────────────────┘
//!          └──────────┬──────────┘
//!                     │ one per worker type
//!                     ▼
//!          ┌─────────────────────┐
//!          │     CacheEntry      │  id → CacheWorkerInstance
//!          │  purge on mutation  │
//!          └─────────────────────┘
//! ```
//!
//! # Expiry
//!
//! An instance is alive while `last_heartbeat_date + expire_in_cache` is
//! strictly after now. Entries purge expired instances whenever they are
//! mutated; the sweeper purges entries nobody is writing to and drops the
//! ones left empty.
//!
//! # Configuration
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `WORKER_CACHE_EXPIRE_SECS` | No | `60` | Expiry window in seconds |
//! | `WORKER_CACHE_SWEEP_INTERVAL_SECS` | No | `30` | Sweep period in seconds |
//! | `WORKER_CACHE_LOG_INVALID_HEARTBEATS` | No | `true` | Warn on stale heartbeats |
//!
//! # Modules
//!
//! - [`clock`]: Injectable time source
//! - [`config`]: Configuration from environment variables
//! - [`entry`]: Live instance set for one worker type
//! - [`error`]: Error types
//! - [`events`]: Inbound heartbeat payload
//! - [`instance`]: A single worker instance
//! - [`listener`]: JSON lines heartbeat ingestion
//! - [`registry`]: Worker type registry
//! - [`runtime`]: Embeddable runtime
//! - [`sweeper`]: Periodic expiry sweep

#![deny(missing_docs)]

/// Injectable time source.
pub mod clock;

/// Configuration loaded from environment variables.
pub mod config;

/// Live instance set for one worker type.
pub mod entry;

/// Error types for worker cache operations.
pub mod error;

/// Inbound heartbeat payload.
pub mod events;

/// A single worker instance.
pub mod instance;

/// Heartbeat ingestion from a line-oriented stream.
pub mod listener;

/// Registry of worker types and their live instances.
pub mod registry;

/// Embeddable runtime for worker-cache.
pub mod runtime;

/// Background worker purging expired instances.
pub mod sweeper;

pub use config::Config;
pub use entry::{CacheEntry, ExpiryWindow};
pub use error::Error;
pub use events::HeartbeatEvent;
pub use instance::CacheWorkerInstance;
pub use registry::WorkerCache;

/// Default expiry window in seconds
pub const DEFAULT_EXPIRE_IN_CACHE_SECS: u64 = 60;

/// Default sweep interval in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
