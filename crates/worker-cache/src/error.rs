// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for worker-cache.

use thiserror::Error;

/// Worker cache errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// An expiry window of zero seconds was requested.
    #[error("Invalid expiry window: {0}s (must be greater than zero)")]
    InvalidExpiry(u64),

    /// A heartbeat payload could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type using worker-cache Error.
pub type Result<T> = std::result::Result<T, Error>;
