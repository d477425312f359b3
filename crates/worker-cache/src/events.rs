// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Inbound heartbeat payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness signal sent periodically by a worker instance.
///
/// The JSON form uses the field names emitted by the workers:
///
/// ```json
/// {"id": "worker-1", "type": "thumbnailer", "heartBeatDate": "2025-06-15T12:00:00Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatEvent {
    /// Unique id of the worker process.
    pub id: String,
    /// Kind of work the instance performs.
    #[serde(rename = "type")]
    pub worker_type: String,
    /// When the worker emitted the heartbeat.
    #[serde(rename = "heartBeatDate")]
    pub heartbeat_date: DateTime<Utc>,
}

impl HeartbeatEvent {
    /// Build a heartbeat with an explicit date.
    pub fn new(
        id: impl Into<String>,
        worker_type: impl Into<String>,
        heartbeat_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            worker_type: worker_type.into(),
            heartbeat_date,
        }
    }

    /// Build a heartbeat stamped with the current time.
    pub fn now(id: impl Into<String>, worker_type: impl Into<String>) -> Self {
        Self::new(id, worker_type, Utc::now())
    }

    /// Decode a single JSON document.
    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
