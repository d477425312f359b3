// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the JSON lines heartbeat listener.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tokio::io::BufReader;
use worker_cache::clock::ManualClock;
use worker_cache::listener::{HeartbeatListener, ListenerStats};
use worker_cache::{ExpiryWindow, WorkerCache};

fn create_cache() -> Arc<WorkerCache> {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap(),
    ));
    Arc::new(
        WorkerCache::with_clock(ExpiryWindow::from_secs(60).unwrap(), clock)
            .with_invalid_heartbeat_logging(false),
    )
}

#[tokio::test]
async fn test_listener_registers_valid_lines() {
    let cache = create_cache();
    let listener = HeartbeatListener::new(cache.clone());

    let input = concat!(
        r#"{"id":"w1","type":"thumbnailer","heartBeatDate":"2025-06-15T11:59:50Z"}"#,
        "\n",
        "\n",
        r#"{"id":"w2","type":"thumbnailer","heartBeatDate":"2025-06-15T11:59:55Z"}"#,
        "\n",
        "not json at all\n",
        r#"{"id":"w3","type":"indexer"}"#,
        "\n",
        r#"{"id":"w4","type":"indexer","heartBeatDate":"2025-06-15T11:00:00Z"}"#,
        "\n",
    );

    let stats = listener
        .run(BufReader::new(input.as_bytes()))
        .await
        .unwrap();

    assert_eq!(
        stats,
        ListenerStats {
            received: 5,
            accepted: 2,
            malformed: 2,
            rejected_stale: 1,
        }
    );
    assert_eq!(cache.nb_worker_instances("thumbnailer").await, 2);
    assert!(!cache.is_worker_type_alive("indexer").await);
}

#[tokio::test]
async fn test_listener_stops_on_shutdown() {
    let cache = create_cache();
    let listener = HeartbeatListener::new(cache);

    // Writer half stays open, so only shutdown can end the run
    let (_writer, reader) = tokio::io::duplex(64);
    listener.shutdown_handle().notify_one();

    let stats = listener.run(BufReader::new(reader)).await.unwrap();
    assert_eq!(stats, ListenerStats::default());
}
