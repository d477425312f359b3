// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime and background sweeper tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use worker_cache::HeartbeatEvent;
use worker_cache::clock::{Clock, ManualClock};
use worker_cache::runtime::WorkerCacheRuntime;

#[tokio::test(start_paused = true)]
async fn test_sweeper_reaps_silent_worker_type() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap(),
    ));

    let runtime = WorkerCacheRuntime::builder()
        .expire_in_cache_secs(60)
        .unwrap()
        .sweep_interval(Duration::from_secs(30))
        .clock(clock.clone())
        .build()
        .unwrap()
        .start()
        .await;

    runtime
        .cache()
        .register_heartbeat(&HeartbeatEvent::new("w1", "silent", clock.now()))
        .await;
    assert!(runtime.cache().is_worker_type_alive("silent").await);

    // Worker stops sending heartbeats; the next tick must drop it
    clock.advance(chrono::Duration::seconds(61));
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert!(runtime.cache().worker_types().await.is_empty());
    assert!(runtime.is_running());

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_keeps_live_workers() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap(),
    ));

    let runtime = WorkerCacheRuntime::builder()
        .sweep_interval(Duration::from_secs(10))
        .clock(clock.clone())
        .build()
        .unwrap()
        .start()
        .await;

    runtime
        .cache()
        .register_heartbeat(&HeartbeatEvent::new("w1", "T", clock.now()))
        .await;

    clock.advance(chrono::Duration::seconds(30));
    tokio::time::sleep(Duration::from_secs(25)).await;

    assert_eq!(runtime.cache().nb_worker_instances("T").await, 1);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_builder_rejects_zero_values() {
    assert!(WorkerCacheRuntime::builder().expire_in_cache_secs(0).is_err());
    assert!(
        WorkerCacheRuntime::builder()
            .sweep_interval(Duration::ZERO)
            .build()
            .is_err()
    );
}

#[tokio::test]
async fn test_shutdown_stops_sweeper() {
    let runtime = WorkerCacheRuntime::builder()
        .build()
        .unwrap()
        .start()
        .await;

    assert!(runtime.is_running());
    runtime.shutdown().await.unwrap();
}
