// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker Cache - standalone process
//!
//! Reads heartbeats as JSON lines on stdin, keeps the live worker cache up to
//! date and logs the per-type status when the stream ends or on Ctrl-C.

use tokio::io::BufReader;
use tracing::{info, warn};

use worker_cache::listener::HeartbeatListener;
use worker_cache::runtime::WorkerCacheRuntimeBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worker_cache=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    info!("Starting worker cache");

    let runtime = WorkerCacheRuntimeBuilder::from_env()?
        .build()?
        .start()
        .await;

    let listener = HeartbeatListener::new(runtime.cache().clone());
    let listener_shutdown = listener.shutdown_handle();
    let mut listener_handle =
        tokio::spawn(async move { listener.run(BufReader::new(tokio::io::stdin())).await });

    let stats = tokio::select! {
        result = &mut listener_handle => result??,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            listener_shutdown.notify_one();
            listener_handle.await??
        }
    };

    for status in runtime.cache().snapshot().await {
        info!(
            worker_type = %status.worker_type,
            nb_worker_instances = status.nb_worker_instances,
            last_update_date = %status.last_update_date,
            "Worker type status"
        );
    }

    info!(
        received = stats.received,
        accepted = stats.accepted,
        "Heartbeat stream finished"
    );

    runtime.shutdown().await?;

    info!("Worker cache shut down");

    // tokio's stdin reader sits on a blocking thread that cannot be
    // cancelled; on an interactive terminal dropping the runtime would wait
    // for the next line. Exit explicitly once everything is shut down.
    std::process::exit(0)
}
