// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Background timers of the interactive recorder
//
// One task flushes the writer every dump interval, another records a sync
// marker every sync interval. File work runs on the blocking pool. Both tasks
// stop when the shutdown channel flips to true.

use crate::session::Session;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

async fn every<F>(period: Duration, mut shutdown: watch::Receiver<bool>, mut tick: F)
where
    F: FnMut() -> JoinHandle<()>,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = tick().await {
                    warn!(error = %e, "Background task panicked");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

pub fn spawn_flush_task(session: Arc<Session>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let period = session.config().dump_interval;
    tokio::spawn(every(period, shutdown, move || {
        let session = Arc::clone(&session);
        tokio::task::spawn_blocking(move || match session.dump() {
            Ok(0) => {}
            Ok(count) => debug!(count, "Periodic flush"),
            Err(e) => warn!(error = %e, pending = session.writer().pending(), "Periodic flush failed"),
        })
    }))
}

pub fn spawn_sync_task(session: Arc<Session>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let period = session.config().sync_interval;
    tokio::spawn(every(period, shutdown, move || {
        let session = Arc::clone(&session);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = session.heartbeat() {
                warn!(error = %format!("{:#}", e), "Failed to record sync marker");
            }
        })
    }))
}
