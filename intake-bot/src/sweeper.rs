//! Periodic cleanup of expired cooldowns and idle sessions.

use crate::service::ReportService;
use intake_common::MessageKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// What one sweep removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub cooldowns: usize,
    pub sessions: usize,
    /// Sessions skipped because they were busy
    pub skipped: usize,
}

/// Run one sweep at `now`.
///
/// Each registry is visited on its own and no two locks are held at once. A
/// session that is locked is being used and is left for the next pass.
pub async fn sweep_once(service: &ReportService, now: Instant) -> SweepStats {
    let mut stats = SweepStats::default();

    for registry in service.cooldowns() {
        let removed = registry.purge_expired(now);
        if removed > 0 {
            tracing::debug!(registry = registry.name(), removed, "Expired cooldowns purged");
        }
        stats.cooldowns += removed;
    }

    let timeout = service.limits().idle_timeout();
    for (user_id, handle) in service.sessions().snapshot().await {
        let evict = match handle.try_lock() {
            Ok(mut session) => {
                let idle = !session.is_closed() && session.is_idle(now, timeout);
                if idle {
                    session.close();
                }
                idle
            }
            Err(_) => {
                stats.skipped += 1;
                false
            }
        };

        if !evict || !service.sessions().remove_if_same(&user_id, &handle).await {
            continue;
        }

        stats.sessions += 1;
        tracing::info!(user_id = %user_id, "Idle report discarded");

        let notice = service.templates().render(MessageKind::InactiveReport);
        let _ = service.outbound().send_dm(&user_id, &notice).await;
    }

    if stats != SweepStats::default() {
        tracing::debug!(
            cooldowns = stats.cooldowns,
            sessions = stats.sessions,
            skipped = stats.skipped,
            "Sweep finished"
        );
    }

    stats
}

/// Sweep every `interval` until the task is aborted.
pub fn spawn_sweeper(service: Arc<ReportService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "Sweeper started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let now = ticker.tick().await;
            sweep_once(&service, now).await;
        }
    })
}
