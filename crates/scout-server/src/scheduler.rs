use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Schedule due monitoring sources every `period` until `shutdown` flips.
pub async fn run(state: AppState, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => tick(&state, Utc::now()).await,
            _ = shutdown.changed() => break,
        }
    }
    info!("scheduler stopped");
}

/// One pass. Failures are logged and retried on the next pass.
pub async fn tick(state: &AppState, now: DateTime<Utc>) {
    match state.sources.tick(now).await {
        Ok(report) if report.scheduled + report.failed > 0 => {
            info!(scheduled = report.scheduled, failed = report.failed, "sources scheduled");
        }
        Ok(_) => debug!("no source due"),
        Err(e) => error!(error = %e, "scheduler pass failed"),
    }
    match state.auth.purge_expired(now).await {
        Ok(0) => {}
        Ok(purged) => debug!(purged, "expired sessions removed"),
        Err(e) => warn!(error = %e, "session purge failed"),
    }
}
