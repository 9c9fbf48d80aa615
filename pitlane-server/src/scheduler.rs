//! Background sweeper.
//!
//! Periodically drops expired rate-limit windows and sessions so the
//! in-memory tables stay bounded. Runs independently of request handling.

use std::time::Duration;

use tokio::time::interval;

use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Start the sweeper as a background tokio task.
pub fn start(state: AppState) {
    tokio::spawn(async move {
        tracing::info!("🧹 [Sweeper] started, interval {}s", SWEEP_INTERVAL.as_secs());
        let mut tick = interval(SWEEP_INTERVAL);
        loop {
            tick.tick().await;

            let limiters = state.limiters();
            let removed = limiters.api.sweep()
                + limiters.chat.sweep()
                + limiters.auth.sweep()
                + limiters.tools.sweep()
                + state.sessions().sweep();

            if removed > 0 {
                tracing::debug!("[Sweeper] removed {} stale entries", removed);
            }
        }
    });
}
