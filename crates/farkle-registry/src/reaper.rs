//! Background sweep of finished sessions.
//!
//! Runs on a fixed period. A sweep that overruns its slot skips the missed
//! deadlines and resumes from now instead of firing back-to-back.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::Registry;

/// Floor on the sweep period so a zero interval can't spin.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

impl Registry {
    /// Spawns the reaper task.
    ///
    /// The task holds only a weak reference and exits once the registry is
    /// dropped. The first sweep happens one period after spawning.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let period = self.config.sweep_interval.max(MIN_SWEEP_INTERVAL);
        let registry = Arc::downgrade(self);
        tracing::debug!(?period, retention = ?self.config.retention, "reaper started");
        tokio::spawn(reap(registry, period))
    }
}

async fn reap(registry: Weak<Registry>, period: Duration) {
    let mut next = Instant::now() + period;
    loop {
        time::sleep_until(next).await;

        let Some(registry) = registry.upgrade() else {
            break;
        };
        let evicted = registry.sweep().await;
        drop(registry);
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "sweep complete");
        }

        next += period;
        let now = Instant::now();
        if next <= now {
            tracing::warn!(?period, "sweep overran its period, skipping ahead");
            next = now + period;
        }
    }
    tracing::debug!("reaper stopped");
}
