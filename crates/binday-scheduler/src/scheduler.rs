//! Periodic refresh loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::{RwLock, watch};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::{Registry, ScheduleSnapshot};

/// Default time between refresh ticks. Results only change once a day, so a
/// minute is plenty.
pub const DEFAULT_TICK: Duration = Duration::from_secs(60);

/// Supplies the current local date.
pub type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// Called for every schedule whose state changed during a tick.
pub type ChangeHandler = Box<dyn Fn(&ScheduleSnapshot) + Send + Sync>;

/// Clock reading the system's local date.
pub fn local_clock() -> Clock {
    Box::new(|| Local::now().date_naive())
}

/// Drives a [`Registry`] from a timer.
pub struct Scheduler {
    registry: Arc<RwLock<Registry>>,
    tick: Duration,
}

impl Scheduler {
    /// Create a scheduler ticking every `tick`.
    pub fn new(registry: Registry, tick: Duration) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            tick,
        }
    }

    /// Shared handle to the registry, for readers outside the loop.
    pub fn registry(&self) -> Arc<RwLock<Registry>> {
        Arc::clone(&self.registry)
    }

    /// Refresh all schedules for `today` and return what changed.
    pub async fn tick(&self, today: NaiveDate) -> Vec<ScheduleSnapshot> {
        self.registry.write().await.refresh_all(today)
    }

    /// Latest state of every schedule.
    pub async fn snapshots(&self) -> Vec<ScheduleSnapshot> {
        self.registry.read().await.snapshots()
    }

    /// Run until `shutdown_rx` turns true.
    pub async fn run(
        &self,
        mut shutdown_rx: watch::Receiver<bool>,
        clock: Clock,
        on_change: ChangeHandler,
    ) {
        info!(tick_secs = self.tick.as_secs(), "scheduler starting");

        loop {
            if *shutdown_rx.borrow() {
                info!("scheduler shutting down");
                break;
            }

            let today = clock();
            let changed = self.tick(today).await;
            if !changed.is_empty() {
                debug!(%today, count = changed.len(), "schedules changed");
            }
            for snapshot in &changed {
                on_change(snapshot);
            }

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("scheduler received shutdown signal");
                    }
                }
                _ = sleep(self.tick) => {}
            }
        }

        info!("scheduler shut down gracefully");
    }
}
