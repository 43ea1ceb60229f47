//! Daemon command: keeps every schedule fresh until interrupted.

use std::sync::Arc;
use std::time::Duration;

use binday_scheduler::{ChangeHandler, Registry, Scheduler, local_clock};
use miette::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::display::SensorView;

/// Run the scheduler for `config` until Ctrl-C.
pub async fn run(config: AppConfig, tick: Duration) -> Result<()> {
    let registry = Registry::from_definitions(&config.definitions())
        .map_err(|e| miette::miette!("invalid schedules: {}", e))?;

    for (name, problem) in registry.problems() {
        warn!(schedule = name, error = %problem, "schedule will report no date");
    }

    let scheduler = Scheduler::new(registry, tick);

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle shutdown signals
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let config = Arc::new(config);
    let on_change: ChangeHandler = Box::new(move |snapshot| {
        let Some(sensor) = config.sensor(&snapshot.name) else {
            return;
        };
        let view = SensorView::new(snapshot, sensor);
        info!(
            schedule = %view.name,
            next_date = view.next_date.as_deref().unwrap_or("-"),
            days = ?view.days,
            tier = ?view.tier,
            state = %view.state,
            icon = %view.icon,
            "schedule updated"
        );
    });

    scheduler.run(shutdown_rx, local_clock(), on_change).await;
    Ok(())
}
