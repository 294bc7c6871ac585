//! Tick source - drives the orchestrator from a tokio interval

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::game::pourtide::PourtideManager;

/// Start the scheduler loop background task.
///
/// Every `cadence` the measured wall-clock time since the previous wake-up is
/// handed to the orchestrator, which decides on its own when to fan out.
/// The task ends once the orchestrator has been shut down.
pub fn spawn_tick_source(scheduler: Arc<PourtideManager>, cadence: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Tick source started at {:?} cadence", cadence);
        // First tick of a tokio interval completes immediately
        ticker.tick().await;
        let mut last = Instant::now();

        loop {
            ticker.tick().await;
            if scheduler.is_shut_down() {
                break;
            }

            let now = Instant::now();
            let elapsed = now.duration_since(last);
            last = now;

            if let Some(report) = scheduler.tick(elapsed) {
                debug!(
                    "Fan-out: hellgate={:?}, tier={:?}, vitae_reset={}",
                    report.hellgate, report.tier, report.vitae_reset
                );
            }
        }

        info!("Tick source stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::game::hellgate::EventState;
    use crate::metrics::Metrics;
    use crate::world::sim::SimWorld;

    #[tokio::test(start_paused = true)]
    async fn test_tick_source_drives_scheduler() {
        let config = SchedulerConfig {
            tick_interval: Duration::from_secs(60),
            ..SchedulerConfig::default()
        };
        let scheduler = Arc::new(
            PourtideManager::new(&config, Arc::new(SimWorld::new()), Arc::new(Metrics::new()))
                .unwrap(),
        );

        let handle = spawn_tick_source(scheduler.clone(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(scheduler.hellgate().state(), EventState::Closed);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(scheduler.hellgate().state(), EventState::Open);

        scheduler.shutdown();
        tokio_test::assert_ok!(handle.await);
    }
}
