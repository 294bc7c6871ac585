//! Pourtide orchestrator
//!
//! Accumulates elapsed time and, once the configured interval has passed,
//! fans out one logical tick to every sub-scheduler in a fixed order:
//! hellgate, zone registry, then the ancillary jobs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ConfigError, SchedulerConfig};
use crate::game::dungeon::{DungeonManager, ZoneInfo, ZoneTier};
use crate::game::hellgate::{EventState, HellgateManager, HellgateStatus, Transition};
#[cfg(feature = "radiation")]
use crate::game::radiation::RadiationManager;
use crate::game::vitae::VitaeManager;
use crate::metrics::{state_code, Metrics};
use crate::util::accumulator::Accumulator;
use crate::world::WorldGateway;

/// What a single fan-out did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    /// Time accumulated since the previous fan-out
    pub elapsed: Duration,
    pub hellgate: Option<Transition>,
    pub tier: ZoneTier,
    pub vitae_reset: bool,
    pub radiation_hits: usize,
}

/// Combined status served at `/status`
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub shut_down: bool,
    pub hellgate: HellgateStatus,
    pub tier: ZoneTier,
    pub active_zones: Vec<ZoneInfo>,
}

/// Top-level scheduler owning every sub-scheduler
pub struct PourtideManager {
    tick_interval: Duration,
    world: Arc<dyn WorldGateway>,
    hellgate: Arc<HellgateManager>,
    dungeon: Arc<DungeonManager>,
    vitae: Arc<VitaeManager>,
    #[cfg(feature = "radiation")]
    radiation: Option<RadiationManager>,
    metrics: Arc<Metrics>,
    /// Serialization point: held for the whole accumulate-and-fan-out step
    worker: Mutex<Accumulator>,
    shut_down: AtomicBool,
}

impl PourtideManager {
    /// Validate the configuration and build every sub-scheduler
    pub fn new(
        config: &SchedulerConfig,
        world: Arc<dyn WorldGateway>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        info!("Initializing HellgateManager...");
        let hellgate = Arc::new(HellgateManager::new(&config.hellgate, world.clone())?);

        info!("Initializing DungeonManager...");
        let dungeon = Arc::new(DungeonManager::new(&config.dungeon, world.clone()));

        info!("Initializing VitaeManager...");
        let vitae = Arc::new(VitaeManager::new(&config.vitae, world.clone()));

        #[cfg(feature = "radiation")]
        let radiation = if config.radiation_enabled {
            info!("Initializing RadiationManager...");
            Some(RadiationManager::new(world.clone(), dungeon.clone()))
        } else {
            None
        };

        metrics
            .active_zones
            .store(dungeon.active_count() as u64, Ordering::Relaxed);

        Ok(Self {
            tick_interval: config.tick_interval,
            world,
            hellgate,
            dungeon,
            vitae,
            #[cfg(feature = "radiation")]
            radiation,
            metrics,
            worker: Mutex::new(Accumulator::started()),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn hellgate(&self) -> &Arc<HellgateManager> {
        &self.hellgate
    }

    pub fn dungeon(&self) -> &Arc<DungeonManager> {
        &self.dungeon
    }

    pub fn vitae(&self) -> &Arc<VitaeManager> {
        &self.vitae
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Feed elapsed wall-clock time. Fans out once the interval is reached
    /// and returns what the fan-out did.
    pub fn tick(&self, elapsed: Duration) -> Option<FanOut> {
        let mut worker = self.worker.lock();
        if self.is_shut_down() {
            return None;
        }

        worker.advance(elapsed);
        if !worker.has_reached(self.tick_interval) {
            return None;
        }

        let accumulated = worker.elapsed();
        let started = Instant::now();
        let report = self.fan_out(accumulated);
        worker.restart();

        self.metrics.record_fan_out_time(started.elapsed());
        self.record(&report);
        Some(report)
    }

    fn fan_out(&self, elapsed: Duration) -> FanOut {
        debug!("Pourtide fan-out after {}s", elapsed.as_secs());

        let hellgate = self.hellgate.tick(elapsed);
        if let Some(transition) = hellgate {
            info!("Hellgate {:?} -> {:?}", transition.from, transition.to);
        }

        let tier = self.dungeon.tick();
        let vitae_reset = self.vitae.tick(elapsed);

        #[cfg(feature = "radiation")]
        let radiation_hits = self.radiation.as_ref().map_or(0, |r| r.tick());
        #[cfg(not(feature = "radiation"))]
        let radiation_hits = 0;

        FanOut {
            elapsed,
            hellgate,
            tier,
            vitae_reset,
            radiation_hits,
        }
    }

    fn record(&self, report: &FanOut) {
        let m = &self.metrics;
        if let Some(transition) = report.hellgate {
            match transition.to {
                EventState::Open => m.hellgate_openings.fetch_add(1, Ordering::Relaxed),
                EventState::Closed => m.hellgate_closings.fetch_add(1, Ordering::Relaxed),
                EventState::Shutdown => 0,
            };
        }
        if report.vitae_reset {
            m.vitae_resets.fetch_add(1, Ordering::Relaxed);
        }
        m.radiation_hits
            .fetch_add(report.radiation_hits as u64, Ordering::Relaxed);
        m.online_population
            .store(self.world.online_population() as u64, Ordering::Relaxed);
        self.record_gauges();
    }

    fn record_gauges(&self) {
        let m = &self.metrics;
        m.hellgate_state
            .store(state_code(self.hellgate.state()), Ordering::Relaxed);
        m.hellgate_players
            .store(self.hellgate.player_count() as u64, Ordering::Relaxed);
        m.hellgate_portals
            .store(self.hellgate.live_portal_count() as u64, Ordering::Relaxed);
        m.active_zones
            .store(self.dungeon.active_count() as u64, Ordering::Relaxed);
    }

    /// Host-initiated teardown. Shuts the hellgate down and freezes all
    /// further tick processing. Not revocable.
    pub fn shutdown(&self) {
        let _worker = self.worker.lock();
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Pourtide shutting down");
        self.hellgate.shutdown();
        self.record_gauges();
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            shut_down: self.is_shut_down(),
            hellgate: self.hellgate.status(),
            tier: self.dungeon.current_tier(),
            active_zones: self.dungeon.active_zones(),
        }
    }

    pub fn status_json(&self) -> String {
        serde_json::to_string_pretty(&self.status()).unwrap_or_else(|_| "{}".to_string())
    }
}
