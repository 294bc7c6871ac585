use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pourtide_server::config::SchedulerConfig;
use pourtide_server::game::pourtide::PourtideManager;
use pourtide_server::game::tick_source::spawn_tick_source;
use pourtide_server::metrics::{self, Metrics};
use pourtide_server::world::sim::SimWorld;
use pourtide_server::world::Participant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Pourtide Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = SchedulerConfig::load_or_default();
    info!(
        "Configuration loaded: tick={}s, hellgate lifetime={}s, {} portal slots over {} sites",
        config.tick_interval.as_secs(),
        config.hellgate.event_lifetime.as_secs(),
        config.hellgate.slot_count(),
        config.hellgate.sites.len()
    );

    // Stand-in world until the scheduler is linked into a world server
    let world = Arc::new(SimWorld::new());
    let population: u32 = std::env::var("SIM_POPULATION")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);
    for guid in 0..population {
        world.add_participant(Participant::new(guid + 1, format!("Player{}", guid + 1)));
    }

    let metrics = Arc::new(Metrics::new());

    // Configuration errors are fatal
    let scheduler = match PourtideManager::new(&config, world.clone(), metrics.clone()) {
        Ok(scheduler) => Arc::new(scheduler),
        Err(e) => {
            error!("Invalid scheduler configuration: {}", e);
            return Err(e.into());
        }
    };

    let metrics_port = config.metrics_port;
    let metrics_scheduler = scheduler.clone();
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics, metrics_scheduler, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    let tick_source = spawn_tick_source(scheduler.clone(), Duration::from_secs(1));

    info!("Scheduler running, hellgate {:?}", scheduler.hellgate().state());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    scheduler.shutdown();
    if let Err(e) = tick_source.await {
        error!("Tick source ended abnormally: {}", e);
    }

    info!("Server stopped");
    Ok(())
}
