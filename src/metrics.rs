//! Prometheus-compatible metrics endpoint
//!
//! Exposes scheduler metrics in Prometheus format plus a JSON status view of
//! the hellgate and zone registry.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::game::hellgate::EventState;
use crate::game::pourtide::PourtideManager;

/// Metrics registry for the scheduler
#[derive(Debug)]
pub struct Metrics {
    // Fan-out timing (microseconds)
    pub fan_out_time_us: AtomicU64,
    pub fan_out_time_p95_us: AtomicU64,
    pub fan_out_time_max_us: AtomicU64,
    pub fan_out_count: AtomicU64,

    // Hellgate (state: 0=Closed, 1=Open, 2=Shutdown)
    pub hellgate_state: AtomicU64,
    pub hellgate_players: AtomicU64,
    pub hellgate_portals: AtomicU64,
    pub hellgate_openings: AtomicU64,
    pub hellgate_closings: AtomicU64,

    // Zone registry
    pub active_zones: AtomicU64,
    pub online_population: AtomicU64,

    // Ancillary jobs
    pub vitae_resets: AtomicU64,
    pub radiation_hits: AtomicU64,

    start_time: Instant,

    // Rolling fan-out times for percentile calculation
    fan_out_history: RwLock<VecDeque<u64>>,
}

/// JSON form of the registry
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub fan_out_count: u64,
    pub fan_out_time_p95_us: u64,
    pub hellgate_state: &'static str,
    pub hellgate_players: u64,
    pub hellgate_portals: u64,
    pub hellgate_openings: u64,
    pub hellgate_closings: u64,
    pub active_zones: u64,
    pub online_population: u64,
    pub vitae_resets: u64,
    pub radiation_hits: u64,
    pub uptime_seconds: u64,
}

pub fn state_code(state: EventState) -> u64 {
    match state {
        EventState::Closed => 0,
        EventState::Open => 1,
        EventState::Shutdown => 2,
    }
}

fn state_name(code: u64) -> &'static str {
    match code {
        0 => "closed",
        1 => "open",
        _ => "shutdown",
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            fan_out_time_us: AtomicU64::new(0),
            fan_out_time_p95_us: AtomicU64::new(0),
            fan_out_time_max_us: AtomicU64::new(0),
            fan_out_count: AtomicU64::new(0),
            hellgate_state: AtomicU64::new(0),
            hellgate_players: AtomicU64::new(0),
            hellgate_portals: AtomicU64::new(0),
            hellgate_openings: AtomicU64::new(0),
            hellgate_closings: AtomicU64::new(0),
            active_zones: AtomicU64::new(0),
            online_population: AtomicU64::new(0),
            vitae_resets: AtomicU64::new(0),
            radiation_hits: AtomicU64::new(0),
            start_time: Instant::now(),
            fan_out_history: RwLock::new(VecDeque::with_capacity(256)),
        }
    }

    /// Record a fan-out duration and update percentiles
    pub fn record_fan_out_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.fan_out_time_us.store(us, Ordering::Relaxed);
        self.fan_out_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.fan_out_history.write();
        history.push_back(us);
        while history.len() > 256 {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            self.fan_out_time_p95_us
                .store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.fan_out_time_max_us
                .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("pourtide_fan_out_time_microseconds", "Last fan-out duration", "gauge",
            self.fan_out_time_us.load(Ordering::Relaxed));
        metric!("pourtide_fan_out_time_p95_microseconds", "95th percentile fan-out duration", "gauge",
            self.fan_out_time_p95_us.load(Ordering::Relaxed));
        metric!("pourtide_fan_out_time_max_microseconds", "Maximum fan-out duration", "gauge",
            self.fan_out_time_max_us.load(Ordering::Relaxed));
        metric!("pourtide_fan_out_total", "Logical ticks fanned out", "counter",
            self.fan_out_count.load(Ordering::Relaxed));

        metric!("pourtide_hellgate_state", "Hellgate state (0=Closed, 1=Open, 2=Shutdown)", "gauge",
            self.hellgate_state.load(Ordering::Relaxed));
        metric!("pourtide_hellgate_players", "Participants inside the hellgate", "gauge",
            self.hellgate_players.load(Ordering::Relaxed));
        metric!("pourtide_hellgate_portals", "Live hellgate portals", "gauge",
            self.hellgate_portals.load(Ordering::Relaxed));
        metric!("pourtide_hellgate_openings_total", "Hellgate openings", "counter",
            self.hellgate_openings.load(Ordering::Relaxed));
        metric!("pourtide_hellgate_closings_total", "Hellgate closings", "counter",
            self.hellgate_closings.load(Ordering::Relaxed));

        metric!("pourtide_active_zones", "Active XP zones", "gauge",
            self.active_zones.load(Ordering::Relaxed));
        metric!("pourtide_online_population", "Online population at last fan-out", "gauge",
            self.online_population.load(Ordering::Relaxed));

        metric!("pourtide_vitae_resets_total", "Vitae counter resets", "counter",
            self.vitae_resets.load(Ordering::Relaxed));
        metric!("pourtide_radiation_hits_total", "Radiation damage applications", "counter",
            self.radiation_hits.load(Ordering::Relaxed));

        metric!("pourtide_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fan_out_count: self.fan_out_count.load(Ordering::Relaxed),
            fan_out_time_p95_us: self.fan_out_time_p95_us.load(Ordering::Relaxed),
            hellgate_state: state_name(self.hellgate_state.load(Ordering::Relaxed)),
            hellgate_players: self.hellgate_players.load(Ordering::Relaxed),
            hellgate_portals: self.hellgate_portals.load(Ordering::Relaxed),
            hellgate_openings: self.hellgate_openings.load(Ordering::Relaxed),
            hellgate_closings: self.hellgate_closings.load(Ordering::Relaxed),
            active_zones: self.active_zones.load(Ordering::Relaxed),
            online_population: self.online_population.load(Ordering::Relaxed),
            vitae_resets: self.vitae_resets.load(Ordering::Relaxed),
            radiation_hits: self.radiation_hits.load(Ordering::Relaxed),
            uptime_seconds: self.uptime_seconds(),
        }
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(
    metrics: Arc<Metrics>,
    scheduler: Arc<PourtideManager>,
    port: u16,
) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();
        let scheduler = scheduler.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    // Longer paths first, "GET /metrics" is a prefix of "GET /metrics/json"
                    let response = if request.starts_with("GET /metrics/json") {
                        http_response("application/json", &metrics.to_json())
                    } else if request.starts_with("GET /metrics") {
                        http_response("text/plain; version=0.0.4", &metrics.to_prometheus())
                    } else if request.starts_with("GET /status") {
                        http_response("application/json", &scheduler.status_json())
                    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
                        http_response("text/plain", "OK")
                    } else {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                            .to_string()
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.fan_out_count.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.hellgate_state.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_fan_out_time() {
        let metrics = Metrics::new();

        for i in 0..100 {
            metrics.record_fan_out_time(Duration::from_micros(100 + i * 10));
        }

        assert_eq!(metrics.fan_out_count.load(Ordering::Relaxed), 100);
        assert!(metrics.fan_out_time_p95_us.load(Ordering::Relaxed) > 0);
        assert_eq!(metrics.fan_out_time_max_us.load(Ordering::Relaxed), 1090);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.hellgate_players.store(7, Ordering::Relaxed);
        metrics.active_zones.store(5, Ordering::Relaxed);

        let output = metrics.to_prometheus();

        assert!(output.contains("pourtide_hellgate_players 7"));
        assert!(output.contains("pourtide_active_zones 5"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_json_format() {
        let metrics = Metrics::new();
        metrics
            .hellgate_state
            .store(state_code(EventState::Open), Ordering::Relaxed);

        let value: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(value["hellgate_state"], "open");
        assert_eq!(value["fan_out_count"], 0);
    }
}
