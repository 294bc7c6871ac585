//! Fan-out benchmarks for the Pourtide scheduler
//!
//! Run with: cargo bench --bench tick

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pourtide_server::config::SchedulerConfig;
use pourtide_server::game::pourtide::PourtideManager;
use pourtide_server::metrics::Metrics;
use pourtide_server::world::sim::SimWorld;
use pourtide_server::world::{Participant, WorldGateway};
use rand::Rng;

/// Scheduler over a simulated world with `count` participants online
fn create_scheduler(count: u32, radiation: bool) -> (Arc<SimWorld>, PourtideManager) {
    let world = Arc::new(SimWorld::new());
    let mut rng = rand::thread_rng();

    for guid in 1..=count {
        let mut participant = Participant::new(guid, format!("Player{}", guid));
        participant.landblock = rng.gen_range(0x0100..0x0300);
        participant.max_health = rng.gen_range(100..400);
        world.add_participant(participant);
    }

    let config = SchedulerConfig {
        radiation_enabled: radiation,
        ..SchedulerConfig::default()
    };
    let scheduler = PourtideManager::new(&config, world.clone(), Arc::new(Metrics::new()))
        .expect("default config is valid");
    (world, scheduler)
}

/// One full fan-out at various online populations
fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    group.sample_size(50);

    for count in [10, 100, 500, 1000] {
        let (_, scheduler) = create_scheduler(count, true);
        let interval = scheduler.tick_interval();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("population", count), &count, |b, _| {
            b.iter(|| black_box(scheduler.tick(interval)))
        });
    }
    group.finish();
}

/// Sub-interval ticks only accumulate time
fn bench_accumulate(c: &mut Criterion) {
    let (_, scheduler) = create_scheduler(100, false);

    c.bench_function("accumulate_only", |b| {
        b.iter(|| black_box(scheduler.tick(Duration::from_nanos(1))))
    });
}

/// Zone registry flipping between the small and large tier
fn bench_tier_flip(c: &mut Criterion) {
    let (world, scheduler) = create_scheduler(0, false);
    let interval = scheduler.tick_interval();
    let mut large = false;

    c.bench_function("tier_flip", |b| {
        b.iter(|| {
            large = !large;
            world.set_population(if large { 35 } else { 5 });
            black_box(scheduler.tick(interval))
        })
    });
}

/// Join and leave on an open event
fn bench_roster(c: &mut Criterion) {
    let (world, scheduler) = create_scheduler(12, false);
    scheduler.tick(scheduler.tick_interval());
    let hellgate = scheduler.hellgate().clone();
    let players = world.online_participants();

    c.bench_function("roster_join_leave", |b| {
        b.iter(|| {
            for p in &players {
                black_box(hellgate.add_player(p));
            }
            for p in &players {
                black_box(hellgate.remove_player(p));
            }
            world.clear_broadcasts();
        })
    });
}

criterion_group!(
    benches,
    bench_fan_out,
    bench_accumulate,
    bench_tier_flip,
    bench_roster,
);

criterion_main!(benches);
