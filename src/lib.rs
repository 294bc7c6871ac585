//! Pourtide Server Library
//!
//! Tick-driven world event schedulers for a game server: the Hellgate event
//! state machine, the population-tiered XP zone registry and the ancillary
//! vitae and radiation jobs, composed by a single orchestrator.
//!
//! The hosting server owns the clock and calls [`game::pourtide::PourtideManager::tick`];
//! everything the schedulers do to the world goes through [`world::WorldGateway`].
//!
//! # Features
//!
//! - `radiation` - Radiation damage job, still opt-in at runtime via `RADIATION_ENABLED` (enabled by default)

pub mod config;
pub mod util;
pub mod game;
pub mod world;
pub mod metrics;
