//! Vitae removal gem handout with a periodic reset

use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::VitaeConfig;
use crate::util::accumulator::Accumulator;
use crate::world::{CatalogId, Participant, WorldGateway};

/// Result of a gem request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GemGrant {
    Granted { handed_out: u32 },
    LimitReached,
    InventoryFull,
}

/// Tracks how many gems each player received in the current window
pub struct VitaeManager {
    world: Arc<dyn WorldGateway>,
    reset_window: Duration,
    max_gems: u32,
    gem_catalog_id: CatalogId,
    handed_out: RwLock<HashMap<String, u32>>,
    interval: Mutex<Accumulator>,
}

impl VitaeManager {
    pub fn new(config: &VitaeConfig, world: Arc<dyn WorldGateway>) -> Self {
        Self {
            world,
            reset_window: config.reset_window,
            max_gems: config.max_gems,
            gem_catalog_id: config.gem_catalog_id,
            handed_out: RwLock::new(HashMap::new()),
            interval: Mutex::new(Accumulator::started()),
        }
    }

    /// Advance the window; clears all counters once it has elapsed.
    /// Returns true when a reset happened.
    pub fn tick(&self, elapsed: Duration) -> bool {
        let mut interval = self.interval.lock();
        interval.advance(elapsed);
        if !interval.has_reached(self.reset_window) {
            return false;
        }

        let cleared = {
            let mut handed_out = self.handed_out.write();
            let count = handed_out.len();
            handed_out.clear();
            count
        };
        interval.restart();
        info!("Vitae gem counters reset ({} players)", cleared);
        true
    }

    /// Hand a gem to the participant unless they hit the per-window limit
    pub fn grant_removal_gem(&self, participant: &Participant) -> GemGrant {
        {
            let mut handed_out = self.handed_out.write();
            let count = handed_out.entry(participant.key().to_string()).or_insert(0);
            if *count >= self.max_gems {
                debug!("{} reached the vitae gem limit", participant.name);
                return GemGrant::LimitReached;
            }
            *count += 1;
        }

        match self.world.give_item(participant, self.gem_catalog_id) {
            Ok(_) => GemGrant::Granted {
                handed_out: self.handed_out_to(&participant.name),
            },
            Err(e) => {
                warn!("Vitae gem for {} not delivered: {}", participant.name, e);
                // Failed handouts do not count
                if let Some(count) = self.handed_out.write().get_mut(participant.key()) {
                    *count = count.saturating_sub(1);
                }
                GemGrant::InventoryFull
            }
        }
    }

    /// Gems handed to this player in the current window
    pub fn handed_out_to(&self, name: &str) -> u32 {
        self.handed_out.read().get(name).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::SimWorld;

    fn setup() -> (Arc<SimWorld>, VitaeManager) {
        let world = Arc::new(SimWorld::new());
        let manager = VitaeManager::new(&VitaeConfig::default(), world.clone());
        (world, manager)
    }

    #[test]
    fn test_limit_per_window() {
        let (world, manager) = setup();
        let alice = Participant::new(1, "Alice");

        assert_eq!(manager.grant_removal_gem(&alice), GemGrant::Granted { handed_out: 1 });
        assert_eq!(manager.grant_removal_gem(&alice), GemGrant::Granted { handed_out: 2 });
        assert_eq!(manager.grant_removal_gem(&alice), GemGrant::Granted { handed_out: 3 });
        assert_eq!(manager.grant_removal_gem(&alice), GemGrant::LimitReached);

        assert_eq!(world.items().len(), 3);
        assert!(world.items().iter().all(|(_, id)| *id == 5000101));
    }

    #[test]
    fn test_reset_after_window() {
        let (_, manager) = setup();
        let alice = Participant::new(1, "Alice");
        for _ in 0..3 {
            manager.grant_removal_gem(&alice);
        }

        assert!(!manager.tick(Duration::from_secs(119 * 60)));
        assert_eq!(manager.grant_removal_gem(&alice), GemGrant::LimitReached);

        assert!(manager.tick(Duration::from_secs(60)));
        assert_eq!(manager.handed_out_to("Alice"), 0);
        assert_eq!(manager.grant_removal_gem(&alice), GemGrant::Granted { handed_out: 1 });
    }

    #[test]
    fn test_failed_delivery_not_counted() {
        let (world, manager) = setup();
        let bob = Participant::new(2, "Bob");
        world.fill_inventory("Bob");

        assert_eq!(manager.grant_removal_gem(&bob), GemGrant::InventoryFull);
        assert_eq!(manager.handed_out_to("Bob"), 0);
    }
}
