//! Population-tiered XP zone registry
//!
//! On every tick the online population selects a tier; the active set becomes
//! exactly the zones of that tier and every tier below it. There is no
//! hysteresis, a population hovering around a threshold churns every tick.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DungeonConfig;
use crate::world::WorldGateway;

/// Population bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ZoneTier {
    Small,
    Medium,
    Large,
}

/// An XP zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneInfo {
    pub landblock: u16,
    pub name: String,
    pub tier: ZoneTier,
}

/// Registry of active XP zones
pub struct DungeonManager {
    world: Arc<dyn WorldGateway>,
    medium_population: usize,
    large_population: usize,
    catalogue: Vec<ZoneInfo>,
    active: RwLock<HashMap<u16, ZoneInfo>>,
    tier: RwLock<ZoneTier>,
}

impl DungeonManager {
    /// Build the registry with the small tier already active
    pub fn new(config: &DungeonConfig, world: Arc<dyn WorldGateway>) -> Self {
        let catalogue = [
            (ZoneTier::Small, &config.small),
            (ZoneTier::Medium, &config.medium),
            (ZoneTier::Large, &config.large),
        ]
        .into_iter()
        .flat_map(|(tier, zones)| {
            zones.iter().map(move |zone| ZoneInfo {
                landblock: zone.landblock,
                name: zone.name.clone(),
                tier,
            })
        })
        .collect();

        let manager = Self {
            world,
            medium_population: config.medium_population,
            large_population: config.large_population,
            catalogue,
            active: RwLock::new(HashMap::new()),
            tier: RwLock::new(ZoneTier::Small),
        };
        manager.apply_tier(ZoneTier::Small);
        manager
    }

    /// Tier selected by a population count
    pub fn tier_for_population(&self, population: usize) -> ZoneTier {
        if population >= self.large_population {
            ZoneTier::Large
        } else if population >= self.medium_population {
            ZoneTier::Medium
        } else {
            ZoneTier::Small
        }
    }

    /// Recompute the active set from the current online population
    pub fn tick(&self) -> ZoneTier {
        let population = self.world.online_population();
        let target = self.tier_for_population(population);
        debug!("Dungeon tick: population={}, tier={:?}", population, target);
        self.apply_tier(target);
        target
    }

    /// Evict every zone above `target`, then add `target` and everything below
    pub fn apply_tier(&self, target: ZoneTier) {
        {
            let mut active = self.active.write();
            active.retain(|_, zone| zone.tier <= target);
            for zone in self.catalogue.iter().filter(|zone| zone.tier <= target) {
                active
                    .entry(zone.landblock)
                    .or_insert_with(|| zone.clone());
            }
        }

        let mut tier = self.tier.write();
        if *tier != target {
            info!("XP zones switched from {:?} to {:?} tier", *tier, target);
            *tier = target;
        }
    }

    pub fn current_tier(&self) -> ZoneTier {
        *self.tier.read()
    }

    /// Is this landblock an active XP zone
    pub fn is_active(&self, landblock: u16) -> bool {
        self.active.read().contains_key(&landblock)
    }

    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    /// Active zones, sorted by landblock
    pub fn active_zones(&self) -> Vec<ZoneInfo> {
        let mut zones: Vec<ZoneInfo> = self.active.read().values().cloned().collect();
        zones.sort_by_key(|zone| zone.landblock);
        zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::SimWorld;

    fn setup() -> (Arc<SimWorld>, DungeonManager) {
        let world = Arc::new(SimWorld::new());
        let manager = DungeonManager::new(&DungeonConfig::default(), world.clone());
        (world, manager)
    }

    #[test]
    fn test_starts_with_small_tier() {
        let (_, manager) = setup();
        assert_eq!(manager.current_tier(), ZoneTier::Small);
        assert_eq!(manager.active_count(), 4);
        assert!(manager.is_active(0x0104));
    }

    #[test]
    fn test_tier_thresholds() {
        let (_, manager) = setup();
        assert_eq!(manager.tier_for_population(0), ZoneTier::Small);
        assert_eq!(manager.tier_for_population(14), ZoneTier::Small);
        assert_eq!(manager.tier_for_population(15), ZoneTier::Medium);
        assert_eq!(manager.tier_for_population(29), ZoneTier::Medium);
        assert_eq!(manager.tier_for_population(30), ZoneTier::Large);
    }

    #[test]
    fn test_growth_is_superset() {
        let (world, manager) = setup();
        world.set_population(20);
        assert_eq!(manager.tick(), ZoneTier::Medium);
        assert_eq!(manager.active_count(), 5);
        assert!(manager.is_active(0x0103));

        world.set_population(35);
        assert_eq!(manager.tick(), ZoneTier::Large);
        assert_eq!(manager.active_count(), 6);
        assert!(manager.is_active(0x0104));
        assert!(manager.is_active(0x0103));
        assert!(manager.is_active(0x02F2));
    }

    #[test]
    fn test_demotion_evicts_upper_tiers() {
        let (world, manager) = setup();
        world.set_population(35);
        manager.tick();

        world.set_population(20);
        manager.tick();
        assert_eq!(manager.active_count(), 5);
        assert!(!manager.is_active(0x02F2));

        world.set_population(10);
        manager.tick();
        let names: Vec<String> = manager.active_zones().into_iter().map(|z| z.name).collect();
        assert_eq!(
            names,
            vec![
                "Ayan BSD".to_string(),
                "Mosswart Nest".to_string(),
                "Lin Citadel".to_string(),
                "Martine's Retreat".to_string(),
            ]
        );
    }

    #[test]
    fn test_repeated_tick_is_stable() {
        let (world, manager) = setup();
        world.set_population(20);
        manager.tick();
        let before = manager.active_zones();
        manager.tick();
        assert_eq!(manager.active_zones(), before);
    }
}
