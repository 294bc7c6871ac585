//! Radiation: damage over time for everyone outside an active XP zone

use std::sync::Arc;

use tracing::debug;

use crate::game::constants::radiation::DAMAGE_DIVISOR;
use crate::game::dungeon::DungeonManager;
use crate::world::WorldGateway;

pub struct RadiationManager {
    world: Arc<dyn WorldGateway>,
    zones: Arc<DungeonManager>,
}

impl RadiationManager {
    pub fn new(world: Arc<dyn WorldGateway>, zones: Arc<DungeonManager>) -> Self {
        Self { world, zones }
    }

    /// Damage every online participant standing outside the active zones.
    /// Returns how many were hit.
    pub fn tick(&self) -> usize {
        let mut hits = 0;
        for participant in self.world.online_participants() {
            if self.zones.is_active(participant.landblock) {
                continue;
            }
            let amount = participant.max_health / DAMAGE_DIVISOR;
            if amount == 0 {
                continue;
            }
            self.world.apply_damage(&participant, amount);
            hits += 1;
        }
        debug!("Radiation tick hit {} participants", hits);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DungeonConfig;
    use crate::world::sim::SimWorld;
    use crate::world::Participant;

    #[test]
    fn test_damages_outside_zones_only() {
        let world = Arc::new(SimWorld::new());
        let zones = Arc::new(DungeonManager::new(&DungeonConfig::default(), world.clone()));
        let radiation = RadiationManager::new(world.clone(), zones);

        let mut safe = Participant::new(1, "Safe");
        safe.landblock = 0x0104;
        safe.max_health = 200;
        let mut exposed = Participant::new(2, "Exposed");
        exposed.landblock = 0xA9B4;
        exposed.max_health = 200;
        world.add_participant(safe);
        world.add_participant(exposed);

        assert_eq!(radiation.tick(), 1);
        assert_eq!(world.damage(), vec![("Exposed".to_string(), 100)]);
    }

    #[test]
    fn test_upper_tier_zone_unsafe_at_low_population() {
        let world = Arc::new(SimWorld::new());
        let zones = Arc::new(DungeonManager::new(&DungeonConfig::default(), world.clone()));
        let radiation = RadiationManager::new(world.clone(), zones.clone());

        let mut player = Participant::new(1, "Delver");
        player.landblock = 0x02F2;
        world.add_participant(player);

        assert_eq!(radiation.tick(), 1);

        world.set_population(30);
        zones.tick();
        assert_eq!(radiation.tick(), 0);
    }
}
