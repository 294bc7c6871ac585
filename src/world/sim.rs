//! In-memory world used by the host binary and tests
//!
//! Records every verb issued by the schedulers and lets callers inject
//! collaborator failures.

use std::sync::atomic::{AtomicU32, Ordering};

use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;

use crate::game::location::Position;
use crate::world::{
    CatalogId, ChatCategory, EntityHandle, GatewayError, Participant, RecallPoint, WorldGateway,
};

/// Entity as tracked by the simulated world
#[derive(Debug, Clone)]
pub struct SimEntity {
    pub catalog_id: CatalogId,
    pub location: Position,
    pub in_world: bool,
    pub expired: bool,
}

#[derive(Default)]
struct SimState {
    entities: HashMap<EntityHandle, SimEntity>,
    deleted: Vec<EntityHandle>,
    online: Vec<Participant>,
    population_override: Option<usize>,
    broadcasts: Vec<(String, ChatCategory)>,
    teleports: Vec<(String, RecallPoint)>,
    damage: Vec<(String, u32)>,
    items: Vec<(String, CatalogId)>,
    failing_catalog_ids: HashSet<CatalogId>,
    failing_teleports: HashSet<String>,
    full_inventories: HashSet<String>,
}

/// Recording world gateway
pub struct SimWorld {
    next_handle: AtomicU32,
    state: Mutex<SimState>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU32::new(0x8000_0001),
            state: Mutex::new(SimState::default()),
        }
    }

    /// Bring a participant online (replaces any snapshot with the same name)
    pub fn add_participant(&self, participant: Participant) {
        let mut state = self.state.lock();
        state.online.retain(|p| p.name != participant.name);
        state.online.push(participant);
    }

    /// Take a participant offline
    pub fn remove_participant(&self, name: &str) {
        self.state.lock().online.retain(|p| p.name != name);
    }

    /// Update the host-tracked "inside the hellgate" flag
    pub fn set_in_hellgate(&self, name: &str, inside: bool) {
        let mut state = self.state.lock();
        if let Some(p) = state.online.iter_mut().find(|p| p.name == name) {
            p.in_hellgate = inside;
        }
    }

    /// Report `count` as the online population regardless of the online list
    pub fn set_population(&self, count: usize) {
        self.state.lock().population_override = Some(count);
    }

    /// Mark an entity's lifespan as spent
    pub fn expire_entity(&self, handle: EntityHandle) {
        if let Some(entity) = self.state.lock().entities.get_mut(&handle) {
            entity.expired = true;
        }
    }

    /// Make every `create_entity` for this template fail
    pub fn fail_creation(&self, catalog_id: CatalogId) {
        self.state.lock().failing_catalog_ids.insert(catalog_id);
    }

    /// Make teleports of this participant fail
    pub fn fail_teleport(&self, name: &str) {
        self.state.lock().failing_teleports.insert(name.to_string());
    }

    /// Make item handouts to this participant fail
    pub fn fill_inventory(&self, name: &str) {
        self.state.lock().full_inventories.insert(name.to_string());
    }

    pub fn broadcasts(&self) -> Vec<(String, ChatCategory)> {
        self.state.lock().broadcasts.clone()
    }

    /// Broadcast texts only
    pub fn messages(&self) -> Vec<String> {
        self.state
            .lock()
            .broadcasts
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }

    pub fn clear_broadcasts(&self) {
        self.state.lock().broadcasts.clear();
    }

    pub fn teleports(&self) -> Vec<(String, RecallPoint)> {
        self.state.lock().teleports.clone()
    }

    pub fn damage(&self) -> Vec<(String, u32)> {
        self.state.lock().damage.clone()
    }

    pub fn items(&self) -> Vec<(String, CatalogId)> {
        self.state.lock().items.clone()
    }

    pub fn deleted(&self) -> Vec<EntityHandle> {
        self.state.lock().deleted.clone()
    }

    /// Entities created and not deleted
    pub fn live_entities(&self) -> Vec<(EntityHandle, SimEntity)> {
        let mut live: Vec<_> = self
            .state
            .lock()
            .entities
            .iter()
            .map(|(handle, entity)| (*handle, entity.clone()))
            .collect();
        live.sort_by_key(|(handle, _)| *handle);
        live
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldGateway for SimWorld {
    fn create_entity(
        &self,
        catalog_id: CatalogId,
        location: &Position,
    ) -> Result<EntityHandle, GatewayError> {
        let mut state = self.state.lock();
        if state.failing_catalog_ids.contains(&catalog_id) {
            return Err(GatewayError::EntityCreationFailed(catalog_id));
        }

        let handle = EntityHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        state.entities.insert(
            handle,
            SimEntity {
                catalog_id,
                location: *location,
                in_world: false,
                expired: false,
            },
        );
        Ok(handle)
    }

    fn enter_world(&self, handle: EntityHandle) {
        if let Some(entity) = self.state.lock().entities.get_mut(&handle) {
            entity.in_world = true;
        }
    }

    fn delete_entity(&self, handle: EntityHandle) {
        let mut state = self.state.lock();
        if state.entities.remove(&handle).is_some() {
            state.deleted.push(handle);
        }
    }

    fn teleport(
        &self,
        participant: &Participant,
        destination: RecallPoint,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        if !state.online.iter().any(|p| p.name == participant.name) {
            return Err(GatewayError::ParticipantOffline(participant.name.clone()));
        }
        if state.failing_teleports.contains(&participant.name) {
            return Err(GatewayError::NoRecallPoint(participant.name.clone()));
        }

        state.teleports.push((participant.name.clone(), destination));
        if let Some(p) = state.online.iter_mut().find(|p| p.name == participant.name) {
            p.in_hellgate = false;
        }
        Ok(())
    }

    fn broadcast(&self, message: &str, category: ChatCategory) {
        self.state
            .lock()
            .broadcasts
            .push((message.to_string(), category));
    }

    fn online_participants(&self) -> Vec<Participant> {
        self.state.lock().online.clone()
    }

    fn online_population(&self) -> usize {
        let state = self.state.lock();
        state.population_override.unwrap_or(state.online.len())
    }

    fn is_entity_lifespan_expired(&self, handle: EntityHandle) -> bool {
        // Entities deleted behind our back count as expired
        self.state
            .lock()
            .entities
            .get(&handle)
            .map_or(true, |entity| entity.expired)
    }

    fn apply_damage(&self, participant: &Participant, amount: u32) {
        self.state
            .lock()
            .damage
            .push((participant.name.clone(), amount));
    }

    fn give_item(
        &self,
        participant: &Participant,
        catalog_id: CatalogId,
    ) -> Result<EntityHandle, GatewayError> {
        let mut state = self.state.lock();
        if state.full_inventories.contains(&participant.name) {
            return Err(GatewayError::InventoryFull(participant.name.clone()));
        }
        state.items.push((participant.name.clone(), catalog_id));
        Ok(EntityHandle(self.next_handle.fetch_add(1, Ordering::Relaxed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Position {
        Position::new(0xA9B4001A, [1.0, 2.0, 3.0], [1.0, 0.0, 0.0, 0.0])
    }

    #[test]
    fn test_create_enter_delete() {
        let world = SimWorld::new();
        let handle = world.create_entity(3000100, &origin()).unwrap();
        assert!(!world.live_entities()[0].1.in_world);

        world.enter_world(handle);
        assert!(world.live_entities()[0].1.in_world);

        world.delete_entity(handle);
        world.delete_entity(handle);
        assert!(world.live_entities().is_empty());
        assert_eq!(world.deleted(), vec![handle]);
    }

    #[test]
    fn test_creation_failure() {
        let world = SimWorld::new();
        world.fail_creation(3000100);

        let result = world.create_entity(3000100, &origin());
        assert_eq!(result, Err(GatewayError::EntityCreationFailed(3000100)));
        assert!(world.create_entity(3000101, &origin()).is_ok());
    }

    #[test]
    fn test_teleport_offline_participant() {
        let world = SimWorld::new();
        let ghost = Participant::new(1, "Ghost");

        let result = world.teleport(&ghost, RecallPoint::Sanctuary);
        assert!(matches!(result, Err(GatewayError::ParticipantOffline(_))));
        assert!(world.teleports().is_empty());
    }

    #[test]
    fn test_teleport_clears_zone_flag() {
        let world = SimWorld::new();
        let mut player = Participant::new(1, "Alice");
        player.in_hellgate = true;
        world.add_participant(player.clone());

        world.teleport(&player, RecallPoint::Sanctuary).unwrap();
        assert!(!world.online_participants()[0].in_hellgate);
    }

    #[test]
    fn test_population_override() {
        let world = SimWorld::new();
        world.add_participant(Participant::new(1, "Alice"));
        assert_eq!(world.online_population(), 1);

        world.set_population(42);
        assert_eq!(world.online_population(), 42);
    }

    #[test]
    fn test_unknown_entity_is_expired() {
        let world = SimWorld::new();
        assert!(world.is_entity_lifespan_expired(EntityHandle(7)));

        let handle = world.create_entity(1, &origin()).unwrap();
        assert!(!world.is_entity_lifespan_expired(handle));
        world.expire_entity(handle);
        assert!(world.is_entity_lifespan_expired(handle));
    }
}
