//! World collaborator contract
//!
//! Everything the schedulers need from the hosting world server goes through
//! [`WorldGateway`]. Entity creation, teleports, chat and population queries
//! are implemented elsewhere; the schedulers only issue the verbs and treat
//! them as fire-and-forget.

pub mod entity;
pub mod sim;

use std::fmt;

use serde::Serialize;

use crate::game::location::Position;

/// Weenie class id of a world object template
pub type CatalogId = u32;

/// Opaque reference to a spawned world entity.
///
/// The world owns the entity; holders of a handle only keep a back-reference
/// for deletion and expiry queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityHandle(pub u32);

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Named recall destinations a participant can be sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallPoint {
    /// Lifestone the participant is bound to
    Sanctuary,
}

/// Chat channel used for broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatCategory {
    WorldBroadcast,
}

/// Snapshot of an online participant as seen by the host world
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub guid: u32,
    pub name: String,
    /// Landblock the participant currently stands in
    pub landblock: u16,
    pub max_health: u32,
    /// Host-tracked flag: participant is physically inside the hellgate zone
    pub in_hellgate: bool,
    pub sanctuary: Option<Position>,
}

impl Participant {
    pub fn new(guid: u32, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
            landblock: 0,
            max_health: 100,
            in_hellgate: false,
            sanctuary: None,
        }
    }

    /// Roster key: names are unique per server
    pub fn key(&self) -> &str {
        &self.name
    }
}

/// Collaborator failures. Always recoverable: callers log and skip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to create entity from catalog id {0}")]
    EntityCreationFailed(CatalogId),
    #[error("participant {0} is offline")]
    ParticipantOffline(String),
    #[error("participant {0} has no recall point")]
    NoRecallPoint(String),
    #[error("inventory of {0} is full")]
    InventoryFull(String),
}

/// Verbs the schedulers consume from the world server.
///
/// Implementations must be safe to call from the tick context and must not
/// call back into the schedulers: some verbs are issued while a scheduler
/// holds its roster or portal locks.
pub trait WorldGateway: Send + Sync {
    /// Instantiate a world object at `location`. Not yet visible to players.
    fn create_entity(
        &self,
        catalog_id: CatalogId,
        location: &Position,
    ) -> Result<EntityHandle, GatewayError>;

    /// Publish a created entity into the world
    fn enter_world(&self, handle: EntityHandle);

    /// Remove an entity. Deleting an unknown or already gone handle is a no-op.
    fn delete_entity(&self, handle: EntityHandle);

    /// Relocate a participant. Safe to call for a participant who already left.
    fn teleport(&self, participant: &Participant, destination: RecallPoint)
        -> Result<(), GatewayError>;

    /// Send a text notice to every connected participant
    fn broadcast(&self, message: &str, category: ChatCategory);

    fn online_participants(&self) -> Vec<Participant>;

    fn online_population(&self) -> usize;

    fn is_entity_lifespan_expired(&self, handle: EntityHandle) -> bool;

    /// Damage over time applied by the radiation job
    fn apply_damage(&self, participant: &Participant, amount: u32);

    /// Create an item from the catalogue and place it in the participant's inventory
    fn give_item(
        &self,
        participant: &Participant,
        catalog_id: CatalogId,
    ) -> Result<EntityHandle, GatewayError>;
}
