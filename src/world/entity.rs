//! World entities as a base record plus a behavior tag
//!
//! Use actions are resolved through a static table from tag to handler
//! instead of a type hierarchy.

use crate::game::location::Position;
use crate::world::{EntityHandle, Participant};

/// Capability of an entity when used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorTag {
    Portal,
    Key,
    Lifestone,
    Door,
    Chest,
    Generic,
}

/// Base entity record
#[derive(Debug, Clone, PartialEq)]
pub struct WorldEntity {
    pub handle: EntityHandle,
    pub name: String,
    pub tag: BehaviorTag,
    pub location: Position,
    pub use_radius: f32,
    /// Key: code it opens. Door/Chest: code of its lock.
    pub code: Option<String>,
    pub locked: bool,
    pub open: bool,
    /// Remaining uses (keys)
    pub structure: u32,
}

impl WorldEntity {
    pub fn new(handle: EntityHandle, name: impl Into<String>, tag: BehaviorTag, location: Position) -> Self {
        Self {
            handle,
            name: name.into(),
            tag,
            location,
            use_radius: 2.0,
            code: None,
            locked: false,
            open: false,
            structure: 1,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    fn within_use_radius(&self, position: &Position) -> bool {
        self.location.landblock() == position.landblock()
            && self.location.squared_distance_to(position) < self.use_radius * self.use_radius
    }
}

/// Who is using the entity and from where
#[derive(Debug)]
pub struct UseContext<'a> {
    pub actor: &'a mut Participant,
    pub position: Position,
}

/// Result of a use action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseOutcome {
    /// Actor must walk to the target first
    MoveTo,
    Unlocked { key_consumed: bool },
    DoorOpen,
    AlreadyUnlocked,
    WrongKey,
    NotImplemented(String),
    CannotUnlock,
    Attuned,
    TooFar,
    /// Nothing to do for this behavior
    Ignored,
}

impl UseOutcome {
    /// Text sent back to the actor, if any
    pub fn message(&self) -> Option<String> {
        match self {
            UseOutcome::Attuned => Some(
                "You have attuned your spirit to this Lifestone. You will resurrect here after you die."
                    .to_string(),
            ),
            UseOutcome::TooFar => {
                Some("You wandered too far to attune with the Lifestone!".to_string())
            }
            UseOutcome::NotImplemented(name) => {
                Some(format!("Unlocking {} has not been implemented, yet!", name))
            }
            UseOutcome::DoorOpen => Some("You cannot lock or unlock what is open.".to_string()),
            UseOutcome::AlreadyUnlocked | UseOutcome::WrongKey => {
                Some("The key doesn't fit this lock.".to_string())
            }
            UseOutcome::CannotUnlock => Some("You cannot lock or unlock that!".to_string()),
            UseOutcome::MoveTo | UseOutcome::Unlocked { .. } | UseOutcome::Ignored => None,
        }
    }
}

type UseHandler = fn(&mut UseContext<'_>, &mut WorldEntity, Option<&mut WorldEntity>) -> UseOutcome;

const HANDLERS: [(BehaviorTag, UseHandler); 2] = [
    (BehaviorTag::Key, use_key),
    (BehaviorTag::Lifestone, use_lifestone),
];

fn ignore(_: &mut UseContext<'_>, _: &mut WorldEntity, _: Option<&mut WorldEntity>) -> UseOutcome {
    UseOutcome::Ignored
}

fn handler_for(tag: BehaviorTag) -> UseHandler {
    HANDLERS
        .iter()
        .find(|(t, _)| *t == tag)
        .map_or(ignore as UseHandler, |(_, handler)| *handler)
}

/// Use `entity`, optionally on `target`
pub fn use_entity(
    ctx: &mut UseContext<'_>,
    entity: &mut WorldEntity,
    target: Option<&mut WorldEntity>,
) -> UseOutcome {
    handler_for(entity.tag)(ctx, entity, target)
}

fn use_key(
    ctx: &mut UseContext<'_>,
    key: &mut WorldEntity,
    target: Option<&mut WorldEntity>,
) -> UseOutcome {
    let Some(target) = target else {
        return UseOutcome::CannotUnlock;
    };

    if !target.within_use_radius(&ctx.position) {
        return UseOutcome::MoveTo;
    }

    match target.tag {
        BehaviorTag::Door => {
            if target.open {
                UseOutcome::DoorOpen
            } else if !target.locked {
                UseOutcome::AlreadyUnlocked
            } else if target.code.is_some() && target.code == key.code {
                target.locked = false;
                key.structure = key.structure.saturating_sub(1);
                UseOutcome::Unlocked {
                    key_consumed: key.structure < 1,
                }
            } else {
                UseOutcome::WrongKey
            }
        }
        BehaviorTag::Chest => UseOutcome::NotImplemented(target.name.clone()),
        _ => UseOutcome::CannotUnlock,
    }
}

fn use_lifestone(
    ctx: &mut UseContext<'_>,
    lifestone: &mut WorldEntity,
    _: Option<&mut WorldEntity>,
) -> UseOutcome {
    if !lifestone.within_use_radius(&ctx.position) {
        return UseOutcome::TooFar;
    }
    ctx.actor.sanctuary = Some(ctx.position);
    UseOutcome::Attuned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32) -> Position {
        Position::new(0xA9B4001A, [x, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0])
    }

    fn door() -> WorldEntity {
        WorldEntity::new(EntityHandle(2), "Vault Door", BehaviorTag::Door, at(0.0))
            .with_code("vault")
            .locked()
    }

    fn key(code: &str) -> WorldEntity {
        WorldEntity::new(EntityHandle(1), "Vault Key", BehaviorTag::Key, at(0.0)).with_code(code)
    }

    #[test]
    fn test_key_unlocks_matching_door() {
        let mut player = Participant::new(1, "Alice");
        let mut ctx = UseContext { actor: &mut player, position: at(1.0) };
        let mut key = key("vault");
        key.structure = 2;
        let mut door = door();

        let outcome = use_entity(&mut ctx, &mut key, Some(&mut door));

        assert_eq!(outcome, UseOutcome::Unlocked { key_consumed: false });
        assert!(!door.locked);
        assert_eq!(key.structure, 1);
    }

    #[test]
    fn test_last_use_consumes_key() {
        let mut player = Participant::new(1, "Alice");
        let mut ctx = UseContext { actor: &mut player, position: at(1.0) };
        let mut key = key("vault");
        let mut door = door();

        let outcome = use_entity(&mut ctx, &mut key, Some(&mut door));
        assert_eq!(outcome, UseOutcome::Unlocked { key_consumed: true });
    }

    #[test]
    fn test_key_outcomes() {
        let mut player = Participant::new(1, "Alice");
        let mut ctx = UseContext { actor: &mut player, position: at(1.0) };

        let mut wrong = key("crypt");
        assert_eq!(use_entity(&mut ctx, &mut wrong, Some(&mut door())), UseOutcome::WrongKey);

        let mut unlocked = door();
        unlocked.locked = false;
        assert_eq!(
            use_entity(&mut ctx, &mut key("vault"), Some(&mut unlocked)),
            UseOutcome::AlreadyUnlocked
        );

        let mut open = door();
        open.open = true;
        assert_eq!(use_entity(&mut ctx, &mut key("vault"), Some(&mut open)), UseOutcome::DoorOpen);

        let mut chest = WorldEntity::new(EntityHandle(3), "Chest", BehaviorTag::Chest, at(0.0));
        let outcome = use_entity(&mut ctx, &mut key("vault"), Some(&mut chest));
        assert_eq!(
            outcome.message().as_deref(),
            Some("Unlocking Chest has not been implemented, yet!")
        );

        let mut stone = WorldEntity::new(EntityHandle(4), "Lifestone", BehaviorTag::Lifestone, at(0.0));
        assert_eq!(
            use_entity(&mut ctx, &mut key("vault"), Some(&mut stone)),
            UseOutcome::CannotUnlock
        );
    }

    #[test]
    fn test_key_out_of_range_moves_actor() {
        let mut player = Participant::new(1, "Alice");
        let mut ctx = UseContext { actor: &mut player, position: at(50.0) };

        let outcome = use_entity(&mut ctx, &mut key("vault"), Some(&mut door()));
        assert_eq!(outcome, UseOutcome::MoveTo);
    }

    #[test]
    fn test_lifestone_attunes_in_range() {
        let mut player = Participant::new(1, "Alice");
        let mut stone = WorldEntity::new(EntityHandle(4), "Lifestone", BehaviorTag::Lifestone, at(0.0));

        {
            let mut ctx = UseContext { actor: &mut player, position: at(10.0) };
            assert_eq!(use_entity(&mut ctx, &mut stone, None), UseOutcome::TooFar);
        }
        assert!(player.sanctuary.is_none());

        let mut ctx = UseContext { actor: &mut player, position: at(1.0) };
        assert_eq!(use_entity(&mut ctx, &mut stone, None), UseOutcome::Attuned);
        assert_eq!(player.sanctuary, Some(at(1.0)));
    }

    #[test]
    fn test_untagged_behaviors_are_ignored() {
        let mut player = Participant::new(1, "Alice");
        let mut ctx = UseContext { actor: &mut player, position: at(0.0) };
        let mut portal = WorldEntity::new(EntityHandle(5), "Hellgate", BehaviorTag::Portal, at(0.0));

        assert_eq!(use_entity(&mut ctx, &mut portal, None), UseOutcome::Ignored);
    }
}
