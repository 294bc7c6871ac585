//! Hellgate event state machine
//!
//! A limited-capacity, limited-duration event zone reached through portals
//! that spawn in random towns. Evaluated once per orchestrator tick:
//!
//! - `Closed -> Open` when no portal is tracked and the roster is empty
//! - `Open -> Closed` when the event has been open for its configured lifetime
//! - `* -> Shutdown` only on host request; ticks are ignored afterwards
//!
//! Portals expire on their own lifespan and are dropped from tracking, but an
//! expiring portal or an emptied roster never closes the event early.
//!
//! Roster and portal sets sit behind `RwLock`s so other tasks can join, leave
//! and query between ticks. Teardown holds the state write lock and each set's
//! write lock for its whole pass, so readers see the set either before or after
//! teardown, never half cleared.

use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, HellgateConfig};
use crate::game::constants::hellgate::{CLOSING_NOTICE, OPEN_NOTICE, SHUTDOWN_NOTICE};
use crate::game::location::{site_key, Position};
use crate::util::accumulator::Accumulator;
use crate::world::{
    CatalogId, ChatCategory, EntityHandle, Participant, RecallPoint, WorldGateway,
};

/// Event state. Exactly one at a time; `Shutdown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventState {
    Closed,
    Open,
    Shutdown,
}

/// A state change performed by a tick or by shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: EventState,
    pub to: EventState,
}

/// A fixed, named spawn location for a portal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortalSite {
    /// Eight hex digits of the cell id
    pub key: String,
    pub town_name: String,
    pub location: Position,
}

impl PortalSite {
    /// Build a site from a location string
    pub fn parse(location: &str, town_name: &str) -> Result<Self, ConfigError> {
        let position = Position::parse(location)?;
        let key = site_key(location)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:08X}", position.cell));
        Ok(Self {
            key,
            town_name: town_name.to_string(),
            location: position,
        })
    }
}

/// A portal spawned for the current opening
#[derive(Debug, Clone)]
pub struct PortalInstance {
    pub handle: EntityHandle,
    pub catalog_id: CatalogId,
    pub site_key: String,
    pub town_name: String,
    pub lifespan: Duration,
}

/// Result of a join attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyInside,
    Full,
    /// The event has been shut down for good
    ShutDown,
}

/// Read-only view for status endpoints and chat commands
#[derive(Debug, Clone, Serialize)]
pub struct HellgateStatus {
    pub state: EventState,
    pub players: Vec<String>,
    pub max_players: usize,
    pub live_portals: usize,
    pub open_towns: Vec<String>,
    pub time_remaining_secs: Option<u64>,
}

#[derive(Debug, Default)]
struct HellgateTimers {
    /// Time since the current opening
    event: Accumulator,
    /// Time since the current portals spawned
    portal_lifespan: Accumulator,
}

/// Hellgate event manager
pub struct HellgateManager {
    world: Arc<dyn WorldGateway>,
    sites: Vec<PortalSite>,
    portal_catalog_ids: Vec<CatalogId>,
    event_lifetime: Duration,
    portal_lifespan: Duration,
    max_players: usize,
    state: RwLock<EventState>,
    roster: RwLock<HashMap<String, Participant>>,
    portals: RwLock<HashMap<EntityHandle, PortalInstance>>,
    /// Sites opened this session, in spawn order
    open_sites: RwLock<Vec<PortalSite>>,
    /// Held for the duration of a tick or shutdown
    timers: Mutex<HellgateTimers>,
    rng: Mutex<StdRng>,
}

impl HellgateManager {
    /// Build the manager from validated configuration.
    ///
    /// Fails when a site location does not parse or there are fewer sites
    /// than portal slots.
    pub fn new(config: &HellgateConfig, world: Arc<dyn WorldGateway>) -> Result<Self, ConfigError> {
        if config.portal_catalog_ids.is_empty() {
            return Err(ConfigError::NoPortalSlots);
        }
        if config.sites.len() < config.slot_count() {
            return Err(ConfigError::NotEnoughSites {
                sites: config.sites.len(),
                slots: config.slot_count(),
            });
        }

        let sites = config
            .sites
            .iter()
            .map(|site| PortalSite::parse(&site.location, &site.town_name))
            .collect::<Result<Vec<_>, _>>()?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "Hellgate initialized: {} sites, {} portal slots, lifetime {}s",
            sites.len(),
            config.slot_count(),
            config.event_lifetime.as_secs()
        );

        Ok(Self {
            world,
            sites,
            portal_catalog_ids: config.portal_catalog_ids.clone(),
            event_lifetime: config.event_lifetime,
            portal_lifespan: config.portal_lifespan,
            max_players: config.max_players,
            state: RwLock::new(EventState::Closed),
            roster: RwLock::new(HashMap::new()),
            portals: RwLock::new(HashMap::new()),
            open_sites: RwLock::new(Vec::new()),
            timers: Mutex::new(HellgateTimers::default()),
            rng: Mutex::new(rng),
        })
    }

    /// Current event state
    pub fn state(&self) -> EventState {
        *self.state.read()
    }

    /// Evaluate the state machine once.
    ///
    /// Calling it again with a zero `elapsed` changes nothing.
    pub fn tick(&self, elapsed: Duration) -> Option<Transition> {
        let mut timers = self.timers.lock();

        if self.state() == EventState::Shutdown {
            return None;
        }

        timers.event.advance(elapsed);
        timers.portal_lifespan.advance(elapsed);

        self.check_portal_lifespans(&timers);

        match self.state() {
            EventState::Closed => {
                let has_portals = !self.portals.read().is_empty();
                let has_players = !self.roster.read().is_empty();
                debug!(
                    "Hellgate closed: portals={}, players={}",
                    has_portals, has_players
                );

                if !has_portals && !has_players && self.open(&mut timers) {
                    Some(Transition {
                        from: EventState::Closed,
                        to: EventState::Open,
                    })
                } else {
                    None
                }
            }
            EventState::Open => {
                debug!(
                    "Hellgate open: {}s elapsed, {} players",
                    timers.event.elapsed().as_secs(),
                    self.player_count()
                );

                if timers.event.has_reached(self.event_lifetime) {
                    self.teardown(&mut timers, EventState::Closed);
                    Some(Transition {
                        from: EventState::Open,
                        to: EventState::Closed,
                    })
                } else {
                    None
                }
            }
            EventState::Shutdown => None,
        }
    }

    /// Tear the event down for good. Later ticks do nothing.
    pub fn shutdown(&self) -> Option<Transition> {
        let mut timers = self.timers.lock();
        let from = self.state();
        if from == EventState::Shutdown {
            return None;
        }

        info!("Hellgate shutting down from {:?}", from);
        self.teardown(&mut timers, EventState::Shutdown);
        Some(Transition {
            from,
            to: EventState::Shutdown,
        })
    }

    /// Spawn the portals and open the event. Returns false (still closed) if
    /// no portal could be spawned.
    fn open(&self, timers: &mut HellgateTimers) -> bool {
        let mut state = self.state.write();

        // Stragglers left over from an earlier session
        for participant in self.world.online_participants() {
            if participant.in_hellgate {
                if let Err(e) = self.world.teleport(&participant, RecallPoint::Sanctuary) {
                    warn!("Failed to recall {} before opening: {}", participant.name, e);
                }
            }
        }

        let mut chosen: Vec<&PortalSite> = self.sites.iter().collect();
        chosen.shuffle(&mut *self.rng.lock());

        let mut portals = self.portals.write();
        let mut open_sites = self.open_sites.write();

        for (catalog_id, site) in self.portal_catalog_ids.iter().zip(chosen) {
            let handle = match self.world.create_entity(*catalog_id, &site.location) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("Skipping hellgate portal in {}: {}", site.town_name, e);
                    continue;
                }
            };

            self.world.enter_world(handle);
            portals.insert(
                handle,
                PortalInstance {
                    handle,
                    catalog_id: *catalog_id,
                    site_key: site.key.clone(),
                    town_name: site.town_name.clone(),
                    lifespan: self.portal_lifespan,
                },
            );
            open_sites.push(site.clone());
        }

        if portals.is_empty() {
            warn!("No hellgate portal could be spawned, staying closed");
            return false;
        }

        timers.event.restart();
        timers.portal_lifespan.restart();
        *state = EventState::Open;

        let towns: Vec<&str> = open_sites.iter().map(|s| s.town_name.as_str()).collect();
        info!("Hellgate opened with portals in {}", towns.join(", "));

        self.world.broadcast(
            &format!(
                "The current open hellgate portals are: {}.",
                towns.join(", ")
            ),
            ChatCategory::WorldBroadcast,
        );
        self.world.broadcast(OPEN_NOTICE, ChatCategory::WorldBroadcast);

        true
    }

    /// Recall everyone, delete every portal, reset timers and enter `next`
    fn teardown(&self, timers: &mut HellgateTimers, next: EventState) {
        let mut state = self.state.write();

        {
            let mut roster = self.roster.write();

            let mut targets: Vec<Participant> = roster.values().cloned().collect();
            for participant in self.world.online_participants() {
                if participant.in_hellgate && !roster.contains_key(participant.key()) {
                    targets.push(participant);
                }
            }

            for participant in &targets {
                if let Err(e) = self.world.teleport(participant, RecallPoint::Sanctuary) {
                    warn!("Failed to recall {} from hellgate: {}", participant.name, e);
                }
            }

            roster.clear();
        }

        {
            let mut portals = self.portals.write();
            for handle in portals.keys() {
                self.world.delete_entity(*handle);
            }
            portals.clear();
            self.open_sites.write().clear();
        }

        timers.event.reset();
        timers.portal_lifespan.reset();

        let notice = match next {
            EventState::Shutdown => SHUTDOWN_NOTICE,
            _ => CLOSING_NOTICE,
        };
        self.world.broadcast(notice, ChatCategory::WorldBroadcast);

        info!("Hellgate {:?} -> {:?}", *state, next);
        *state = next;
    }

    /// Drop portals whose lifespan is spent. Never changes the event state.
    fn check_portal_lifespans(&self, timers: &HellgateTimers) {
        let expired: Vec<PortalInstance> = {
            let portals = self.portals.read();
            portals
                .values()
                .filter(|portal| {
                    self.world.is_entity_lifespan_expired(portal.handle)
                        || timers.portal_lifespan.has_reached(portal.lifespan)
                })
                .cloned()
                .collect()
        };

        if expired.is_empty() {
            return;
        }

        let mut portals = self.portals.write();
        for portal in expired {
            if portals.remove(&portal.handle).is_none() {
                continue;
            }
            // Already gone if the world reported expiry; otherwise we time it out
            self.world.delete_entity(portal.handle);
            debug!(
                "Hellgate portal {} in {} expired",
                portal.handle, portal.town_name
            );
            self.close_open_site(&portal.site_key);
        }
    }

    /// Forget an opened site and announce it. Returns false if it was not open.
    fn close_open_site(&self, key: &str) -> bool {
        let removed = {
            let mut open_sites = self.open_sites.write();
            open_sites
                .iter()
                .position(|site| site.key == key)
                .map(|index| open_sites.remove(index))
        };

        match removed {
            Some(site) => {
                self.world.broadcast(
                    &format!("Hellgate portal in {} has closed.", site.town_name),
                    ChatCategory::WorldBroadcast,
                );
                true
            }
            None => false,
        }
    }

    /// Mark the site at `location` as closed (its portal went away)
    pub fn remove_open_portal(&self, location: &str) -> bool {
        match site_key(location) {
            Some(key) => self.close_open_site(key),
            None => false,
        }
    }

    /// Credit a participant with being inside the event.
    ///
    /// Accepted while Closed or Open. A non-empty roster holds a closed
    /// event shut until everyone has left.
    pub fn add_player(&self, participant: &Participant) -> JoinOutcome {
        let outcome = {
            let state = self.state.read();
            if *state == EventState::Shutdown {
                JoinOutcome::ShutDown
            } else {
                let mut roster = self.roster.write();
                if roster.contains_key(participant.key()) {
                    JoinOutcome::AlreadyInside
                } else if roster.len() >= self.max_players {
                    JoinOutcome::Full
                } else {
                    roster.insert(participant.key().to_string(), participant.clone());
                    JoinOutcome::Joined
                }
            }
        };

        if outcome == JoinOutcome::Joined {
            let message = format!("Player: {} has entered the hellgate.", participant.name);
            info!("{} ({} players)", message, self.player_count());
            self.world.broadcast(&message, ChatCategory::WorldBroadcast);
        } else {
            debug!("Hellgate join by {}: {:?}", participant.name, outcome);
        }

        outcome
    }

    /// Remove a participant and recall them. Absent participants are ignored.
    ///
    /// An emptied roster does not close the event; only the lifetime does.
    pub fn remove_player(&self, participant: &Participant) -> bool {
        let removed = self.roster.write().remove(participant.key());

        let Some(removed) = removed else {
            return false;
        };

        let message = format!("Player: {} has left the hellgate.", removed.name);
        info!("{} ({} players)", message, self.player_count());

        if let Err(e) = self.world.teleport(participant, RecallPoint::Sanctuary) {
            warn!("Failed to recall {} from hellgate: {}", removed.name, e);
        }
        self.world.broadcast(&message, ChatCategory::WorldBroadcast);

        true
    }

    pub fn contains_player(&self, name: &str) -> bool {
        self.roster.read().contains_key(name)
    }

    pub fn player_count(&self) -> usize {
        self.roster.read().len()
    }

    /// Roster names, sorted
    pub fn players(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roster.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn live_portal_count(&self) -> usize {
        self.portals.read().len()
    }

    /// Tracked portal instances
    pub fn portals(&self) -> Vec<PortalInstance> {
        self.portals.read().values().cloned().collect()
    }

    /// Towns with an open portal, in spawn order
    pub fn open_towns(&self) -> Vec<String> {
        self.open_sites
            .read()
            .iter()
            .map(|site| site.town_name.clone())
            .collect()
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Time until the event closes, `None` unless open
    pub fn time_remaining(&self) -> Option<Duration> {
        if self.state() != EventState::Open {
            return None;
        }
        Some(self.timers.lock().event.remaining(self.event_lifetime))
    }

    /// Remaining time as `M:SS`
    pub fn format_time_remaining(&self) -> String {
        let secs = self.time_remaining().unwrap_or(Duration::ZERO).as_secs();
        format!("{}:{:02}", secs / 60, secs % 60)
    }

    pub fn status(&self) -> HellgateStatus {
        HellgateStatus {
            state: self.state(),
            players: self.players(),
            max_players: self.max_players,
            live_portals: self.live_portal_count(),
            open_towns: self.open_towns(),
            time_remaining_secs: self.time_remaining().map(|d| d.as_secs()),
        }
    }
}
