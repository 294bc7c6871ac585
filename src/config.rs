use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{dungeon, hellgate, pourtide, vitae};
use crate::game::location::{LocationError, Position};

/// A portal site as configured (location string plus display name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSpec {
    pub location: String,
    pub town_name: String,
}

/// A zone entry of a population tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSpec {
    pub landblock: u16,
    pub name: String,
}

/// Hellgate event configuration
#[derive(Debug, Clone)]
pub struct HellgateConfig {
    /// Time an opened event stays open
    pub event_lifetime: Duration,
    /// Lifespan of each spawned portal entity
    pub portal_lifespan: Duration,
    /// Roster capacity
    pub max_players: usize,
    /// One portal template per slot
    pub portal_catalog_ids: Vec<u32>,
    /// Candidate sites, at least one per slot
    pub sites: Vec<SiteSpec>,
    /// Seed for the site permutation (random when unset)
    pub rng_seed: Option<u64>,
}

impl Default for HellgateConfig {
    fn default() -> Self {
        Self {
            event_lifetime: Duration::from_secs(hellgate::EVENT_LIFETIME_SECS),
            portal_lifespan: Duration::from_secs(hellgate::PORTAL_LIFESPAN_SECS),
            max_players: hellgate::MAX_PLAYERS,
            portal_catalog_ids: hellgate::PORTAL_CATALOG_IDS.to_vec(),
            sites: hellgate::PORTAL_SITES
                .iter()
                .map(|(location, town)| SiteSpec {
                    location: location.to_string(),
                    town_name: town.to_string(),
                })
                .collect(),
            rng_seed: None,
        }
    }
}

impl HellgateConfig {
    /// Number of portals spawned per opening
    pub fn slot_count(&self) -> usize {
        self.portal_catalog_ids.len()
    }
}

/// Population-tiered zone registry configuration
#[derive(Debug, Clone)]
pub struct DungeonConfig {
    pub medium_population: usize,
    pub large_population: usize,
    pub small: Vec<ZoneSpec>,
    pub medium: Vec<ZoneSpec>,
    pub large: Vec<ZoneSpec>,
}

fn zone_specs(entries: &[(u16, &str)]) -> Vec<ZoneSpec> {
    entries
        .iter()
        .map(|(landblock, name)| ZoneSpec {
            landblock: *landblock,
            name: name.to_string(),
        })
        .collect()
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            medium_population: dungeon::MEDIUM_POPULATION,
            large_population: dungeon::LARGE_POPULATION,
            small: zone_specs(&dungeon::SMALL_TIER),
            medium: zone_specs(&dungeon::MEDIUM_TIER),
            large: zone_specs(&dungeon::LARGE_TIER),
        }
    }
}

/// Vitae removal gem handout configuration
#[derive(Debug, Clone)]
pub struct VitaeConfig {
    pub reset_window: Duration,
    pub max_gems: u32,
    pub gem_catalog_id: u32,
}

impl Default for VitaeConfig {
    fn default() -> Self {
        Self {
            reset_window: Duration::from_secs(vitae::RESET_SECS),
            max_gems: vitae::MAX_GEMS,
            gem_catalog_id: vitae::GEM_CATALOG_ID,
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Orchestrator fan-out interval
    pub tick_interval: Duration,
    pub hellgate: HellgateConfig,
    pub dungeon: DungeonConfig,
    pub vitae: VitaeConfig,
    /// Run the radiation job on each fan-out
    pub radiation_enabled: bool,
    /// Port of the metrics endpoint (host binary only)
    pub metrics_port: u16,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(pourtide::TICK_SECS),
            hellgate: HellgateConfig::default(),
            dungeon: DungeonConfig::default(),
            vitae: VitaeConfig::default(),
            radiation_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// Read and parse an environment variable, warning and ignoring bad values
fn read_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

impl SchedulerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(secs) = read_env::<u64>("POURTIDE_TICK_SECS") {
            if secs > 0 {
                config.tick_interval = Duration::from_secs(secs);
            } else {
                tracing::warn!("POURTIDE_TICK_SECS must be > 0, using default");
            }
        }

        if let Some(minutes) = read_env::<u64>("HELLGATE_EVENT_MINUTES") {
            config.hellgate.event_lifetime = Duration::from_secs(minutes.saturating_mul(60));
        }

        if let Some(secs) = read_env::<u64>("HELLGATE_PORTAL_LIFESPAN_SECS") {
            config.hellgate.portal_lifespan = Duration::from_secs(secs);
        }

        if let Some(max_players) = read_env::<usize>("HELLGATE_MAX_PLAYERS") {
            if (1..=1000).contains(&max_players) {
                config.hellgate.max_players = max_players;
            } else {
                tracing::warn!("HELLGATE_MAX_PLAYERS must be 1-1000, using default");
            }
        }

        config.hellgate.rng_seed = read_env::<u64>("HELLGATE_RNG_SEED");

        if let Some(pop) = read_env::<usize>("DUNGEON_MEDIUM_POP") {
            config.dungeon.medium_population = pop;
        }

        if let Some(pop) = read_env::<usize>("DUNGEON_LARGE_POP") {
            config.dungeon.large_population = pop;
        }

        if let Some(minutes) = read_env::<u64>("VITAE_RESET_MINUTES") {
            config.vitae.reset_window = Duration::from_secs(minutes.saturating_mul(60));
        }

        if let Some(max_gems) = read_env::<u32>("VITAE_MAX_GEMS") {
            config.vitae.max_gems = max_gems;
        }

        if let Some(enabled) = read_env::<bool>("RADIATION_ENABLED") {
            config.radiation_enabled = enabled;
        }

        if let Some(port) = read_env::<u16>("METRICS_PORT") {
            config.metrics_port = port;
        }

        config
    }

    /// Validate configuration after loading. Any error here must abort startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }

        let hellgate = &self.hellgate;
        if hellgate.event_lifetime.is_zero() {
            return Err(ConfigError::ZeroEventLifetime);
        }
        if hellgate.portal_lifespan.is_zero() {
            return Err(ConfigError::ZeroPortalLifespan);
        }
        if hellgate.max_players == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if hellgate.portal_catalog_ids.is_empty() {
            return Err(ConfigError::NoPortalSlots);
        }
        if hellgate.sites.len() < hellgate.slot_count() {
            return Err(ConfigError::NotEnoughSites {
                sites: hellgate.sites.len(),
                slots: hellgate.slot_count(),
            });
        }
        for site in &hellgate.sites {
            Position::parse(&site.location)?;
            if site.town_name.trim().is_empty() {
                return Err(ConfigError::UnnamedSite(site.location.clone()));
            }
        }
        for (i, site) in hellgate.sites.iter().enumerate() {
            let key = crate::game::location::site_key(&site.location);
            if hellgate.sites[..i]
                .iter()
                .any(|other| crate::game::location::site_key(&other.location) == key)
            {
                return Err(ConfigError::DuplicateSite(site.location.clone()));
            }
        }

        let dungeon = &self.dungeon;
        if dungeon.medium_population == 0 || dungeon.large_population <= dungeon.medium_population {
            return Err(ConfigError::InvalidThresholds {
                medium: dungeon.medium_population,
                large: dungeon.large_population,
            });
        }
        for (tier, zones) in [
            ("small", &dungeon.small),
            ("medium", &dungeon.medium),
            ("large", &dungeon.large),
        ] {
            if zones.is_empty() {
                return Err(ConfigError::EmptyTier(tier));
            }
        }

        if self.vitae.reset_window.is_zero() {
            return Err(ConfigError::ZeroVitaeWindow);
        }

        Ok(())
    }
}

/// Configuration errors, fatal at startup
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,
    #[error("hellgate event lifetime must be greater than zero")]
    ZeroEventLifetime,
    #[error("hellgate portal lifespan must be greater than zero")]
    ZeroPortalLifespan,
    #[error("hellgate capacity must be at least 1")]
    ZeroCapacity,
    #[error("no portal catalog ids configured")]
    NoPortalSlots,
    #[error("{sites} portal sites configured for {slots} portal slots")]
    NotEnoughSites { sites: usize, slots: usize },
    #[error("portal site '{0}' has no town name")]
    UnnamedSite(String),
    #[error("portal site '{0}' is listed twice")]
    DuplicateSite(String),
    #[error("bad portal site location: {0}")]
    Location(#[from] LocationError),
    #[error("tier thresholds must satisfy 0 < medium ({medium}) < large ({large})")]
    InvalidThresholds { medium: usize, large: usize },
    #[error("{0} zone tier is empty")]
    EmptyTier(&'static str),
    #[error("vitae reset window must be greater than zero")]
    ZeroVitaeWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(60));
        assert_eq!(config.hellgate.event_lifetime, Duration::from_secs(30 * 60));
        assert_eq!(config.hellgate.slot_count(), 4);
        assert_eq!(config.hellgate.sites.len(), 9);
        assert_eq!(config.hellgate.max_players, 12);
        assert_eq!(config.dungeon.small.len(), 4);
        assert!(!config.radiation_enabled);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SchedulerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_load_or_default() {
        let config = SchedulerConfig::load_or_default();
        assert!(!config.tick_interval.is_zero());
    }

    #[test]
    fn test_fewer_sites_than_slots() {
        let mut config = SchedulerConfig::default();
        config.hellgate.sites.truncate(3);

        assert_eq!(
            config.validate(),
            Err(ConfigError::NotEnoughSites { sites: 3, slots: 4 })
        );
    }

    #[test]
    fn test_malformed_site_location() {
        let mut config = SchedulerConfig::default();
        config.hellgate.sites[2].location = "nowhere".to_string();

        assert!(matches!(config.validate(), Err(ConfigError::Location(_))));
    }

    #[test]
    fn test_duplicate_site() {
        let mut config = SchedulerConfig::default();
        config.hellgate.sites[1] = config.hellgate.sites[0].clone();

        assert!(matches!(config.validate(), Err(ConfigError::DuplicateSite(_))));
    }

    #[test]
    fn test_zero_portal_lifespan() {
        let mut config = SchedulerConfig::default();
        config.hellgate.portal_lifespan = Duration::ZERO;

        assert_eq!(config.validate(), Err(ConfigError::ZeroPortalLifespan));
    }

    #[test]
    fn test_huge_minute_values_saturate() {
        std::env::set_var("HELLGATE_EVENT_MINUTES", u64::MAX.to_string());
        std::env::set_var("VITAE_RESET_MINUTES", u64::MAX.to_string());

        let config = SchedulerConfig::load_or_default();

        std::env::remove_var("HELLGATE_EVENT_MINUTES");
        std::env::remove_var("VITAE_RESET_MINUTES");
        assert_eq!(config.hellgate.event_lifetime, Duration::from_secs(u64::MAX));
        assert_eq!(config.vitae.reset_window, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_bad_thresholds() {
        let mut config = SchedulerConfig::default();
        config.dungeon.large_population = config.dungeon.medium_population;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn test_empty_tier() {
        let mut config = SchedulerConfig::default();
        config.dungeon.medium.clear();

        assert_eq!(config.validate(), Err(ConfigError::EmptyTier("medium")));
    }
}
