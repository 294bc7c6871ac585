/// Orchestrator cadence
pub mod pourtide {
    /// Fan-out interval in seconds (one logical tick per minute)
    pub const TICK_SECS: u64 = 60;
}

/// Hellgate event constants
pub mod hellgate {
    /// How long an opened event lasts before it closes
    pub const EVENT_LIFETIME_SECS: u64 = 30 * 60;
    /// Lifespan given to every spawned portal entity
    pub const PORTAL_LIFESPAN_SECS: u64 = 30 * 60;
    /// Roster capacity
    pub const MAX_PLAYERS: usize = 12;

    /// Portal templates, one per slot. The slot count K is the length of this list.
    pub const PORTAL_CATALOG_IDS: [u32; 4] = [3000100, 3000101, 3000102, 3000103];

    /// Candidate sites (location, town name). N must be >= K.
    pub const PORTAL_SITES: [(&str, &str); 9] = [
        (
            "0xA9B4001A [94.517273 25.603945 94.005005] 0.308922 0.000000 0.000000 0.951087",
            "Holtburg",
        ),
        (
            "0xBF800036 [167.457947 143.992157 36.095345] 0.775577 0.000000 0.000000 -0.631253",
            "Lytelthorpe",
        ),
        (
            "0xC98D0021 [108.402016 16.683725 22.004999] -0.059218 0.000000 0.000000 0.998245",
            "Rithwic",
        ),
        (
            "0xB470001A [89.616470 34.554600 42.005001] 0.022091 0.000000 0.000000 -0.999756",
            "Yanshi",
        ),
        (
            "0xDA55001E [94.649506 135.290161 20.004999] -0.400765 0.000000 0.000000 -0.916181",
            "Shoushi",
        ),
        (
            "0xE63E0021 [109.439323 1.675783 82.706001] -0.015213 0.000000 0.000000 0.999884",
            "Nanto",
        ),
        (
            "0x7D640015 [52.048855 111.858696 12.004999] -0.421327 0.000000 0.000000 -0.906909",
            "Yaraq",
        ),
        (
            "0x977B000D [43.508862 100.376144 0.005000] 0.952885 0.000000 0.000000 -0.303332",
            "Samsur",
        ),
        (
            "0x90580003 [12.683186 53.629936 8.948068] -0.138752 0.000000 0.000000 0.990327",
            "Al-Arqas",
        ),
    ];

    pub const OPEN_NOTICE: &str = "Hellgate is now open!";
    pub const CLOSING_NOTICE: &str = "Hellgate is now closing. New portals will open shortly";
    pub const SHUTDOWN_NOTICE: &str = "Hellgate is shutting down. No new portals will open.";
}

/// Population tiers for the XP zone registry
pub mod dungeon {
    /// Population at which the medium tier activates
    pub const MEDIUM_POPULATION: usize = 15;
    /// Population at which the large tier activates
    pub const LARGE_POPULATION: usize = 30;

    pub const SMALL_TIER: [(u16, &str); 4] = [
        (0x0104, "Ayan BSD"),
        (0x02F0, "Lin Citadel"),
        (0x02BC, "Mosswart Nest"),
        (0x5660, "Martine's Retreat"),
    ];

    pub const MEDIUM_TIER: [(u16, &str); 1] = [(0x0103, "Obsidian Plains BSD")];

    pub const LARGE_TIER: [(u16, &str); 1] = [(0x02F2, "Qalabar Citadel")];
}

/// Vitae removal gem handout
pub mod vitae {
    /// Window after which every player's handout count resets
    pub const RESET_SECS: u64 = 120 * 60;
    /// Gems a player can receive per window
    pub const MAX_GEMS: u32 = 3;
    /// Catalog id of the vitae removal gem
    pub const GEM_CATALOG_ID: u32 = 5000101;
}

/// Radiation damage over time
pub mod radiation {
    /// Damage per tick = max health / DAMAGE_DIVISOR
    pub const DAMAGE_DIVISOR: u32 = 2;
}
