pub mod constants;
pub mod location;
pub mod hellgate;
pub mod dungeon;
pub mod vitae;
#[cfg(feature = "radiation")]
pub mod radiation;
pub mod pourtide;
pub mod tick_source;
