//! Race state: data model, store, transient effects and roster editing.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `state` | Data model and the published [`RaceSnapshot`] |
//! | `store` | [`RaceStore`], the single owner of the live state |
//! | `effects` | Timed overlay flags and audio [`Cue`]s |
//! | `roster` | [`Roster`] settings draft |
//! | `format` | Lap-time and clock display strings |

// ============================================================================
// Submodules
// ============================================================================

/// Timed overlay flags and audio cues.
pub mod effects;

/// Display formatting for race times.
pub mod format;

/// Settings draft for the roster editor.
pub mod roster;

/// Race data model.
pub mod state;

/// The live race state and its mutation rules.
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use effects::{Cue, TransientFlag, TransientFlags};
pub use format::{format_clock, format_lap_time};
pub use roster::Roster;
pub use state::{
    BIND_NONE, CarStat, Controller, Driver, RaceSnapshot, RaceState, UNKNOWN_DRIVER_NAME,
};
pub use store::RaceStore;
