//! Inbound message types.
//!
//! Every frame pushed by the race server is a JSON object with a `type`
//! discriminator. The nine known kinds decode into [`ServerMessage`]; anything
//! else fails [`decode`] and the frame is dropped by the engine.
//!
//! # Message Types
//!
//! | `type` | Fields |
//! |--------|--------|
//! | `game_state` | `state` |
//! | `game_update` | `time`, `positions` |
//! | `game_finished` | `time`, `positions` |
//! | `lap_count` | `id`, `lap`, `lap_time`, `record` |
//! | `false_start` | `id` |
//! | `laps_update` | `laps` |
//! | `countdown` | `number` |
//! | `settings` | `drivers?`, `controllers`, `digital_car_mode?` |
//! | `controller_changed` | `id`, `connected` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{CarId, ControllerId};
use crate::race::{Controller, Driver, RaceState};

// ============================================================================
// Constants
// ============================================================================

/// Discriminators this client understands.
pub const KNOWN_TYPES: [&str; 9] = [
    "game_state",
    "game_update",
    "game_finished",
    "lap_count",
    "false_start",
    "laps_update",
    "countdown",
    "settings",
    "controller_changed",
];

// ============================================================================
// ServerState
// ============================================================================

/// Phase code as sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerState {
    /// Track stopped.
    Stopped,
    /// Start lights running.
    Countdown,
    /// Race in progress.
    Race,
    /// Last light out, waiting for green.
    Starting,
    /// Free practice.
    Training,
    /// Controller binding.
    Binding,
}

impl From<ServerState> for RaceState {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Stopped => Self::Stopped,
            ServerState::Countdown | ServerState::Starting => Self::Countdown,
            ServerState::Race => Self::Race,
            ServerState::Training => Self::Training,
            ServerState::Binding => Self::Binding,
        }
    }
}

// ============================================================================
// ServerMessage
// ============================================================================

/// A decoded frame from the race server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Phase change.
    GameState {
        /// New phase.
        state: ServerState,
    },

    /// Periodic clock and order update.
    GameUpdate {
        /// Race clock in microseconds.
        time: u64,
        /// Car ids in race order.
        #[serde(default)]
        positions: Vec<u8>,
    },

    /// Final classification.
    GameFinished {
        /// Final race time in microseconds.
        time: u64,
        /// Car ids in finishing order.
        #[serde(default)]
        positions: Vec<u8>,
    },

    /// A car crossed the line.
    LapCount {
        /// Car slot.
        id: CarId,
        /// Laps completed.
        lap: u32,
        /// Lap duration in microseconds.
        lap_time: u64,
        /// Lap is the car's new best.
        #[serde(default)]
        record: bool,
    },

    /// A car jumped the start.
    FalseStart {
        /// Car slot.
        id: CarId,
    },

    /// Lap target changed.
    LapsUpdate {
        /// Laps that complete a race.
        laps: u32,
    },

    /// Start light tick.
    Countdown {
        /// Light number, `4` is the start tick, `0` hides the lights.
        number: u8,
    },

    /// Roster and controller assignment.
    Settings {
        /// Driver roster, absent or empty keeps the current roster.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        drivers: Option<Vec<Driver>>,
        /// Controller assignments.
        #[serde(default)]
        controllers: Vec<Controller>,
        /// Control unit in digital mode.
        #[serde(default)]
        digital_car_mode: bool,
    },

    /// Handset plugged in or removed.
    ControllerChanged {
        /// Handset slot.
        id: ControllerId,
        /// Handset present.
        connected: bool,
    },
}

impl ServerMessage {
    /// Returns the wire discriminator of this message.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::GameState { .. } => "game_state",
            Self::GameUpdate { .. } => "game_update",
            Self::GameFinished { .. } => "game_finished",
            Self::LapCount { .. } => "lap_count",
            Self::FalseStart { .. } => "false_start",
            Self::LapsUpdate { .. } => "laps_update",
            Self::Countdown { .. } => "countdown",
            Self::Settings { .. } => "settings",
            Self::ControllerChanged { .. } => "controller_changed",
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes one text frame.
///
/// # Errors
///
/// - [`Error::Json`] if the frame is not a JSON object
/// - [`Error::Protocol`] if `type` is missing or not a string
/// - [`Error::UnknownMessage`] if `type` is not one of [`KNOWN_TYPES`]
/// - [`Error::Protocol`] if the fields do not match the declared type,
///   including out-of-range car or controller ids
pub fn decode(text: &str) -> Result<ServerMessage> {
    let value: Value = serde_json::from_str(text.trim())?;

    let message_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::protocol("missing 'type' discriminator"))?;

    if !KNOWN_TYPES.contains(&message_type) {
        return Err(Error::unknown_message(message_type));
    }

    let message_type = message_type.to_string();
    serde_json::from_value(value)
        .map_err(|e| Error::protocol(format!("malformed '{message_type}': {e}")))
}

// ============================================================================
// Tests
// ============================================================================
