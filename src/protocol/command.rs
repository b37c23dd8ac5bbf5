//! Outbound command definitions.
//!
//! User intents serialized for the race server. No command is acknowledged;
//! the store changes when the server pushes the resulting event.
//!
//! # Commands
//!
//! | `type` | Fields | Sent when |
//! |--------|--------|-----------|
//! | `settings` | `drivers`, `controllers`, `digital_car_mode` | Operator saves the settings form |
//! | `bind_car` | `id` | Operator selects a controller slot to (re)assign |
//! | `play_sound` | `file` | Audio is routed to the server's speaker |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::ControllerId;
use crate::race::{Controller, Driver, Roster};

// ============================================================================
// ClientMessage
// ============================================================================

/// A command from this client to the race server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Replace roster and controller assignment.
    Settings {
        /// Full driver roster.
        drivers: Vec<Driver>,
        /// All controller slots.
        controllers: Vec<Controller>,
        /// Control unit in digital mode.
        digital_car_mode: bool,
    },

    /// Start binding a car to a controller.
    BindCar {
        /// Handset slot to bind.
        id: ControllerId,
    },

    /// Play a sound on the server's audio device.
    PlaySound {
        /// Sound file, relative to the server's web root.
        file: String,
    },
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientMessage {
    /// Builds a `settings` command from a roster draft.
    #[must_use]
    pub fn settings(roster: &Roster) -> Self {
        Self::Settings {
            drivers: roster.drivers.clone(),
            controllers: roster.controllers.to_vec(),
            digital_car_mode: roster.digital_car_mode,
        }
    }

    /// Builds a `bind_car` command.
    #[inline]
    #[must_use]
    pub const fn bind_car(id: ControllerId) -> Self {
        Self::BindCar { id }
    }

    /// Builds a `play_sound` command.
    #[inline]
    #[must_use]
    pub fn play_sound(file: impl Into<String>) -> Self {
        Self::PlaySound { file: file.into() }
    }

    /// Returns the wire discriminator of this command.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::Settings { .. } => "settings",
            Self::BindCar { .. } => "bind_car",
            Self::PlaySound { .. } => "play_sound",
        }
    }

    /// Serializes to a single-line JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
