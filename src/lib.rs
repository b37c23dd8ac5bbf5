//! Live-state client for a slot-car race controller.
//!
//! This library keeps a display in sync with an authoritative race server
//! over a WebSocket, and drives the timed overlays and sound cues that go
//! with a race (start lights, false-start banner, victory overlay).
//!
//! # Architecture
//!
//! The client runs as one engine task per [`RaceClient`]:
//!
//! - **Connection**: one WebSocket link at a time, retried every second
//!   (by default) for as long as the client lives
//! - **Dispatch**: every inbound frame is decoded into a closed
//!   [`ServerMessage`] and applied to the [`RaceStore`] in arrival order
//! - **Effects**: overlay flags carry monotonic deadlines and clear
//!   themselves; cues go to the configured [`AudioOutput`]
//! - **Publish**: one [`RaceSnapshot`] per change, through a `watch` channel
//!
//! # Quick Start
//!
//! ```no_run
//! use sclx_live::{RaceClient, Result, format_clock};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = RaceClient::connect("ws://localhost:8383/sclx")?;
//!
//!     let mut updates = client.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let race = updates.borrow_and_update().clone();
//!         println!("{:?} {}", race.state, format_clock(race.clock));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`RaceClient`], configuration and audio output |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe slot and connection ids |
//! | [`protocol`] | WebSocket message types |
//! | [`race`] | Race data model, store and transient effects |
//! | [`transport`] | WebSocket connection (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Client handle, configuration and audio output.
///
/// Use [`RaceClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for cars, controllers, drivers and connections.
///
/// Car and controller ids are range-checked on construction.
pub mod identifiers;

/// WebSocket protocol message types.
pub mod protocol;

/// Race state: data model, store and transient effects.
pub mod race;

/// WebSocket transport layer.
///
/// Internal module handling the connection I/O task.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    AudioOutput, AudioPlayer, ClientBuilder, ClientOptions, CommandPlayer, MemoryPlayer,
    OfflinePolicy, RaceClient,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CAR_COUNT, CONTROLLER_COUNT, CarId, ConnectionId, ControllerId, DriverId};

// Protocol types
pub use protocol::{ClientMessage, ServerMessage, ServerState};

// Race types
pub use race::{
    CarStat, Controller, Cue, Driver, RaceSnapshot, RaceState, RaceStore, Roster, format_clock,
    format_lap_time,
};
