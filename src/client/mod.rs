//! Live race client.
//!
//! This module provides the entry point: a [`RaceClient`] that keeps a
//! connection to the race server alive and publishes the race state.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RaceClient`] | Cloneable handle: intents and state subscription |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Plain configuration struct |
//! | [`OfflinePolicy`] | Drop or buffer commands while disconnected |
//! | [`AudioOutput`] | Local, remote or muted cue playback |
//!
//! # Example
//!
//! ```no_run
//! use sclx_live::{CommandPlayer, RaceClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = RaceClient::builder()
//!     .local_audio(CommandPlayer::new("aplay").arg("-q"))
//!     .buffer_offline(8)
//!     .build()?;
//!
//! let race = client.snapshot();
//! println!("{:?}, connected: {}", race.state, race.connected);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Cue playback outputs.
pub mod audio;

/// Fluent builder for client configuration.
pub mod builder;

/// The client handle.
pub mod core;

/// The engine task that owns the race state.
mod engine;

/// Client configuration and defaults.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use audio::{AudioOutput, AudioPlayer, CommandPlayer, MemoryPlayer};
pub use builder::ClientBuilder;
pub use self::core::RaceClient;
pub use options::{ClientOptions, OfflinePolicy};
