//! Client configuration.
//!
//! [`ClientOptions`] holds every tunable of the live client. Build it
//! directly or through [`ClientBuilder`](super::ClientBuilder), which
//! validates it.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use sclx_live::{ClientOptions, OfflinePolicy};
//!
//! let options = ClientOptions::new()
//!     .with_url("ws://raceserver.local:8383/sclx")
//!     .with_reconnect_delay(Duration::from_millis(500))
//!     .with_offline_policy(OfflinePolicy::Buffer { capacity: 8 });
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use super::audio::AudioOutput;

// ============================================================================
// Constants
// ============================================================================

/// Race server endpoint on the local machine.
pub const DEFAULT_URL: &str = "ws://localhost:8383/sclx";

/// Fixed delay between a close and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1_000);

/// Upper bound for one WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Directory prefix for cue sound files.
pub const DEFAULT_SOUND_DIR: &str = "sounds";

// ============================================================================
// OfflinePolicy
// ============================================================================

/// What happens to outbound commands issued while no connection is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OfflinePolicy {
    /// Discard the command and log it.
    #[default]
    Drop,

    /// Queue up to `capacity` commands and send them in order on the next
    /// open. The oldest command is discarded when the queue is full.
    Buffer {
        /// Maximum number of queued commands.
        capacity: usize,
    },
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Live client configuration.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// WebSocket endpoint of the race server.
    pub url: String,

    /// Delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Handshake timeout; expiry counts as a failed attempt.
    pub connect_timeout: Duration,

    /// Handling of commands issued while disconnected.
    pub offline_policy: OfflinePolicy,

    /// Where cue sounds are played.
    pub audio: AudioOutput,

    /// Prefix joined to cue file names.
    pub sound_dir: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            offline_policy: OfflinePolicy::Drop,
            audio: AudioOutput::Muted,
            sound_dir: DEFAULT_SOUND_DIR.to_string(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint URL.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the offline policy.
    #[inline]
    #[must_use]
    pub fn with_offline_policy(mut self, policy: OfflinePolicy) -> Self {
        self.offline_policy = policy;
        self
    }

    /// Sets the audio output.
    #[inline]
    #[must_use]
    pub fn with_audio(mut self, audio: AudioOutput) -> Self {
        self.audio = audio;
        self
    }

    /// Sets the sound directory.
    #[inline]
    #[must_use]
    pub fn with_sound_dir(mut self, dir: impl Into<String>) -> Self {
        self.sound_dir = dir.into();
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl ClientOptions {
    /// Joins a cue file name onto the sound directory.
    #[must_use]
    pub fn sound_path(&self, file: &str) -> String {
        let dir = self.sound_dir.trim_end_matches('/');
        if dir.is_empty() {
            file.to_string()
        } else {
            format!("{dir}/{file}")
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
