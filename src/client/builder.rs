//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and starting a [`RaceClient`].
//!
//! # Example
//!
//! ```no_run
//! use sclx_live::RaceClient;
//!
//! # async fn example() -> sclx_live::Result<()> {
//! let client = RaceClient::builder()
//!     .url("ws://raceserver.local:8383/sclx")
//!     .remote_audio()
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

use super::audio::{AudioOutput, AudioPlayer};
use super::core::RaceClient;
use super::options::{ClientOptions, OfflinePolicy};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`RaceClient`].
///
/// Use [`RaceClient::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Options being assembled.
    options: ClientOptions,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from existing options.
    #[inline]
    #[must_use]
    pub fn from_options(options: ClientOptions) -> Self {
        Self { options }
    }

    /// Sets the race server endpoint.
    ///
    /// # Arguments
    ///
    /// * `url` - `ws://` or `wss://` URL (default `ws://localhost:8383/sclx`)
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.options.url = url.into();
        self
    }

    /// Sets the delay between a close and the next connect attempt.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.options.reconnect_delay = delay;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets how commands issued while offline are handled.
    #[inline]
    #[must_use]
    pub fn offline_policy(mut self, policy: OfflinePolicy) -> Self {
        self.options.offline_policy = policy;
        self
    }

    /// Buffers up to `capacity` commands while offline.
    #[inline]
    #[must_use]
    pub fn buffer_offline(self, capacity: usize) -> Self {
        self.offline_policy(OfflinePolicy::Buffer { capacity })
    }

    /// Sets the audio output.
    #[inline]
    #[must_use]
    pub fn audio(mut self, audio: AudioOutput) -> Self {
        self.options.audio = audio;
        self
    }

    /// Plays cues locally through `player`.
    #[inline]
    #[must_use]
    pub fn local_audio(self, player: impl AudioPlayer + 'static) -> Self {
        self.audio(AudioOutput::local(player))
    }

    /// Asks the server to play cues.
    #[inline]
    #[must_use]
    pub fn remote_audio(self) -> Self {
        self.audio(AudioOutput::Remote)
    }

    /// Disables cue audio.
    #[inline]
    #[must_use]
    pub fn muted(self) -> Self {
        self.audio(AudioOutput::Muted)
    }

    /// Sets the directory cue files are resolved against.
    #[inline]
    #[must_use]
    pub fn sound_dir(mut self, dir: impl Into<String>) -> Self {
        self.options.sound_dir = dir.into();
        self
    }

    /// Validates the configuration and returns the options.
    ///
    /// # Errors
    ///
    /// See [`Self::build`].
    pub fn into_options(self) -> Result<ClientOptions> {
        self.validate_url()?;
        self.validate_timing()?;
        self.validate_offline_policy()?;
        Ok(self.options)
    }

    /// Validates the configuration and starts the client.
    ///
    /// Must be called from within a Tokio runtime. Returns immediately; the
    /// first connection attempt runs in the background.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the endpoint does not parse
    /// - [`Error::InvalidUrl`] if the scheme is not `ws`/`wss` or the host is missing
    /// - [`Error::Config`] for a zero delay, timeout or buffer capacity
    /// - [`Error::Config`] if no Tokio runtime is running
    pub fn build(self) -> Result<RaceClient> {
        RaceClient::spawn(self.into_options()?)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the endpoint URL.
    fn validate_url(&self) -> Result<()> {
        let url = &self.options.url;
        let parsed = Url::parse(url)?;

        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(Error::invalid_url(
                url,
                format!("scheme must be ws or wss, got '{}'", parsed.scheme()),
            ));
        }

        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(Error::invalid_url(url, "missing host"));
        }

        Ok(())
    }

    /// Validates the delay and timeout.
    fn validate_timing(&self) -> Result<()> {
        if self.options.reconnect_delay.is_zero() {
            return Err(Error::config(
                "Reconnect delay must be greater than zero.\n\
                 Example: RaceClient::builder().reconnect_delay(Duration::from_millis(1000))",
            ));
        }

        if self.options.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be greater than zero."));
        }

        Ok(())
    }

    /// Validates the offline buffer size.
    fn validate_offline_policy(&self) -> Result<()> {
        if let OfflinePolicy::Buffer { capacity: 0 } = self.options.offline_policy {
            return Err(Error::config(
                "Offline buffer capacity must be at least 1. Use OfflinePolicy::Drop to discard.",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
