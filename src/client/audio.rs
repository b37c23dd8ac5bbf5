//! Audio output for race cues.
//!
//! The engine never plays sound itself. Each [`Cue`](crate::race::Cue) is
//! resolved to a file under the configured sound directory and routed by
//! [`AudioOutput`]:
//!
//! | Output | Behavior |
//! |--------|----------|
//! | [`AudioOutput::Local`] | Calls [`AudioPlayer::play`] on this machine |
//! | [`AudioOutput::Remote`] | Sends a `play_sound` command to the server |
//! | [`AudioOutput::Muted`] | Drops the cue |
//!
//! Playback is fire-and-forget in every case.

// ============================================================================
// Imports
// ============================================================================

use std::ffi::OsString;
use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::Result;

// ============================================================================
// AudioPlayer
// ============================================================================

/// Local playback capability.
///
/// Implementations must return quickly; `play` is called on the engine task
/// between frames.
pub trait AudioPlayer: Send + Sync {
    /// Starts playing `file`. Errors are the implementation's to report.
    fn play(&self, file: &str);
}

// ============================================================================
// AudioOutput
// ============================================================================

/// Where cue sounds go.
#[derive(Clone, Default)]
pub enum AudioOutput {
    /// Play on this machine.
    Local(Arc<dyn AudioPlayer>),

    /// Ask the server to play the file.
    Remote,

    /// No sound.
    #[default]
    Muted,
}

impl AudioOutput {
    /// Wraps a player as local output.
    #[inline]
    #[must_use]
    pub fn local(player: impl AudioPlayer + 'static) -> Self {
        Self::Local(Arc::new(player))
    }

    /// Returns `true` if cues are sent to the server.
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote)
    }
}

impl fmt::Debug for AudioOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(_) => f.write_str("Local(..)"),
            Self::Remote => f.write_str("Remote"),
            Self::Muted => f.write_str("Muted"),
        }
    }
}

// ============================================================================
// CommandPlayer
// ============================================================================

/// Plays files by spawning an external program (`aplay`, `afplay`, `paplay`).
///
/// The file path is appended as the last argument. The child runs detached
/// and is reaped in the background.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    /// Program to run.
    program: OsString,
    /// Arguments placed before the file path.
    args: Vec<OsString>,
}

impl CommandPlayer {
    /// Creates a player for `program`.
    #[inline]
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Adds an argument placed before the file path.
    #[inline]
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Spawns the program for `file`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`](crate::Error::Io) if the program cannot be started
    pub fn spawn(&self, file: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        tokio::spawn(async move {
            if let Err(e) = child.wait().await {
                debug!(error = %e, "Audio process wait failed");
            }
        });

        Ok(())
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&self, file: &str) {
        if let Err(e) = self.spawn(file) {
            warn!(
                program = %self.program.to_string_lossy(),
                file,
                error = %e,
                "Failed to start audio player"
            );
        }
    }
}

// ============================================================================
// MemoryPlayer
// ============================================================================

/// Records every played file instead of producing sound.
///
/// Clones share the same record, so a clone handed to the client can be
/// inspected from outside.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlayer {
    plays: Arc<Mutex<Vec<String>>>,
}

impl MemoryPlayer {
    /// Creates an empty recorder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the files played so far, oldest first.
    #[must_use]
    pub fn plays(&self) -> Vec<String> {
        self.plays.lock().clone()
    }

    /// Forgets recorded plays.
    pub fn clear(&self) {
        self.plays.lock().clear();
    }
}

impl AudioPlayer for MemoryPlayer {
    fn play(&self, file: &str) {
        self.plays.lock().push(file.to_owned());
    }
}

// ============================================================================
// Tests
// ============================================================================
