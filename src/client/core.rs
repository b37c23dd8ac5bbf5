//! The user-facing race client handle.
//!
//! [`RaceClient`] is a cheap, cloneable handle to the engine task. Intents go
//! to the engine over a channel; state comes back through a
//! [`watch`] subscription.
//!
//! # Example
//!
//! ```no_run
//! use sclx_live::{ControllerId, RaceClient, RaceState};
//!
//! # async fn example() -> sclx_live::Result<()> {
//! let client = RaceClient::connect("ws://localhost:8383/sclx")?;
//!
//! let mut updates = client.subscribe();
//! while updates.changed().await.is_ok() {
//!     let race = updates.borrow_and_update().clone();
//!     if race.state == RaceState::Race {
//!         println!("{} laps to go", race.target_laps);
//!     }
//! }
//!
//! client.bind_car(ControllerId::try_from(2u8)?)?;
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::ControllerId;
use crate::race::{RaceSnapshot, Roster};

use super::builder::ClientBuilder;
use super::engine::{Engine, Intent};
use super::options::ClientOptions;

// ============================================================================
// Types
// ============================================================================

/// Shared state behind every clone of a client.
pub(crate) struct ClientInner {
    /// Endpoint the engine connects to.
    pub url: String,

    /// Intent channel to the engine task.
    pub intent_tx: mpsc::UnboundedSender<Intent>,

    /// Latest published snapshot.
    pub snapshots: watch::Receiver<RaceSnapshot>,
}

// ============================================================================
// RaceClient
// ============================================================================

/// Handle to a running live-state client.
///
/// The engine stops when [`Self::shutdown`] is called or when the last
/// clone is dropped.
#[derive(Clone)]
pub struct RaceClient {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

// ============================================================================
// RaceClient - Display
// ============================================================================

impl fmt::Debug for RaceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaceClient")
            .field("url", &self.inner.url)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RaceClient - Construction
// ============================================================================

impl RaceClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Starts a client for `url` with default options.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::build`].
    pub fn connect(url: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().url(url).build()
    }

    /// Spawns the engine task for validated options.
    pub(crate) fn spawn(options: ClientOptions) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::config("RaceClient must be started inside a Tokio runtime"))?;

        let url = options.url.clone();
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(RaceSnapshot::default());

        runtime.spawn(Engine::new(options, intent_rx, publisher).run());
        debug!(%url, "Race client spawned");

        Ok(Self {
            inner: Arc::new(ClientInner {
                url,
                intent_tx,
                snapshots,
            }),
        })
    }
}

// ============================================================================
// RaceClient - State
// ============================================================================

impl RaceClient {
    /// Returns the configured endpoint.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns a receiver that observes every published snapshot.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RaceSnapshot> {
        self.inner.snapshots.clone()
    }

    /// Returns a copy of the latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RaceSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Returns `true` while a connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.snapshots.borrow().connected
    }

    /// Returns an editable copy of drivers, controllers and mode.
    #[must_use]
    pub fn roster(&self) -> Roster {
        Roster::from_snapshot(&self.inner.snapshots.borrow())
    }
}

// ============================================================================
// RaceClient - Intents
// ============================================================================

impl RaceClient {
    /// Starts binding `controller` and sends `bind_car`.
    ///
    /// The binding target shows in the next snapshot right away; the
    /// server's `game_state` events drive the rest.
    ///
    /// # Errors
    ///
    /// - [`Error::ClientClosed`] if the engine has stopped
    pub fn bind_car(&self, controller: ControllerId) -> Result<()> {
        self.send(Intent::BindCar(controller))
    }

    /// Sends a `settings` command built from `roster`.
    ///
    /// The store changes only when the server echoes the settings back.
    ///
    /// # Errors
    ///
    /// - [`Error::ClientClosed`] if the engine has stopped
    pub fn save_settings(&self, roster: Roster) -> Result<()> {
        self.send(Intent::SaveSettings(roster))
    }

    /// Plays a sound file through the configured audio output.
    ///
    /// # Errors
    ///
    /// - [`Error::ClientClosed`] if the engine has stopped
    pub fn play_sound(&self, file: impl Into<String>) -> Result<()> {
        self.send(Intent::PlaySound(file.into()))
    }

    /// Drops the current connection or pending retry and connects now.
    ///
    /// # Errors
    ///
    /// - [`Error::ClientClosed`] if the engine has stopped
    pub fn reconnect(&self) -> Result<()> {
        self.send(Intent::Reconnect)
    }

    /// Closes the connection and waits for the engine task to stop.
    ///
    /// Affects every clone of this client.
    pub async fn shutdown(&self) {
        if self.inner.intent_tx.send(Intent::Shutdown).is_ok() {
            self.inner.intent_tx.closed().await;
        }
    }

    /// Returns `true` once the engine task has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.intent_tx.is_closed()
    }

    fn send(&self, intent: Intent) -> Result<()> {
        self.inner
            .intent_tx
            .send(intent)
            .map_err(|_| Error::ClientClosed)
    }
}

// ============================================================================
// Tests
// ============================================================================
