//! The engine task.
//!
//! One tokio task owns the [`RaceStore`] and is the only place it changes.
//! It waits on four sources at once:
//!
//! | Source | Handling |
//! |--------|----------|
//! | Link events | Open/close bookkeeping, frame decode and apply |
//! | Intents | Commands from [`RaceClient`](super::RaceClient) handles |
//! | Retry timer | Opens a new connection after the reconnect delay |
//! | Flag deadline | Clears due transient flags |
//!
//! Every branch runs to completion before the next is picked, so frames are
//! applied strictly in arrival order and each one is followed by a single
//! publish of the snapshot.
//!
//! # Link States
//!
//! ```text
//!            open()                 Opened
//!   ┌──────────────────► Connecting ───────► Open
//!   │                        │                 │
//!   │                 Closed │                 │ Closed
//!   │                        ▼                 │
//!   └────────────────── Retrying ◄─────────────┘
//!       retry timer      (now + reconnect_delay)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::future::pending;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace, warn};

use crate::error::Error;
use crate::identifiers::{ConnectionId, ControllerId};
use crate::protocol::{ClientMessage, decode};
use crate::race::{Cue, RaceSnapshot, RaceStore, Roster};
use crate::transport::{Connection, LinkEvent};

use super::audio::AudioOutput;
use super::options::{ClientOptions, OfflinePolicy};

// ============================================================================
// Intent
// ============================================================================

/// Requests from client handles to the engine.
#[derive(Debug)]
pub(crate) enum Intent {
    /// Enter binding for a controller and tell the server.
    BindCar(ControllerId),
    /// Send a roster as a `settings` command.
    SaveSettings(Roster),
    /// Play a sound file through the configured output.
    PlaySound(String),
    /// Drop the current link or retry timer and connect now.
    Reconnect,
    /// Close the link and stop the engine.
    Shutdown,
}

// ============================================================================
// Link
// ============================================================================

/// Connection state as seen by the engine.
#[derive(Debug)]
enum Link {
    /// Handshake in progress.
    Connecting(Connection),
    /// Frames flowing.
    Open(Connection),
    /// Waiting for the retry timer.
    Retrying {
        /// When the next attempt starts.
        at: Instant,
    },
}

impl Link {
    /// Current connection, open or not.
    fn connection(&self) -> Option<&Connection> {
        match self {
            Self::Connecting(conn) | Self::Open(conn) => Some(conn),
            Self::Retrying { .. } => None,
        }
    }

    /// Returns `true` if `id` is the live connection.
    fn is_current(&self, id: ConnectionId) -> bool {
        self.connection().is_some_and(|conn| conn.id() == id)
    }

    /// Pending retry time.
    fn retry_at(&self) -> Option<Instant> {
        match self {
            Self::Retrying { at } => Some(*at),
            _ => None,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// State owned by the engine task.
pub(crate) struct Engine {
    /// Validated configuration.
    options: ClientOptions,
    /// The live race state.
    store: RaceStore,
    /// Connection state.
    link: Link,
    /// Commands held back while offline (buffer policy only).
    outbox: VecDeque<ClientMessage>,
    /// Handed to every new connection.
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    intent_rx: mpsc::UnboundedReceiver<Intent>,
    /// Snapshot publication.
    publisher: watch::Sender<RaceSnapshot>,
}

impl Engine {
    /// Creates the engine. Nothing connects until [`Self::run`].
    pub(crate) fn new(
        options: ClientOptions,
        intent_rx: mpsc::UnboundedReceiver<Intent>,
        publisher: watch::Sender<RaceSnapshot>,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();

        Self {
            options,
            store: RaceStore::new(),
            // Due immediately; the first loop pass connects.
            link: Link::Retrying { at: Instant::now() },
            outbox: VecDeque::new(),
            link_tx,
            link_rx,
            intent_rx,
            publisher,
        }
    }

    /// Runs until shutdown is requested or every client handle is dropped.
    pub(crate) async fn run(mut self) {
        info!(url = %self.options.url, "Race client engine started");

        loop {
            let retry_at = self.link.retry_at();
            let flag_deadline = self.store.next_deadline();

            tokio::select! {
                // Link events; the engine holds a sender, so this never ends
                Some(event) = self.link_rx.recv() => {
                    self.on_link_event(event);
                }

                // Intents from client handles
                intent = self.intent_rx.recv() => {
                    match intent {
                        Some(Intent::Shutdown) | None => break,
                        Some(intent) => self.on_intent(intent),
                    }
                }

                // Reconnect timer
                () = sleep_until_opt(retry_at) => {
                    self.connect();
                }

                // Transient flag expiry
                () = sleep_until_opt(flag_deadline) => {
                    if self.store.expire(Instant::now()) {
                        self.publish();
                    }
                }
            }
        }

        if let Some(conn) = self.link.connection() {
            conn.shutdown();
        }
        info!("Race client engine stopped");
    }

    // ========================================================================
    // Link Handling
    // ========================================================================

    /// Starts a new connection, superseding any previous one.
    fn connect(&mut self) {
        let conn = Connection::open(
            self.options.url.clone(),
            self.options.connect_timeout,
            self.link_tx.clone(),
        );
        debug!(id = %conn.id(), url = %self.options.url, "Connection attempt started");
        self.link = Link::Connecting(conn);
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        let id = event.connection_id();
        if !self.link.is_current(id) {
            trace!(%id, "Ignoring event from superseded connection");
            return;
        }

        match event {
            LinkEvent::Opened(_) => self.on_opened(),
            LinkEvent::Frame(_, text) => self.on_frame(&text),
            LinkEvent::Closed { reason, .. } => self.on_closed(id, reason),
        }
    }

    fn on_opened(&mut self) {
        let Link::Connecting(conn) = &self.link else {
            return;
        };
        let conn = conn.clone();
        info!(id = %conn.id(), "Connected to race server");

        self.store.on_connected();
        self.link = Link::Open(conn);
        self.flush_outbox();
        self.publish();
    }

    fn on_frame(&mut self, text: &str) {
        let message = match decode(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Dropping inbound frame");
                return;
            }
        };

        trace!(message_type = message.message_type(), "Applying message");
        let cues = self.store.apply(message, Instant::now());
        for cue in cues {
            self.play_cue(cue);
        }
        self.publish();
    }

    fn on_closed(&mut self, id: ConnectionId, reason: Option<String>) {
        let at = Instant::now() + self.options.reconnect_delay;
        let delay_ms = self.options.reconnect_delay.as_millis() as u64;

        match (&self.link, reason) {
            (Link::Open(_), Some(reason)) => {
                warn!(%id, %reason, delay_ms, "Connection lost, reconnect scheduled");
            }
            (Link::Open(_), None) => {
                info!(%id, delay_ms, "Connection closed, reconnect scheduled");
            }
            (_, reason) => {
                debug!(
                    %id,
                    reason = reason.as_deref().unwrap_or("closed"),
                    delay_ms,
                    "Connect attempt failed, retry scheduled"
                );
            }
        }

        self.link = Link::Retrying { at };
        self.store.on_disconnected();
        self.publish();
    }

    // ========================================================================
    // Intent Handling
    // ========================================================================

    fn on_intent(&mut self, intent: Intent) {
        match intent {
            Intent::BindCar(id) => {
                self.store.begin_binding(id);
                self.publish();
                self.send(ClientMessage::bind_car(id));
            }
            Intent::SaveSettings(roster) => {
                self.send(ClientMessage::settings(&roster));
            }
            Intent::PlaySound(file) => {
                self.route_sound(file);
            }
            Intent::Reconnect => {
                self.reconnect();
            }
            // Handled by the run loop
            Intent::Shutdown => {}
        }
    }

    /// Supersedes the current link or retry timer with a fresh attempt.
    fn reconnect(&mut self) {
        if let Some(conn) = self.link.connection() {
            debug!(id = %conn.id(), "Superseding connection");
            conn.shutdown();
        }

        let was_open = matches!(self.link, Link::Open(_));
        self.connect();

        if was_open {
            self.store.on_disconnected();
            self.publish();
        }
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Sends a command now, or applies the offline policy.
    fn send(&mut self, message: ClientMessage) {
        if let Link::Open(conn) = &self.link {
            match conn.send(&message) {
                Ok(()) => {
                    trace!(message_type = message.message_type(), "Command sent");
                    return;
                }
                Err(e) => {
                    debug!(error = %e, "Connection gone before its close notice");
                }
            }
        }

        self.hold_offline(message);
    }

    fn hold_offline(&mut self, message: ClientMessage) {
        match self.options.offline_policy {
            OfflinePolicy::Drop => {
                let e = Error::not_connected(message.message_type());
                debug!(error = %e, "Dropping outbound command");
            }
            OfflinePolicy::Buffer { capacity } => {
                if self.outbox.len() >= capacity
                    && let Some(dropped) = self.outbox.pop_front()
                {
                    debug!(
                        message_type = dropped.message_type(),
                        capacity, "Offline buffer full, dropping oldest command"
                    );
                }
                self.outbox.push_back(message);
            }
        }
    }

    fn flush_outbox(&mut self) {
        if self.outbox.is_empty() {
            return;
        }
        debug!(count = self.outbox.len(), "Flushing buffered commands");

        let pending = std::mem::take(&mut self.outbox);
        for message in pending {
            self.send(message);
        }
    }

    // ========================================================================
    // Audio
    // ========================================================================

    fn play_cue(&mut self, cue: Cue) {
        let path = self.options.sound_path(cue.file_name());
        trace!(?cue, %path, "Cue");
        self.route_sound(path);
    }

    fn route_sound(&mut self, file: String) {
        if self.options.audio.is_remote() {
            self.send(ClientMessage::play_sound(file));
            return;
        }

        match &self.options.audio {
            AudioOutput::Local(player) => player.play(&file),
            AudioOutput::Muted | AudioOutput::Remote => {
                trace!(%file, "Audio muted");
            }
        }
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    /// Publishes the snapshot if it differs from the last one.
    fn publish(&self) {
        let snapshot = self.store.snapshot();
        self.publisher.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;
    use tokio_test::assert_ok;

    use crate::client::audio::MemoryPlayer;
    use crate::identifiers::CarId;
    use crate::race::RaceState;
    use crate::transport::server::{MockPeer, MockServer, WAIT_TIMEOUT};

    struct Harness {
        intent_tx: mpsc::UnboundedSender<Intent>,
        snapshots: watch::Receiver<RaceSnapshot>,
    }

    impl Harness {
        fn start(options: ClientOptions) -> Self {
            let (intent_tx, intent_rx) = mpsc::unbounded_channel();
            let (publisher, snapshots) = watch::channel(RaceSnapshot::default());
            tokio::spawn(Engine::new(options, intent_rx, publisher).run());
            Self {
                intent_tx,
                snapshots,
            }
        }

        fn intent(&self, intent: Intent) {
            self.intent_tx.send(intent).expect("engine running");
        }

        async fn wait_for(&mut self, predicate: impl FnMut(&RaceSnapshot) -> bool) -> RaceSnapshot {
            timeout(WAIT_TIMEOUT, self.snapshots.wait_for(predicate))
                .await
                .expect("snapshot in time")
                .expect("engine running")
                .clone()
        }
    }

    fn options_for(server: &MockServer) -> ClientOptions {
        ClientOptions::new()
            .with_url(server.ws_url())
            .with_reconnect_delay(Duration::from_millis(1000))
    }

    async fn connected(server: &MockServer, options: ClientOptions) -> (Harness, MockPeer) {
        let mut harness = Harness::start(options);
        let peer = server.accept().await.expect("client connects");
        harness.wait_for(|s| s.connected).await;
        (harness, peer)
    }

    #[tokio::test]
    async fn test_countdown_pins_clock() {
        let server = MockServer::bind().await.expect("bind");
        let (mut harness, mut peer) = connected(&server, options_for(&server)).await;

        peer.send_json(json!({"type": "game_state", "state": "COUNTDOWN"}))
            .await
            .expect("send");
        peer.send_json(json!({"type": "game_update", "time": 5_000_000, "positions": []}))
            .await
            .expect("send");
        peer.send_json(json!({"type": "laps_update", "laps": 12}))
            .await
            .expect("send");

        let snapshot = harness.wait_for(|s| s.target_laps == 12).await;
        assert_eq!(snapshot.state, RaceState::Countdown);
        assert_eq!(snapshot.clock, 0);
    }

    #[tokio::test]
    async fn test_frames_applied_in_order() {
        let server = MockServer::bind().await.expect("bind");
        let (mut harness, mut peer) = connected(&server, options_for(&server)).await;

        peer.send_json(json!({"type": "game_state", "state": "RACE"}))
            .await
            .expect("send");
        peer.send("not json").await.expect("send");
        peer.send_json(json!({"type": "lap_reset", "id": 0}))
            .await
            .expect("send");
        peer.send_json(json!({"type": "lap_count", "id": 2, "lap": 5, "lap_time": 61_234_000, "record": true}))
            .await
            .expect("send");
        peer.send_json(json!({"type": "lap_count", "id": 9, "lap": 6, "lap_time": 1, "record": true}))
            .await
            .expect("send");
        peer.send_json(json!({"type": "game_state", "state": "STOPPED"}))
            .await
            .expect("send");

        let snapshot = harness.wait_for(|s| s.state == RaceState::Stopped).await;
        let car = &snapshot.cars[2];
        assert_eq!(car.laps, 5);
        assert_eq!(car.last_lap_time, 61_234_000);
        assert_eq!(car.best_lap_time, 61_234_000);
        assert!(snapshot.cars.iter().all(|c| c.laps != 6));
    }

    #[tokio::test]
    async fn test_disconnect_then_retry_after_delay() {
        let server = MockServer::bind().await.expect("bind");
        let (mut harness, peer) = connected(&server, options_for(&server)).await;

        let closed_at = Instant::now();
        peer.close().await.expect("close");

        let snapshot = harness.wait_for(|s| !s.connected).await;
        assert_eq!(snapshot.state, RaceState::Disconnected);

        let _peer = server.accept().await.expect("client reconnects");
        let elapsed = closed_at.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "retried after {elapsed:?}");

        harness.wait_for(|s| s.connected).await;
    }

    #[tokio::test]
    async fn test_keeps_retrying_until_server_appears() {
        let server = MockServer::bind().await.expect("bind");
        let url = server.ws_url();
        let port = server.port();
        drop(server);

        let options = ClientOptions::new()
            .with_url(url)
            .with_reconnect_delay(Duration::from_millis(50));
        let mut harness = Harness::start(options);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!harness.snapshots.borrow().connected);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .expect("rebind same port");
        let (stream, _) = timeout(WAIT_TIMEOUT, listener.accept())
            .await
            .expect("retry in time")
            .expect("accept");
        let _ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");

        harness.wait_for(|s| s.connected).await;
    }

    #[tokio::test]
    async fn test_bind_car_sets_target_and_sends() {
        let server = MockServer::bind().await.expect("bind");
        let (mut harness, mut peer) = connected(&server, options_for(&server)).await;

        let slot = ControllerId::new(3).expect("slot");
        harness.intent(Intent::BindCar(slot));

        let snapshot = harness.wait_for(|s| s.binding_target.is_some()).await;
        assert_eq!(snapshot.binding_target, Some(slot));
        assert_eq!(
            peer.recv_json().await.expect("command"),
            json!({"type": "bind_car", "id": 3})
        );

        peer.send_json(json!({"type": "game_state", "state": "BINDING"}))
            .await
            .expect("send");
        peer.send_json(json!({"type": "game_state", "state": "STOPPED"}))
            .await
            .expect("send");

        let snapshot = harness.wait_for(|s| s.state == RaceState::Stopped).await;
        assert_eq!(snapshot.binding_target, None);
    }

    #[tokio::test]
    async fn test_settings_echo_leaves_roster_unchanged() {
        let server = MockServer::bind().await.expect("bind");
        let (mut harness, mut peer) = connected(&server, options_for(&server)).await;

        peer.send_json(json!({
            "type": "settings",
            "drivers": [
                {"id": 0, "name": "Unknown", "power": 100, "image": "images/driver.png"},
                {"id": 1, "name": "Ayrton", "power": 90, "image": "images/a.png"}
            ],
            "controllers": [
                {"id": 0, "driver": 1, "connected": true},
                {"id": 1, "driver": 0, "connected": false},
                {"id": 2, "driver": 0, "connected": false},
                {"id": 3, "driver": 0, "connected": false},
                {"id": 4, "driver": 0, "connected": false},
                {"id": 5, "driver": 0, "connected": false}
            ],
            "digital_car_mode": true
        }))
        .await
        .expect("send");

        let before = harness.wait_for(|s| s.digital_car_mode).await;
        harness.intent(Intent::SaveSettings(Roster::from_snapshot(&before)));

        let command = peer.recv_json().await.expect("command");
        assert_eq!(command["type"], "settings");

        peer.send_json(command).await.expect("echo");
        peer.send_json(json!({"type": "laps_update", "laps": 3}))
            .await
            .expect("send");

        let after = harness.wait_for(|s| s.target_laps == 3).await;
        assert_eq!(after.drivers, before.drivers);
        assert_eq!(after.controllers, before.controllers);
        assert_eq!(after.digital_car_mode, before.digital_car_mode);
    }

    #[tokio::test]
    async fn test_local_audio_plays_cues() {
        let server = MockServer::bind().await.expect("bind");
        let player = MemoryPlayer::new();
        let options = options_for(&server).with_audio(AudioOutput::local(player.clone()));
        let (mut harness, mut peer) = connected(&server, options).await;

        peer.send_json(json!({"type": "countdown", "number": 4}))
            .await
            .expect("send");
        peer.send_json(json!({"type": "false_start", "id": 1}))
            .await
            .expect("send");

        let snapshot = harness.wait_for(|s| s.show_false_start).await;
        assert_eq!(snapshot.false_start_car, CarId::new(1));
        assert_eq!(
            player.plays(),
            ["sounds/start.wav", "sounds/start2.wav", "sounds/false_start.wav"]
        );
    }

    #[tokio::test]
    async fn test_remote_audio_sends_play_sound() {
        let server = MockServer::bind().await.expect("bind");
        let options = options_for(&server).with_audio(AudioOutput::Remote);
        let (harness, mut peer) = connected(&server, options).await;

        peer.send_json(json!({"type": "game_finished", "time": 90_000_000, "positions": [2, 0]}))
            .await
            .expect("send");
        assert_eq!(
            peer.recv_json().await.expect("command"),
            json!({"type": "play_sound", "file": "sounds/finish.wav"})
        );

        harness.intent(Intent::PlaySound("custom/horn.wav".to_string()));
        assert_eq!(
            peer.recv_json().await.expect("command"),
            json!({"type": "play_sound", "file": "custom/horn.wav"})
        );
    }

    #[tokio::test]
    async fn test_offline_drop_policy() {
        let server = MockServer::bind().await.expect("bind");
        let url = server.ws_url();
        drop(server);

        let options = ClientOptions::new().with_url(url);
        let mut harness = Harness::start(options);

        let slot = ControllerId::new(0).expect("slot");
        harness.intent(Intent::BindCar(slot));
        let snapshot = harness.wait_for(|s| s.binding_target.is_some()).await;
        assert!(!snapshot.connected);
    }

    #[tokio::test]
    async fn test_offline_buffer_flushes_on_open() {
        let server = MockServer::bind().await.expect("bind");
        let options = options_for(&server)
            .with_reconnect_delay(Duration::from_millis(100))
            .with_offline_policy(OfflinePolicy::Buffer { capacity: 2 });
        let (mut harness, peer) = connected(&server, options).await;

        peer.close().await.expect("close");
        harness.wait_for(|s| !s.connected).await;

        for id in [0, 1, 2] {
            harness.intent(Intent::BindCar(ControllerId::new(id).expect("slot")));
        }
        harness.wait_for(|s| s.binding_target == ControllerId::new(2)).await;

        let mut peer = server.accept().await.expect("client reconnects");
        assert_eq!(
            peer.recv_json().await.expect("first"),
            json!({"type": "bind_car", "id": 1})
        );
        assert_eq!(
            peer.recv_json().await.expect("second"),
            json!({"type": "bind_car", "id": 2})
        );
    }

    #[tokio::test]
    async fn test_reconnect_supersedes_link() {
        let server = MockServer::bind().await.expect("bind");
        let (mut harness, mut old_peer) = connected(&server, options_for(&server)).await;

        harness.intent(Intent::Reconnect);
        let mut new_peer = server.accept().await.expect("second connection");
        assert_ok!(old_peer.recv().await);

        // Frames from the superseded link never reach the store.
        let _ = old_peer
            .send_json(json!({"type": "laps_update", "laps": 99}))
            .await;
        new_peer
            .send_json(json!({"type": "laps_update", "laps": 7}))
            .await
            .expect("send");

        let snapshot = harness.wait_for(|s| s.target_laps == 7).await;
        assert!(snapshot.connected);
        assert_ne!(harness.snapshots.borrow().target_laps, 99);
    }

    #[tokio::test]
    async fn test_shutdown_closes_connection() {
        let server = MockServer::bind().await.expect("bind");
        let (harness, mut peer) = connected(&server, options_for(&server)).await;

        harness.intent(Intent::Shutdown);
        assert_eq!(peer.recv().await.expect("recv"), None);
        assert_ok!(timeout(WAIT_TIMEOUT, harness.intent_tx.closed()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_false_start_banner_expires() {
        let mut store = RaceStore::new();
        let now = Instant::now();
        store.apply(
            crate::protocol::ServerMessage::FalseStart {
                id: CarId::new(0).expect("car"),
            },
            now,
        );
        assert_eq!(
            store.next_deadline(),
            Some(now + crate::race::effects::FALSE_START_DURATION)
        );

        sleep_until_opt(store.next_deadline()).await;
        assert!(store.expire(Instant::now()));
        assert!(!store.snapshot().show_false_start);
    }
}
