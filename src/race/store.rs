//! The live race state and its mutation rules.
//!
//! [`RaceStore`] is owned by the engine task and mutated only through the
//! handlers below, one frame at a time. Each call to [`RaceStore::apply`] is
//! one complete mutation pass; the engine publishes a single
//! [`RaceSnapshot`] afterwards.
//!
//! # Handler Rules
//!
//! | Event | Effect |
//! |-------|--------|
//! | `game_state` | Set phase; leaving `Binding` clears the binding target |
//! | `game_update` | Clock (pinned to 0 during countdown), positions replaced |
//! | `game_finished` | As `game_update`, plus finish overlay and ceremony cue |
//! | `lap_count` | Car stats; first car to the target in a race wins |
//! | `false_start` | Finish overlay off, false-start banner on |
//! | `laps_update` | Lap target; pulse except for the first after connect |
//! | `countdown` | Light number; tick 4 resets cars and winner |
//! | `settings` | Roster (if non-empty), controllers and mode replaced |
//! | `controller_changed` | Only the `connected` field of one controller |

// ============================================================================
// Imports
// ============================================================================

use tokio::time::Instant;
use tracing::{debug, info};

use crate::identifiers::{CarId, ControllerId, DriverId};
use crate::protocol::{ServerMessage, ServerState};

use super::effects::{Cue, TransientFlags};
use super::state::{CarStat, Controller, Controllers, Driver, RaceSnapshot, RaceState};

// ============================================================================
// Constants
// ============================================================================

/// Countdown number that marks the start of a new race.
pub const START_TICK: u8 = 4;

// ============================================================================
// RaceStore
// ============================================================================

/// Single owner of the live race state.
#[derive(Debug, Clone, Default)]
pub struct RaceStore {
    /// Plain race data; flag booleans are filled in by [`Self::snapshot`].
    race: RaceSnapshot,
    /// Timed overlay flags.
    flags: TransientFlags,
    /// Set once the first `laps_update` on the current connection was seen.
    laps_initialized: bool,
}

// ============================================================================
// RaceStore - Accessors
// ============================================================================

impl RaceStore {
    /// Creates a store in the `Disconnected` state with zeroed data.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a render-ready copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> RaceSnapshot {
        let mut snapshot = self.race.clone();
        snapshot.show_race_finished = self.flags.race_finished.is_active();
        snapshot.show_false_start = self.flags.false_start.is_active();
        snapshot.false_start_car = self.flags.false_start_car;
        snapshot.show_laps_update = self.flags.laps_update.is_active();
        snapshot
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub fn state(&self) -> RaceState {
        self.race.state
    }

    /// Race clock in microseconds.
    #[inline]
    #[must_use]
    pub fn clock(&self) -> u64 {
        self.race.clock
    }

    /// Lap target.
    #[inline]
    #[must_use]
    pub fn target_laps(&self) -> u32 {
        self.race.target_laps
    }

    /// Stats of one car.
    #[inline]
    #[must_use]
    pub fn car(&self, id: CarId) -> &CarStat {
        &self.race.cars[id.index()]
    }

    /// All controller slots.
    #[inline]
    #[must_use]
    pub fn controllers(&self) -> &Controllers {
        &self.race.controllers
    }

    /// Driver roster.
    #[inline]
    #[must_use]
    pub fn drivers(&self) -> &[Driver] {
        &self.race.drivers
    }

    /// Controller currently being bound.
    #[inline]
    #[must_use]
    pub fn binding_target(&self) -> Option<ControllerId> {
        self.race.binding_target
    }

    /// First car to reach the lap target this race.
    #[inline]
    #[must_use]
    pub fn winner(&self) -> Option<CarId> {
        self.race.winner
    }

    /// Timed overlay flags.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> &TransientFlags {
        &self.flags
    }

    /// Earliest pending flag deadline.
    #[inline]
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.flags.next_deadline()
    }
}

// ============================================================================
// RaceStore - Link and Local Mutations
// ============================================================================

impl RaceStore {
    /// A new connection opened.
    ///
    /// A fresh connection is a fresh race context, so the next `laps_update`
    /// is treated as initialisation again.
    pub fn on_connected(&mut self) {
        self.race.connected = true;
        self.laps_initialized = false;
    }

    /// The connection closed or failed.
    pub fn on_disconnected(&mut self) {
        self.race.connected = false;
        self.race.state = RaceState::Disconnected;
        self.race.binding_target = None;
    }

    /// Marks a controller as being bound, for immediate UI feedback.
    pub fn begin_binding(&mut self, id: ControllerId) {
        self.race.binding_target = Some(id);
    }

    /// Runs due flag expiry checks. Returns `true` if a flag cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        self.flags.expire(now)
    }
}

// ============================================================================
// RaceStore - Message Handlers
// ============================================================================

impl RaceStore {
    /// Applies one server message and returns the audio cues it triggers.
    pub fn apply(&mut self, message: ServerMessage, now: Instant) -> Vec<Cue> {
        match message {
            ServerMessage::GameState { state } => {
                self.on_game_state(state);
                Vec::new()
            }
            ServerMessage::GameUpdate { time, positions } => {
                self.on_game_update(time, positions);
                Vec::new()
            }
            ServerMessage::GameFinished { time, positions } => {
                self.on_game_finished(time, positions, now)
            }
            ServerMessage::LapCount {
                id,
                lap,
                lap_time,
                record,
            } => self.on_lap_count(id, lap, lap_time, record),
            ServerMessage::FalseStart { id } => self.on_false_start(id, now),
            ServerMessage::LapsUpdate { laps } => {
                self.on_laps_update(laps, now);
                Vec::new()
            }
            ServerMessage::Countdown { number } => self.on_countdown(number),
            ServerMessage::Settings {
                drivers,
                controllers,
                digital_car_mode,
            } => {
                self.on_settings(drivers, controllers, digital_car_mode);
                Vec::new()
            }
            ServerMessage::ControllerChanged { id, connected } => {
                self.race.controllers[id.index()].connected = connected;
                Vec::new()
            }
        }
    }

    fn on_game_state(&mut self, state: ServerState) {
        let previous = self.race.state;
        if previous == RaceState::Binding {
            self.race.binding_target = None;
        }
        self.race.state = RaceState::from(state);

        if previous != self.race.state {
            info!(from = ?previous, to = ?self.race.state, "Race state changed");
        }
    }

    fn on_game_update(&mut self, time: u64, positions: Vec<u8>) {
        self.race.clock = if self.race.state.is_countdown() {
            0
        } else {
            time
        };
        self.race.positions = positions;
    }

    fn on_game_finished(&mut self, time: u64, positions: Vec<u8>, now: Instant) -> Vec<Cue> {
        self.on_game_update(time, positions);
        self.flags.race_finished.arm(now);
        info!(time, positions = ?self.race.positions, "Race finished");
        vec![Cue::Ceremony]
    }

    fn on_lap_count(&mut self, id: CarId, lap: u32, lap_time: u64, record: bool) -> Vec<Cue> {
        let car = &mut self.race.cars[id.index()];
        car.laps = lap;
        car.last_lap_time = lap_time;
        if record {
            car.best_lap_time = lap_time;
        }

        let wins = self.race.state == RaceState::Race
            && lap == self.race.target_laps
            && self.race.winner.is_none();

        if wins {
            self.race.winner = Some(id);
            info!(car = %id, lap, "Winner");
            vec![Cue::Finish]
        } else {
            vec![Cue::Lap]
        }
    }

    fn on_false_start(&mut self, id: CarId, now: Instant) -> Vec<Cue> {
        self.flags.race_finished.disarm();
        self.flags.false_start_car = Some(id);
        self.flags.false_start.arm(now);
        info!(car = %id, "False start");
        vec![Cue::FalseStart]
    }

    fn on_laps_update(&mut self, laps: u32, now: Instant) {
        self.race.target_laps = laps;

        if self.laps_initialized {
            self.flags.laps_update.arm(now);
        } else {
            self.laps_initialized = true;
            debug!(laps, "Initial lap target");
        }
    }

    fn on_countdown(&mut self, number: u8) -> Vec<Cue> {
        self.race.countdown = number;

        if number != START_TICK {
            return Vec::new();
        }

        self.race.winner = None;
        for car in &mut self.race.cars {
            car.reset();
        }
        debug!("Start tick, car stats reset");
        vec![Cue::Start, Cue::StartSecond]
    }

    fn on_settings(
        &mut self,
        drivers: Option<Vec<Driver>>,
        controllers: Vec<Controller>,
        digital_car_mode: bool,
    ) {
        if let Some(mut drivers) = drivers.filter(|d| !d.is_empty()) {
            if !drivers.iter().any(|d| d.id.is_unknown()) {
                drivers.insert(0, Driver::unknown());
            }
            self.race.drivers = drivers;
        }

        let previous = &self.race.controllers;
        let mut next = ControllerId::array(|id| Controller {
            connected: previous[id.index()].connected,
            ..Controller::new(id)
        });
        for controller in controllers {
            let index = controller.id.index();
            next[index] = controller;
        }
        for controller in &mut next {
            if self.race.driver(controller.driver_id).is_none() {
                debug!(
                    controller = %controller.id,
                    driver = %controller.driver_id,
                    "Unknown driver, falling back to id 0"
                );
                controller.driver_id = DriverId::UNKNOWN;
            }
        }

        self.race.controllers = next;
        self.race.digital_car_mode = digital_car_mode;
    }
}

// ============================================================================
// Tests
// ============================================================================
