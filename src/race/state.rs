//! Race data model.
//!
//! Plain data shared by the store, the wire protocol and the render layer.
//! Everything here is `Serialize` so a view can forward a [`RaceSnapshot`]
//! verbatim.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::{CAR_COUNT, CONTROLLER_COUNT, CarId, ControllerId, DriverId};

// ============================================================================
// Constants
// ============================================================================

/// Display name of the reserved driver id `0`.
pub const UNKNOWN_DRIVER_NAME: &str = "Unknown";

/// Portrait used for new and unknown drivers.
pub const DEFAULT_PORTRAIT: &str = "images/driver.png";

/// Throttle percentage for new drivers.
pub const DEFAULT_POWER: u8 = 100;

/// Binding slot value meaning "no controller is being bound".
///
/// One past the last valid controller id, as the server expects.
pub const BIND_NONE: u8 = 6;

// ============================================================================
// RaceState
// ============================================================================

/// Server-driven phase of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceState {
    /// No open connection to the race server.
    #[default]
    Disconnected,
    /// Track power off, nothing running.
    Stopped,
    /// Counting race with a lap target.
    Race,
    /// Free practice.
    Training,
    /// Start lights are running.
    Countdown,
    /// A controller is being assigned to a car.
    Binding,
}

impl RaceState {
    /// Returns `true` while the clock must be pinned at zero.
    #[inline]
    #[must_use]
    pub const fn is_countdown(self) -> bool {
        matches!(self, Self::Countdown)
    }
}

// ============================================================================
// CarStat
// ============================================================================

/// Lap statistics for one car slot. Times are microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarStat {
    /// Car slot.
    pub id: CarId,
    /// Completed laps.
    pub laps: u32,
    /// Duration of the last completed lap.
    pub last_lap_time: u64,
    /// Fastest lap this race, `0` when not set.
    pub best_lap_time: u64,
}

impl CarStat {
    /// Creates a zeroed stat for a slot.
    #[inline]
    #[must_use]
    pub const fn new(id: CarId) -> Self {
        Self {
            id,
            laps: 0,
            last_lap_time: 0,
            best_lap_time: 0,
        }
    }

    /// Zeroes laps and times, keeping the slot.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }
}

// ============================================================================
// Controller
// ============================================================================

/// One handset slot and the driver assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    /// Handset slot.
    pub id: ControllerId,
    /// Assigned roster entry.
    #[serde(rename = "driver", default)]
    pub driver_id: DriverId,
    /// Handset currently seen by the control unit.
    #[serde(default)]
    pub connected: bool,
}

impl Controller {
    /// Creates an unassigned, disconnected controller.
    #[inline]
    #[must_use]
    pub const fn new(id: ControllerId) -> Self {
        Self {
            id,
            driver_id: DriverId::UNKNOWN,
            connected: false,
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Driver roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    /// Roster id, `0` is reserved.
    pub id: DriverId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Throttle limit in percent.
    #[serde(default = "default_power")]
    pub power: u8,
    /// Portrait asset path.
    #[serde(rename = "image", default = "default_portrait")]
    pub portrait: String,
}

impl Driver {
    /// Creates a driver with default power and portrait.
    #[must_use]
    pub fn new(id: DriverId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            power: DEFAULT_POWER,
            portrait: DEFAULT_PORTRAIT.to_string(),
        }
    }

    /// The reserved id-0 driver.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(DriverId::UNKNOWN, UNKNOWN_DRIVER_NAME)
    }
}

fn default_power() -> u8 {
    DEFAULT_POWER
}

fn default_portrait() -> String {
    DEFAULT_PORTRAIT.to_string()
}

// ============================================================================
// Fixed Slot Arrays
// ============================================================================

/// One [`CarStat`] per car slot, index == id.
pub type CarStats = [CarStat; CAR_COUNT];

/// One [`Controller`] per handset slot, index == id.
pub type Controllers = [Controller; CONTROLLER_COUNT];

/// Builds zeroed stats for every car slot.
#[must_use]
pub fn default_cars() -> CarStats {
    CarId::array(CarStat::new)
}

/// Builds unassigned controllers for every handset slot.
#[must_use]
pub fn default_controllers() -> Controllers {
    ControllerId::array(Controller::new)
}

// ============================================================================
// RaceSnapshot
// ============================================================================

/// Read-only copy of the race state handed to the render layer.
///
/// Published once per processed frame, timer expiry or link change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceSnapshot {
    /// Current phase.
    pub state: RaceState,
    /// Whether a connection to the server is open.
    pub connected: bool,
    /// Race clock in microseconds.
    pub clock: u64,
    /// Start light number, `0` hides the lights.
    pub countdown: u8,
    /// Laps that complete a race.
    pub target_laps: u32,
    /// Per-car statistics.
    pub cars: CarStats,
    /// Car ids in race order.
    pub positions: Vec<u8>,
    /// Handset slots.
    pub controllers: Controllers,
    /// Driver roster, always contains id `0`.
    pub drivers: Vec<Driver>,
    /// Control unit in digital mode.
    pub digital_car_mode: bool,
    /// Controller currently being bound.
    pub binding_target: Option<ControllerId>,
    /// First car to reach the lap target this race.
    pub winner: Option<CarId>,
    /// Race-finished overlay visible.
    pub show_race_finished: bool,
    /// False-start banner visible.
    pub show_false_start: bool,
    /// Car that jumped the start.
    pub false_start_car: Option<CarId>,
    /// Lap-target change pulse visible.
    pub show_laps_update: bool,
}

impl Default for RaceSnapshot {
    fn default() -> Self {
        Self {
            state: RaceState::Disconnected,
            connected: false,
            clock: 0,
            countdown: 0,
            target_laps: 0,
            cars: default_cars(),
            positions: Vec::new(),
            controllers: default_controllers(),
            drivers: vec![Driver::unknown()],
            digital_car_mode: false,
            binding_target: None,
            winner: None,
            show_race_finished: false,
            show_false_start: false,
            false_start_car: None,
            show_laps_update: false,
        }
    }
}

impl RaceSnapshot {
    /// Returns `true` once a car has reached the lap target this race.
    #[inline]
    #[must_use]
    pub const fn has_winner(&self) -> bool {
        self.winner.is_some()
    }

    /// Binding slot in wire form, [`BIND_NONE`] when idle.
    #[inline]
    #[must_use]
    pub fn binding_slot(&self) -> u8 {
        self.binding_target.map_or(BIND_NONE, ControllerId::get)
    }

    /// Looks up a roster entry by id.
    #[must_use]
    pub fn driver(&self, id: DriverId) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.id == id)
    }

    /// Resolves the driver of a controller, falling back to id `0`.
    #[must_use]
    pub fn driver_for(&self, controller: ControllerId) -> Option<&Driver> {
        let id = self.controllers[controller.index()].driver_id;
        self.driver(id).or_else(|| self.driver(DriverId::UNKNOWN))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot() {
        let snapshot = RaceSnapshot::default();
        assert_eq!(snapshot.state, RaceState::Disconnected);
        assert_eq!(snapshot.cars.len(), 6);
        assert_eq!(snapshot.controllers.len(), 6);
        for (i, car) in snapshot.cars.iter().enumerate() {
            assert_eq!(car.id.index(), i);
        }
        for (i, controller) in snapshot.controllers.iter().enumerate() {
            assert_eq!(controller.id.index(), i);
            assert!(controller.driver_id.is_unknown());
        }
        assert_eq!(snapshot.drivers, vec![Driver::unknown()]);
        assert_eq!(snapshot.binding_slot(), BIND_NONE);
    }

    #[test]
    fn test_driver_wire_format() {
        let driver = Driver::new(DriverId::new(3), "Ayrton");
        let json = serde_json::to_value(&driver).expect("serialize");
        assert_eq!(json["id"], 3);
        assert_eq!(json["image"], DEFAULT_PORTRAIT);
        assert_eq!(json["power"], 100);

        let parsed: Driver =
            serde_json::from_str(r#"{"id": 4, "name": "Jim"}"#).expect("parse");
        assert_eq!(parsed.power, DEFAULT_POWER);
        assert_eq!(parsed.portrait, DEFAULT_PORTRAIT);
    }

    #[test]
    fn test_controller_wire_format() {
        let parsed: Controller = serde_json::from_str(r#"{"id": 2, "driver": 5}"#).expect("parse");
        assert_eq!(parsed.id.get(), 2);
        assert_eq!(parsed.driver_id, DriverId::new(5));
        assert!(!parsed.connected);

        assert!(serde_json::from_str::<Controller>(r#"{"id": 6, "driver": 0}"#).is_err());
    }

    #[test]
    fn test_driver_for_falls_back_to_unknown() {
        let mut snapshot = RaceSnapshot::default();
        let slot = ControllerId::new(1).expect("slot");
        snapshot.controllers[1].driver_id = DriverId::new(42);

        let driver = snapshot.driver_for(slot).expect("fallback");
        assert!(driver.id.is_unknown());
    }

    #[test]
    fn test_car_reset() {
        let mut car = CarStat::new(CarId::new(2).expect("slot"));
        car.laps = 9;
        car.best_lap_time = 5_000_000;
        car.reset();
        assert_eq!(car, CarStat::new(CarId::new(2).expect("slot")));
    }
}
