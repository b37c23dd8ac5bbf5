//! Settings draft for the roster editor.
//!
//! A [`Roster`] is copied out of a snapshot, edited locally, and sent back
//! with [`RaceClient::save_settings`](crate::RaceClient::save_settings). The
//! store only changes once the server echoes the `settings` event.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::{ControllerId, DriverId};

use super::state::{Controllers, Driver, RaceSnapshot};

// ============================================================================
// Roster
// ============================================================================

/// Editable copy of drivers, controller assignment and mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Driver roster, id `0` always present.
    pub drivers: Vec<Driver>,
    /// All controller slots.
    pub controllers: Controllers,
    /// Control unit in digital mode.
    pub digital_car_mode: bool,
}

impl Roster {
    /// Copies the roster part of a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &RaceSnapshot) -> Self {
        Self {
            drivers: snapshot.drivers.clone(),
            controllers: snapshot.controllers.clone(),
            digital_car_mode: snapshot.digital_car_mode,
        }
    }

    /// Returns the id the next added driver will get.
    ///
    /// One past the highest id in the roster, so ids of removed drivers are
    /// not reused while higher ones remain.
    #[must_use]
    pub fn next_driver_id(&self) -> DriverId {
        let next = self
            .drivers
            .iter()
            .map(|d| d.id.get().saturating_add(1))
            .max()
            .unwrap_or(0);
        DriverId::new(next)
    }

    /// Appends a driver with default power and portrait.
    pub fn add_driver(&mut self, name: impl Into<String>) -> DriverId {
        let id = self.next_driver_id();
        self.drivers.push(Driver::new(id, name));
        id
    }

    /// Looks up a driver.
    #[must_use]
    pub fn driver(&self, id: DriverId) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.id == id)
    }

    /// Looks up a driver for editing name, power or portrait.
    pub fn driver_mut(&mut self, id: DriverId) -> Option<&mut Driver> {
        self.drivers.iter_mut().find(|d| d.id == id)
    }

    /// Removes a driver and resets controllers that used it to id `0`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidId`] for id `0` or an id not in the roster
    pub fn remove_driver(&mut self, id: DriverId) -> Result<Driver> {
        if id.is_unknown() {
            return Err(Error::invalid_id("driver", id.get()));
        }

        let index = self
            .drivers
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::invalid_id("driver", id.get()))?;
        let removed = self.drivers.remove(index);

        for controller in &mut self.controllers {
            if controller.driver_id == id {
                controller.driver_id = DriverId::UNKNOWN;
            }
        }

        Ok(removed)
    }

    /// Assigns a driver to a controller slot.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidId`] if the driver is not in the roster
    pub fn assign(&mut self, controller: ControllerId, driver: DriverId) -> Result<()> {
        if self.driver(driver).is_none() {
            return Err(Error::invalid_id("driver", driver.get()));
        }
        self.controllers[controller.index()].driver_id = driver;
        Ok(())
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
