//! Type-safe identifiers for track entities.
//!
//! Newtype wrappers keep car slots, controller slots, roster entries and
//! connection generations from being mixed up.
//!
//! | Type | Range | Source |
//! |------|-------|--------|
//! | [`CarId`] | `0..6` | Server (`lap_count`, `false_start`) |
//! | [`ControllerId`] | `0..6` | Server (`settings`, `controller_changed`) and user (`bind_car`) |
//! | [`DriverId`] | any `u32`, `0` reserved | Server roster and local roster edits |
//! | [`ConnectionId`] | process-unique | Generated per connection attempt |
//!
//! Car and controller ids validate on construction and on deserialization,
//! so a frame carrying slot `7` fails to decode instead of reaching the store.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ============================================================================
// Constants
// ============================================================================

/// Number of physical car slots on the track.
pub const CAR_COUNT: usize = 6;

/// Number of physical controller slots.
pub const CONTROLLER_COUNT: usize = 6;

// ============================================================================
// Slot Macro
// ============================================================================

/// Generates a validated slot id in `0..$count`.
macro_rules! slot_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $count:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub struct $name(u8);

        impl $name {
            /// Creates an id, returning `None` when out of range.
            #[inline]
            #[must_use]
            pub const fn new(id: u8) -> Option<Self> {
                if (id as usize) < $count {
                    Some(Self(id))
                } else {
                    None
                }
            }

            /// Returns the raw slot number.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u8 {
                self.0
            }

            /// Returns the slot as an array index.
            #[inline]
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Iterates over every slot in ascending order.
            pub fn all() -> impl Iterator<Item = Self> {
                (0..$count as u8).map(Self)
            }

            /// Builds a per-slot array, index == id.
            pub fn array<T>(mut f: impl FnMut(Self) -> T) -> [T; $count] {
                std::array::from_fn(|i| f(Self(i as u8)))
            }
        }

        impl TryFrom<u8> for $name {
            type Error = Error;

            fn try_from(id: u8) -> Result<Self, Self::Error> {
                Self::new(id).ok_or_else(|| Error::invalid_id($kind, u32::from(id)))
            }
        }

        impl From<$name> for u8 {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ============================================================================
// CarId
// ============================================================================

slot_id!(
    /// Car slot on the track (`0..6`).
    CarId,
    "car",
    CAR_COUNT
);

// ============================================================================
// ControllerId
// ============================================================================

slot_id!(
    /// Handset slot on the control unit (`0..6`).
    ControllerId,
    "controller",
    CONTROLLER_COUNT
);

// ============================================================================
// DriverId
// ============================================================================

/// Roster entry identifier.
///
/// Id `0` is the reserved "Unknown" driver and is always present.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DriverId(u32);

impl DriverId {
    /// The reserved "Unknown" driver.
    pub const UNKNOWN: Self = Self(0);

    /// Creates a driver id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns `true` for the reserved id `0`.
    #[inline]
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ConnectionId
// ============================================================================

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Generation counter for connection attempts.
///
/// Every attempt gets a fresh id so link events from a superseded
/// connection can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next connection id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
