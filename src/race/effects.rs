//! Time-scoped overlay flags and audio cues.
//!
//! A [`TransientFlag`] is a boolean with a monotonic deadline. Arming sets the
//! flag and pushes the deadline to `now + duration`; re-arming supersedes the
//! previous deadline instead of stacking another timer. The engine sleeps
//! until [`TransientFlags::next_deadline`] and calls
//! [`TransientFlags::expire`], so tests drive time by passing instants
//! directly.
//!
//! # Durations
//!
//! | Flag | Duration | Guard |
//! |------|----------|-------|
//! | race finished | 18000 ms | 18000 ms |
//! | false start | 5000 ms | 5000 ms |
//! | laps update | 2000 ms | 1900 ms |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use crate::identifiers::CarId;

// ============================================================================
// Constants
// ============================================================================

/// Race-finished overlay lifetime.
pub const RACE_FINISHED_DURATION: Duration = Duration::from_millis(18_000);

/// False-start banner lifetime.
pub const FALSE_START_DURATION: Duration = Duration::from_millis(5_000);

/// Lap-target pulse lifetime.
pub const LAPS_UPDATE_DURATION: Duration = Duration::from_millis(2_000);

/// Minimum age of the latest arm before the lap-target pulse may clear.
pub const LAPS_UPDATE_GUARD: Duration = Duration::from_millis(1_900);

// ============================================================================
// TransientFlag
// ============================================================================

/// A boolean that clears itself once its deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientFlag {
    /// Time of the most recent arm, `None` while cleared.
    armed_at: Option<Instant>,
    /// How long an arm keeps the flag raised.
    duration: Duration,
    /// An expiry check only clears when the latest arm is at least this old.
    guard: Duration,
}

impl TransientFlag {
    /// Creates a cleared flag whose guard equals its duration.
    #[inline]
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self::with_guard(duration, duration)
    }

    /// Creates a cleared flag with an explicit debounce guard.
    ///
    /// `guard` is clamped to `duration` so the flag can always clear at
    /// its deadline.
    #[inline]
    #[must_use]
    pub const fn with_guard(duration: Duration, guard: Duration) -> Self {
        let guard = if guard.as_nanos() > duration.as_nanos() {
            duration
        } else {
            guard
        };
        Self {
            armed_at: None,
            duration,
            guard,
        }
    }

    /// Raises the flag and moves its deadline to `now + duration`.
    #[inline]
    pub fn arm(&mut self, now: Instant) {
        self.armed_at = Some(now);
    }

    /// Clears the flag immediately.
    #[inline]
    pub fn disarm(&mut self) {
        self.armed_at = None;
    }

    /// Returns `true` while the flag is raised.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.armed_at.is_some()
    }

    /// Returns when the pending expiry check fires, if raised.
    #[inline]
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.armed_at.map(|at| at + self.duration)
    }

    /// Runs the expiry check at `now`.
    ///
    /// Clears the flag only when the latest arm is older than the guard.
    /// Returns `true` if the flag went from raised to cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.armed_at {
            Some(at) if now.saturating_duration_since(at) >= self.guard => {
                self.armed_at = None;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// TransientFlags
// ============================================================================

/// The overlay flags the race store can arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientFlags {
    /// Race-finished overlay.
    pub race_finished: TransientFlag,
    /// False-start banner.
    pub false_start: TransientFlag,
    /// Car shown on the false-start banner.
    pub false_start_car: Option<CarId>,
    /// Lap-target change pulse.
    pub laps_update: TransientFlag,
}

impl Default for TransientFlags {
    fn default() -> Self {
        Self {
            race_finished: TransientFlag::new(RACE_FINISHED_DURATION),
            false_start: TransientFlag::new(FALSE_START_DURATION),
            false_start_car: None,
            laps_update: TransientFlag::with_guard(LAPS_UPDATE_DURATION, LAPS_UPDATE_GUARD),
        }
    }
}

impl TransientFlags {
    /// Earliest pending deadline across all raised flags.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.race_finished.deadline(),
            self.false_start.deadline(),
            self.laps_update.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Runs the expiry check of every flag whose deadline is due at `now`.
    ///
    /// A flag is never checked before its own deadline, so another flag's
    /// timer cannot cut a pulse short. Returns `true` if any flag cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if Self::check(&mut self.race_finished, now) {
            trace!("race-finished overlay cleared");
            changed = true;
        }
        if Self::check(&mut self.false_start, now) {
            trace!("false-start banner cleared");
            self.false_start_car = None;
            changed = true;
        }
        if Self::check(&mut self.laps_update, now) {
            trace!("laps-update pulse cleared");
            changed = true;
        }

        changed
    }

    fn check(flag: &mut TransientFlag, now: Instant) -> bool {
        match flag.deadline() {
            Some(deadline) if deadline <= now => flag.expire(now),
            _ => false,
        }
    }
}

// ============================================================================
// Cue
// ============================================================================

/// Audio cue triggered by a race event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// First start sound at the start tick.
    Start,
    /// Second start sound, layered over [`Cue::Start`].
    StartSecond,
    /// A car completed a lap.
    Lap,
    /// The first car reached the lap target.
    Finish,
    /// The race is over, results shown.
    Ceremony,
    /// A car jumped the start.
    FalseStart,
}

impl Cue {
    /// Sound file name, relative to the configured sound directory.
    #[inline]
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Start => "start.wav",
            Self::StartSecond => "start2.wav",
            Self::Lap => "lap.wav",
            Self::Finish => "winner.wav",
            Self::Ceremony => "finish.wav",
            Self::FalseStart => "false_start.wav",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_flag_clears_at_deadline() {
        let t0 = Instant::now();
        let mut flag = TransientFlag::new(RACE_FINISHED_DURATION);
        flag.arm(t0);

        assert!(flag.is_active());
        assert_eq!(flag.deadline(), Some(t0 + ms(18_000)));
        assert!(!flag.expire(t0 + ms(17_999)));
        assert!(flag.is_active());
        assert!(flag.expire(t0 + ms(18_000)));
        assert!(!flag.is_active());
        assert_eq!(flag.deadline(), None);
    }

    #[test]
    fn test_rearm_supersedes_deadline() {
        let t0 = Instant::now();
        let mut flag = TransientFlag::new(FALSE_START_DURATION);
        flag.arm(t0);
        flag.arm(t0 + ms(3_000));

        // The first arm's check would fire here; the re-arm keeps it raised.
        assert!(!flag.expire(t0 + ms(5_000)));
        assert!(flag.is_active());
        assert_eq!(flag.deadline(), Some(t0 + ms(8_000)));
        assert!(flag.expire(t0 + ms(8_000)));
    }

    #[test]
    fn test_laps_guard() {
        let t0 = Instant::now();
        let mut flag = TransientFlag::with_guard(LAPS_UPDATE_DURATION, LAPS_UPDATE_GUARD);
        flag.arm(t0);

        assert!(!flag.expire(t0 + ms(1_899)));
        assert!(flag.expire(t0 + ms(1_900)));
    }

    #[test]
    fn test_guard_clamped_to_duration() {
        let t0 = Instant::now();
        let mut flag = TransientFlag::with_guard(ms(100), ms(500));
        flag.arm(t0);
        assert!(flag.expire(t0 + ms(100)));
    }

    #[test]
    fn test_disarm() {
        let mut flag = TransientFlag::new(ms(10));
        flag.arm(Instant::now());
        flag.disarm();
        assert!(!flag.is_active());
        assert!(!flag.expire(Instant::now() + ms(20)));
    }

    #[test]
    fn test_next_deadline_is_earliest() {
        let t0 = Instant::now();
        let mut flags = TransientFlags::default();
        assert_eq!(flags.next_deadline(), None);

        flags.race_finished.arm(t0);
        flags.false_start.arm(t0);
        assert_eq!(flags.next_deadline(), Some(t0 + FALSE_START_DURATION));

        flags.false_start_car = CarId::new(3);
        assert!(flags.expire(t0 + FALSE_START_DURATION));
        assert_eq!(flags.false_start_car, None);
        assert_eq!(flags.next_deadline(), Some(t0 + RACE_FINISHED_DURATION));
        assert!(!flags.expire(t0 + FALSE_START_DURATION));
    }

    #[test]
    fn test_laps_burst_stays_raised() {
        let t0 = Instant::now();
        let mut flags = TransientFlags::default();

        // Events 1500 ms apart; expiry checks run at every deadline.
        let arms = [0, 1_500, 3_000, 4_500];
        for &at in &arms {
            let now = t0 + ms(at);
            flags.expire(now);
            flags.laps_update.arm(now);
            assert!(flags.laps_update.is_active());
        }

        let last = t0 + ms(4_500);
        assert!(!flags.expire(last + ms(1_950)));
        assert!(!flags.expire(last + ms(1_999)));
        assert!(flags.laps_update.is_active());
        assert!(flags.expire(last + LAPS_UPDATE_DURATION));
        assert!(!flags.laps_update.is_active());
    }

    #[test]
    fn test_cue_files() {
        assert_eq!(Cue::Start.file_name(), "start.wav");
        assert_eq!(Cue::StartSecond.file_name(), "start2.wav");
        assert_eq!(Cue::Ceremony.file_name(), "finish.wav");
    }
}
