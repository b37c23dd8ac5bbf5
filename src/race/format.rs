//! Display formatting for race times.
//!
//! All inputs are microseconds, as sent by the server.

/// Microseconds per second.
const MICROS_PER_SEC: u64 = 1_000_000;

/// Formats a lap time as decimal seconds (`61.234`).
///
/// Returns an empty string for `0`, which means "no lap yet".
#[must_use]
pub fn format_lap_time(micros: u64) -> String {
    if micros == 0 {
        return String::new();
    }
    (micros as f64 / MICROS_PER_SEC as f64).to_string()
}

/// Formats the race clock as `HH:MM:SS`.
///
/// Hours are zero-padded to two digits and keep counting past 99.
#[must_use]
pub fn format_clock(micros: u64) -> String {
    let total = micros / MICROS_PER_SEC;
    let secs = total % 60;
    let mins = (total / 60) % 60;
    let hours = total / 3600;
    format!("{hours:02}:{mins:02}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lap_time() {
        assert_eq!(format_lap_time(0), "");
        assert_eq!(format_lap_time(61_234_000), "61.234");
        assert_eq!(format_lap_time(5_000_000), "5");
        assert_eq!(format_lap_time(500_000), "0.5");
    }

    #[test]
    fn test_clock() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(999_999), "00:00:00");
        assert_eq!(format_clock(61_500_000), "00:01:01");
        assert_eq!(format_clock(3_723_000_000), "01:02:03");
        assert_eq!(format_clock(360_000 * MICROS_PER_SEC), "100:00:00");
    }
}
