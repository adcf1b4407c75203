//! Wall-clock time
//!
//! - [`ntp`]: SNTP packet codec
//! - [`clock`]: NTP-disciplined clock with a fixed UTC offset
//!
//! The schedule is compared against `HH:MM:SS` strings, so the clock's only
//! job is to produce one per tick.

pub mod clock;
pub mod ntp;

use core::fmt::Write;

use heapless::String;

pub use clock::{ClockReading, ClockState, NtpClock, NtpTransport, SyncAttempt};
pub use ntp::NtpError;

/// Length of an `HH:MM:SS` string
pub const HMS_LEN: usize = 8;

/// Seconds per day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// `HH:MM:SS` time of day
pub type ClockString = String<HMS_LEN>;

/// Source of the current local time of day
pub trait TimeSource {
    /// Read the current time, refreshing from the network when due
    fn now(&mut self) -> impl core::future::Future<Output = ClockReading>;
}

/// Format a Unix timestamp as local `HH:MM:SS`
pub fn format_hms(unix_seconds: i64, utc_offset_s: i32) -> ClockString {
    let of_day = (unix_seconds + utc_offset_s as i64).rem_euclid(SECONDS_PER_DAY);
    let hours = of_day / 3600;
    let minutes = (of_day % 3600) / 60;
    let seconds = of_day % 60;

    let mut out = ClockString::new();
    // Two digits per field always fit
    let _ = write!(out, "{:02}:{:02}:{:02}", hours, minutes, seconds);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0, 0).as_str(), "00:00:00");
        assert_eq!(format_hms(0, -10_800).as_str(), "21:00:00");
        // 2024-01-01T11:00:00Z is 08:00:00 in UTC-3
        assert_eq!(format_hms(1_704_106_800, -10_800).as_str(), "08:00:00");
        assert_eq!(format_hms(86_399, 0).as_str(), "23:59:59");
        assert_eq!(format_hms(86_400, 0).as_str(), "00:00:00");
    }

    proptest! {
        #[test]
        fn formatted_time_is_well_formed(unix in 0i64..4_000_000_000, offset in -50_400i32..50_400) {
            let s = format_hms(unix, offset);
            prop_assert_eq!(s.len(), HMS_LEN);

            let bytes = s.as_bytes();
            prop_assert_eq!(bytes[2], b':');
            prop_assert_eq!(bytes[5], b':');

            let h: u32 = s[0..2].parse().unwrap();
            let m: u32 = s[3..5].parse().unwrap();
            let sec: u32 = s[6..8].parse().unwrap();
            prop_assert!(h < 24 && m < 60 && sec < 60);

            let back = (h * 3600 + m * 60 + sec) as i64;
            prop_assert_eq!(back, (unix + offset as i64).rem_euclid(SECONDS_PER_DAY));
        }

        #[test]
        fn formatting_repeats_daily(unix in 0i64..4_000_000_000, offset in -50_400i32..50_400) {
            prop_assert_eq!(format_hms(unix, offset), format_hms(unix + SECONDS_PER_DAY, offset));
        }
    }
}
