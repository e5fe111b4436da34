//! Timestamp display helpers.
//!
//! Book and trade records carry a UTC microsecond timestamp plus a
//! wall-clock display string (`HH:MM:SS:ffffff`) in a fixed offset from UTC,
//! e.g. `-21600` for exchange-local Central Standard Time.

use chrono::{DateTime, FixedOffset};

/// Microseconds per second.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Format a UTC microsecond timestamp as `HH:MM:SS:ffffff` in the given
/// fixed offset (seconds east of UTC).
///
/// Out-of-range timestamps or offsets fall back to the raw integer.
pub fn timestamp_string(timestamp_micros: i64, utc_offset_secs: i32) -> String {
    let (Some(offset), Some(utc)) = (
        FixedOffset::east_opt(utc_offset_secs),
        DateTime::from_timestamp_micros(timestamp_micros),
    ) else {
        return timestamp_micros.to_string();
    };

    utc.with_timezone(&offset)
        .format("%H:%M:%S:%6f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_formatting() {
        // 2011-07-22 08:20:00.095 UTC
        assert_eq!(timestamp_string(1_311_322_800_095_000, 0), "08:20:00:095000");
    }

    #[test]
    fn test_offset_formatting() {
        // Same instant in UTC-5
        assert_eq!(
            timestamp_string(1_311_322_800_095_000, -5 * 3600),
            "03:20:00:095000"
        );
    }

    #[test]
    fn test_invalid_offset_falls_back() {
        assert_eq!(timestamp_string(42, 100 * 3600), "42");
    }
}
