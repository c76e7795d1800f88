//! Wall-clock helpers. All strainer timestamps are nanoseconds since the
//! Unix epoch held in an `i64`.

use chrono::Utc;

/// Nanoseconds in one second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// The current wall-clock time, in nanoseconds
pub fn now() -> i64 {
    let now = Utc::now();
    now.timestamp()
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(i64::from(now.timestamp_subsec_nanos()))
}

/// Convert nanoseconds to whole seconds, rounding toward negative infinity
#[inline]
pub fn as_seconds(ns: i64) -> i64 {
    let secs = ns / NANOS_PER_SECOND;
    if ns % NANOS_PER_SECOND < 0 {
        secs - 1
    } else {
        secs
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn seconds_floor() {
        assert_eq!(1, as_seconds(1_999_999_999));
        assert_eq!(0, as_seconds(0));
        assert_eq!(-1, as_seconds(-1));
        assert_eq!(1_500_000_000, as_seconds(1_500_000_000 * NANOS_PER_SECOND));
    }

    #[test]
    fn now_is_nanoseconds() {
        // 2001-09-09 in nanoseconds; any sane clock is past it
        assert!(now() > 1_000_000_000 * NANOS_PER_SECOND);
    }
}
