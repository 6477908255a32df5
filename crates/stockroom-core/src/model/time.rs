//! Microsecond timestamps.
//!
//! Every stored time is `i64` microseconds since the Unix epoch (UTC).

use chrono::{DateTime, Utc};

/// Current wall-clock time in microseconds.
#[must_use]
pub fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}

/// Convert stored microseconds to a UTC datetime.
///
/// Out-of-range values clamp to the Unix epoch rather than panicking.
#[must_use]
pub fn to_datetime(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

/// Next timestamp for an append that must sort after `latest`.
///
/// Returns `now` unless the clock has not moved past `latest`, in which case
/// it returns `latest + 1`.
#[must_use]
pub const fn monotonic_after(now: i64, latest: Option<i64>) -> i64 {
    match latest {
        Some(latest) if latest >= now => latest.saturating_add(1),
        _ => now,
    }
}
