//! Fleet time: minutes-from-midnight arithmetic and timestamp parsing.
//!
//! All scheduling decisions work in **minutes from midnight** on a single
//! operating day. Timestamps arrive as `"YYYY-MM-DD HH:MM:SS"` strings; the
//! date part is dropped and seconds are truncated.

use chrono::NaiveDateTime;
use tracing::warn;

/// Start of the operating day: 06:00.
pub const START_OF_DAY_MIN: f64 = 360.0;
/// Default end of the simulated day: 20:00.
pub const END_OF_DAY_MIN: f64 = 1200.0;
/// Simulated minutes advanced per tick.
pub const TICK_STEP_MIN: f64 = 30.0;
/// Bookings whose pickup falls within this window of the current tick are locked.
pub const LOCK_WINDOW_MIN: f64 = 120.0;
/// Minutes of service time appended after every completed ride.
pub const SERVICE_BUFFER_MIN: f64 = 30.0;
/// Flat planning speed in km/h.
pub const PLANNING_SPEED_KMH: f64 = 30.0;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Minutes from midnight for a `"YYYY-MM-DD HH:MM:SS"` timestamp.
///
/// Malformed input logs a warning and falls back to [`START_OF_DAY_MIN`] so a
/// bad record degrades to an early-morning booking instead of aborting a pass.
pub fn minutes_from_midnight(timestamp: &str) -> f64 {
    match NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT) {
        Ok(dt) => {
            use chrono::Timelike;
            f64::from(dt.hour() * 60 + dt.minute())
        }
        Err(err) => {
            warn!(timestamp, %err, "failed to parse timestamp, using start of day");
            START_OF_DAY_MIN
        }
    }
}

/// Travel time in minutes for `km` kilometres at the flat planning speed.
pub fn travel_time_min(km: f64) -> f64 {
    km / PLANNING_SPEED_KMH * 60.0
}

/// `HH:MM` rendering of a minutes-from-midnight value, for logs and tables.
pub fn format_minute(minute: f64) -> String {
    let total = minute.max(0.0) as u64;
    format!("{:02}:{:02}", (total / 60) % 24, total % 60)
}
