//! Shared formatting helpers for CLI commands

use chrono::{DateTime, Local};

/// Format a timestamp relative to `now_ms` ("2 hours ago", "in 3 days")
pub fn format_relative_time(ts_ms: i64, now_ms: i64) -> String {
    let delta_secs = (now_ms - ts_ms) / 1000;
    let (seconds, future) = if delta_secs >= 0 {
        (delta_secs, false)
    } else {
        (-delta_secs, true)
    };

    let span = if seconds < 60 {
        plural(seconds, "second")
    } else if seconds < 3600 {
        plural(seconds / 60, "minute")
    } else if seconds < 86400 {
        plural(seconds / 3600, "hour")
    } else if seconds < 604800 {
        plural(seconds / 86400, "day")
    } else {
        plural(seconds / 604800, "week")
    };

    if future {
        format!("in {}", span)
    } else {
        format!("{} ago", span)
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Format an instant as local wall time ("2024-01-03 14:30:00 +01:00")
pub fn format_absolute_time(instant: DateTime<Local>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S %:z").to_string()
}
