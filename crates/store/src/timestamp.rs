//! Rendering and parsing of stored timestamp strings
//!
//! Values are written in a human-readable form. The default `Display`
//! rendering matches the classic JavaScript `Date#toString` layout
//! (`Mon Apr 11 2016 08:39:10 GMT-0400`) so files written by older tools
//! keep parsing; `Rfc3339` trades that for millisecond precision.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// strftime layout of the `Display` format
const DISPLAY_LAYOUT: &str = "%a %b %d %Y %H:%M:%S GMT%z";

/// Wall-clock layouts without an offset, read as local time
const LOCAL_DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts, read as local midnight (`%B` also takes "Apr")
const LOCAL_DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%B %d %Y", "%d %B %Y"];

/// How `record` renders the current instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampFormat {
    /// `Mon Apr 11 2016 08:39:10 GMT-0400` (whole seconds)
    #[default]
    Display,
    /// `2016-04-11T08:39:10.123-04:00`
    Rfc3339,
}

impl TimestampFormat {
    pub fn render(&self, instant: DateTime<Local>) -> String {
        match self {
            TimestampFormat::Display => instant.format(DISPLAY_LAYOUT).to_string(),
            TimestampFormat::Rfc3339 => instant.to_rfc3339_opts(SecondsFormat::Millis, false),
        }
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampFormat::Display => write!(f, "display"),
            TimestampFormat::Rfc3339 => write!(f, "rfc3339"),
        }
    }
}

impl FromStr for TimestampFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "display" => Ok(TimestampFormat::Display),
            "rfc3339" | "iso" | "iso8601" => Ok(TimestampFormat::Rfc3339),
            other => Err(format!("unknown timestamp format: {}", other)),
        }
    }
}

/// Parse a stored value back into an instant
///
/// Accepts RFC 3339, RFC 2822 and the display layout, with or without the
/// trailing ` (Zone Name)` that JavaScript appends. Dates and date-times
/// without an offset ("2016-04-11", "April 11, 2016", "2016-04-11 08:39:10")
/// are read as local time. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Local));
    }

    // "... GMT-0400 (Eastern Daylight Time)"
    let display = match raw.find(" (") {
        Some(idx) if raw.ends_with(')') => &raw[..idx],
        _ => raw,
    };
    if let Ok(dt) = DateTime::parse_from_str(display, DISPLAY_LAYOUT) {
        return Some(dt.with_timezone(&Local));
    }

    parse_local(raw)
}

fn parse_local(raw: &str) -> Option<DateTime<Local>> {
    let naive = LOCAL_DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .or_else(|| {
            LOCAL_DATE_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(raw, layout).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    // Skipped local times (DST gaps) have no instant
    Local.from_local_datetime(&naive).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};

    fn sample() -> DateTime<Local> {
        Local.with_ymd_and_hms(2016, 4, 11, 8, 39, 10).unwrap()
    }

    #[test]
    fn test_display_round_trip() {
        let rendered = TimestampFormat::Display.render(sample());
        assert!(rendered.contains("Apr 11 2016 08:39:10 GMT"));
        assert_eq!(parse_timestamp(&rendered), Some(sample()));
    }

    #[test]
    fn test_rfc3339_keeps_millis() {
        let instant = sample().with_nanosecond(250_000_000).unwrap();
        let rendered = TimestampFormat::Rfc3339.render(instant);
        assert!(rendered.contains(".250"));
        assert_eq!(parse_timestamp(&rendered), Some(instant));
    }

    #[test]
    fn test_parse_javascript_date_string() {
        let parsed = parse_timestamp("Mon Apr 11 2016 08:39:10 GMT-0400 (EDT)").unwrap();
        let expected = FixedOffset::west_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2016, 4, 11, 8, 39, 10)
            .unwrap();
        assert_eq!(parsed, expected);

        let long_zone = parse_timestamp("Mon Apr 11 2016 08:39:10 GMT-0400 (Eastern Daylight Time)");
        assert_eq!(long_zone, Some(parsed));
    }

    #[test]
    fn test_parse_rfc2822() {
        let parsed = parse_timestamp("Mon, 11 Apr 2016 12:39:10 +0000").unwrap();
        assert_eq!(parsed.timestamp(), 1_460_378_350);
    }

    #[test]
    fn test_parse_local_dates() {
        let midnight = Local.with_ymd_and_hms(2016, 4, 11, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2016-04-11"), Some(midnight));
        assert_eq!(parse_timestamp("2016/04/11"), Some(midnight));
        assert_eq!(parse_timestamp("April 11, 2016"), Some(midnight));
        assert_eq!(parse_timestamp("Apr 11 2016"), Some(midnight));
        assert_eq!(parse_timestamp("11 April 2016"), Some(midnight));

        assert_eq!(parse_timestamp("2016-04-11 08:39:10"), Some(sample()));
        assert_eq!(parse_timestamp("2016-04-11T08:39:10"), Some(sample()));
        assert_eq!(parse_timestamp("2016-04-11T08:39:10.000"), Some(sample()));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("Invalid Date"), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("display".parse::<TimestampFormat>(), Ok(TimestampFormat::Display));
        assert_eq!("RFC3339".parse::<TimestampFormat>(), Ok(TimestampFormat::Rfc3339));
        assert!("epoch".parse::<TimestampFormat>().is_err());
    }
}
