//! Self-test completion estimates.
//!
//! When a test is started the tool prints a human-readable completion
//! timestamp ("Test will complete after Thu Oct 30 13:05:00 2025").
//! Remaining time is a pure function of that timestamp and a caller-chosen
//! "now", kept separate from any display formatting.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref COMPLETE_AFTER: Regex =
        Regex::new(r"(?mi)^Test will complete after\s+(.+)$").unwrap();
}

// The tool's ctime-style stamp: weekday, month, padded day, time, year.
const STAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Extract the completion timestamp from start-test output. A trailing
/// timezone token is dropped if present; the stamp is local time either way.
pub fn parse_completion_time(text: &str) -> Option<DateTime<Local>> {
    let stamp = COMPLETE_AFTER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())?;

    parse_stamp(stamp).or_else(|| {
        let without_zone = stamp.rsplit_once(char::is_whitespace)?.0;
        parse_stamp(without_zone)
    })
}

fn parse_stamp(stamp: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(dt, _) => Some(dt),
        LocalResult::None => None,
    }
}

/// Time left until `eta`, floored at zero once the estimate has passed.
pub fn time_remaining(eta: DateTime<Local>, now: DateTime<Local>) -> Duration {
    let remaining = eta - now;
    if remaining < Duration::zero() {
        Duration::zero()
    } else {
        remaining
    }
}

/// Render a remaining duration for humans, second precision.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0) as u64;
    humantime::format_duration(std::time::Duration::from_secs(secs)).to_string()
}
