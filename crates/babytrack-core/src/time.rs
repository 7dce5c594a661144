use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parse an event timestamp.
///
/// Accepts either:
/// - RFC 3339 (e.g. "2024-05-01T08:30:00Z", "2024-05-01T08:30:00+02:00")
/// - A bare local date-time as produced by `datetime-local` inputs
///   (e.g. "2024-05-01T08:30", "2024-05-01T08:30:15"), taken as UTC
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Reporting window, named by the tokens the web client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "last24hours")]
    Last24Hours,
    #[default]
    #[serde(rename = "last7days")]
    Last7Days,
    #[serde(rename = "last30days")]
    Last30Days,
}

impl TimeRange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last24Hours => "last24hours",
            Self::Last7Days => "last7days",
            Self::Last30Days => "last30days",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            Self::Last24Hours => Duration::hours(24),
            Self::Last7Days => Duration::days(7),
            Self::Last30Days => Duration::days(30),
        }
    }

    /// The window `[now - range, now]` ending at `now`.
    pub fn window(self, now: DateTime<Utc>) -> Window {
        Window {
            start: now - self.duration(),
            end: now,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = UnknownTimeRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last24hours" => Ok(Self::Last24Hours),
            "last7days" => Ok(Self::Last7Days),
            "last30days" => Ok(Self::Last30Days),
            other => Err(UnknownTimeRange(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown time range {0:?}: expected last24hours, last7days or last30days")]
pub struct UnknownTimeRange(pub String);

/// An inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Largest accepted UTC offset: 14 hours, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Build a fixed offset from minutes east of UTC, rejecting out-of-range
/// values.
pub fn utc_offset(minutes: i32) -> Option<FixedOffset> {
    if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return None;
    }
    FixedOffset::east_opt(minutes * 60)
}

/// Calendar day (`YYYY-MM-DD`) of `t` as seen at `offset`.
pub fn day_key(t: DateTime<Utc>, offset: FixedOffset) -> String {
    t.with_timezone(&offset).format("%Y-%m-%d").to_string()
}
