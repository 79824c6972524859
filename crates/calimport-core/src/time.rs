//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (a specific datetime, or "all day" when the source carries no `dateTime`),
//! and [`TimeWindow`] for defining fetch ranges.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Represents the time of a calendar event boundary.
///
/// Calendar APIs return either a `dateTime` (a specific instant, with offset)
/// or nothing at all for all-day events. The offset is preserved so that
/// formatting renders the event's own wall-clock time rather than the
/// importing machine's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific instant, with the offset the source reported.
    DateTime(DateTime<FixedOffset>),
    /// An all-day boundary (no instant).
    AllDay,
}

impl EventTime {
    /// Parses an RFC 3339 `dateTime` string into an `EventTime::DateTime`.
    pub fn from_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(Self::DateTime)
    }

    /// Returns `true` if this is an all-day boundary.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay)
    }

    /// Returns the instant if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay => None,
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// All-day boundaries order before any instant; instants order by the moment
/// they denote, regardless of offset.
impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::AllDay, Self::AllDay) => Ordering::Equal,
            (Self::AllDay, Self::DateTime(_)) => Ordering::Less,
            (Self::DateTime(_), Self::AllDay) => Ordering::Greater,
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
        }
    }
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a time window covering a single calendar day in the given
    /// timezone: local midnight to the next local midnight.
    ///
    /// A DST transition can make midnight ambiguous (clocks fall back across
    /// it) or nonexistent (clocks spring over it). Ambiguous midnights
    /// resolve to the earliest offset; nonexistent ones resolve to the first
    /// wall-clock minute the transition left intact.
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let start = first_valid_instant(tz, date.and_hms_opt(0, 0, 0).expect("valid time"));
        let end = first_valid_instant(
            tz,
            date.succ_opt()
                .expect("valid successor date")
                .and_hms_opt(0, 0, 0)
                .expect("valid time"),
        );
        Self { start, end }
    }

    /// Checks if a datetime falls within this window.
    ///
    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }
}

/// Maps a local wall-clock time to UTC. Ambiguous times take the earliest
/// offset; times inside a transition gap scan ahead minute by minute until
/// the clocks exist again.
fn first_valid_instant<Tz: TimeZone>(tz: &Tz, mut local: NaiveDateTime) -> DateTime<Utc> {
    loop {
        if let Some(dt) = tz.from_local_datetime(&local).earliest() {
            return dt.with_timezone(&Utc);
        }
        local += Duration::minutes(1);
    }
}
