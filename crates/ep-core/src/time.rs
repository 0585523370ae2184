//! Time model.
//!
//! # Design
//!
//! Absolute instants are `Timestamp`s: whole seconds since the Unix epoch,
//! taken on the scan's local wall clock.  Connection departures are the only
//! values expressed as a `TimeOfDay` (seconds since midnight); they repeat
//! every day, so reaching a connection means waiting until its next
//! occurrence:
//!
//! ```text
//! wait_until(now, target) = target - now            if target >= now
//!                         = (86400 - now) + target  otherwise
//! ```
//!
//! All arithmetic is on integers.  `chrono` is used only at the edges, to
//! parse and format ISO-8601 strings.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{EpError, EpResult};

/// Seconds in one day.
pub const SECS_PER_DAY: u32 = 86_400;

// ── TimeOfDay ─────────────────────────────────────────────────────────────────

/// A wall-clock time of day, stored as seconds since midnight (`< 86400`).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// `None` if `secs` is not within a single day.
    pub fn new(secs: u32) -> Option<TimeOfDay> {
        (secs < SECS_PER_DAY).then_some(TimeOfDay(secs))
    }

    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<TimeOfDay> {
        if minute >= 60 || second >= 60 {
            return None;
        }
        TimeOfDay::new(hour * 3_600 + minute * 60 + second)
    }

    /// Parse `HH:MM:SS` or `HH:MM`.
    pub fn parse(s: &str) -> EpResult<TimeOfDay> {
        let s = s.trim();
        let time = NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map_err(|e| EpError::Parse(format!("invalid time of day {s:?}: {e}")))?;
        Ok(TimeOfDay(time.num_seconds_from_midnight()))
    }

    #[inline]
    pub fn secs(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for TimeOfDay {
    type Error = String;
    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        TimeOfDay::new(secs).ok_or_else(|| format!("{secs} is not a valid time of day"))
    }
}

impl From<TimeOfDay> for u32 {
    fn from(t: TimeOfDay) -> u32 {
        t.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = (self.0 / 3_600, (self.0 % 3_600) / 60, self.0 % 60);
        write!(f, "{h:02}:{m:02}:{s:02}")
    }
}

/// Seconds since midnight of `t`.
#[inline]
pub fn time_of_day_to_seconds(t: TimeOfDay) -> u32 {
    t.0
}

/// Seconds to wait at `now` for the next daily occurrence of `target`.
///
/// Zero when `now == target`; wraps past midnight when `target < now`.
#[inline]
pub fn wait_until(now: TimeOfDay, target: TimeOfDay) -> u32 {
    if target >= now {
        target.0 - now.0
    } else {
        (SECS_PER_DAY - now.0) + target.0
    }
}

// ── Timestamp ─────────────────────────────────────────────────────────────────

/// An absolute instant in whole seconds since the Unix epoch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// The current system time.  Only used for audit fields, never for
    /// routing.
    pub fn now() -> Timestamp {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64);
        Timestamp(secs)
    }

    /// The instant `secs` seconds after `self`.
    #[inline]
    pub fn plus_secs(self, secs: i64) -> Timestamp {
        Timestamp(self.0 + secs)
    }

    /// Seconds elapsed from `earlier` to `self` (negative if `earlier` is later).
    #[inline]
    pub fn secs_since(self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }

    #[inline]
    pub fn time_of_day(self) -> TimeOfDay {
        TimeOfDay(self.0.rem_euclid(SECS_PER_DAY as i64) as u32)
    }

    /// Midnight at the start of `self`'s day.
    #[inline]
    pub fn midnight(self) -> Timestamp {
        Timestamp(self.0 - self.0.rem_euclid(SECS_PER_DAY as i64))
    }

    /// First instant on or after `self` whose time of day is `tod`.
    ///
    /// Same day if `tod` has not passed yet, otherwise the following day.
    pub fn next_occurrence(self, tod: TimeOfDay) -> Timestamp {
        let same_day = self.midnight().plus_secs(tod.0 as i64);
        if same_day < self {
            same_day.plus_secs(SECS_PER_DAY as i64)
        } else {
            same_day
        }
    }

    /// Parse an ISO-8601 timestamp.
    ///
    /// Accepts RFC 3339 with an offset (the local wall-clock reading is
    /// kept), a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (`T` or space), or a bare
    /// `YYYY-MM-DD` (midnight).  Fractional seconds are truncated.
    pub fn parse_iso(s: &str) -> EpResult<Timestamp> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Timestamp::from_naive(dt.naive_local()));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Timestamp::from_naive(naive));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Timestamp::from_naive)
            .ok_or_else(|| EpError::Parse(format!("invalid ISO-8601 timestamp {s:?}")))
    }

    fn from_naive(naive: NaiveDateTime) -> Timestamp {
        Timestamp(naive.and_utc().timestamp())
    }

    /// Format as `YYYY-MM-DDTHH:MM:SS`.
    pub fn to_iso(self) -> String {
        match DateTime::<Utc>::from_timestamp(self.0, 0) {
            Some(dt) => dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => format!("@{}", self.0),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}
