//! Normalization of calendar dates to a fixed business-hour instant.
//!
//! Differencing two dates at the same time of day keeps whole-day spans whole
//! even when a daylight-saving transition falls between them: the raw
//! difference is then off by an hour, and rounding to days absorbs it.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::{ANCHOR_HOUR, ANCHOR_MINUTE, DateOnly, MS_PER_DAY};

/// Which clock face calendar dates are read against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeBasis {
    /// The host's local time zone
    Local,
    /// Coordinated Universal Time
    Utc,
    /// A fixed offset from UTC
    Fixed(FixedOffset),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnchorError {
    #[error("Invalid time basis: {0} (expected 'local', 'utc' or '+HH:MM')")]
    InvalidBasis(String),

    #[error("Invalid anchor time {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },
}

impl TimeBasis {
    /// Maps a wall-clock date-time in this basis onto a UTC instant.
    ///
    /// Ambiguous local times take the earlier mapping. Nonexistent local times
    /// (spring-forward gaps) are moved one hour later.
    pub fn resolve(&self, wall: NaiveDateTime) -> DateTime<Utc> {
        match self {
            Self::Utc => wall.and_utc(),
            Self::Local => resolve_in(&Local, wall),
            Self::Fixed(offset) => resolve_in(offset, wall),
        }
    }

    /// Calendar date of an instant as seen in this basis
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Utc => instant.date_naive(),
            Self::Local => instant.with_timezone(&Local).date_naive(),
            Self::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }
}

fn resolve_in<Tz: TimeZone>(tz: &Tz, wall: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&wall) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = wall + Duration::hours(1);
            tz.from_local_datetime(&shifted).earliest().map_or_else(
                || {
                    tracing::warn!(%wall, "wall-clock time has no mapping; reading it as UTC");
                    wall.and_utc()
                },
                |dt| dt.with_timezone(&Utc),
            )
        },
    }
}

impl fmt::Display for TimeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Utc => f.write_str("utc"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl FromStr for TimeBasis {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "local" => return Ok(Self::Local),
            "utc" | "z" => return Ok(Self::Utc),
            _ => {},
        }

        let invalid = || AnchorError::InvalidBasis(s.to_owned());
        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return Err(invalid()),
        };
        let (hh, mm) = rest.split_once(':').ok_or_else(invalid)?;
        if hh.len() != 2 || mm.len() != 2 {
            return Err(invalid());
        }
        let hours: i32 = hh.parse().map_err(|_| invalid())?;
        let minutes: i32 = mm.parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self::Fixed)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeBasis {
    type Error = AnchorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeBasis> for String {
    fn from(basis: TimeBasis) -> Self {
        basis.to_string()
    }
}

/// A time of day in a given basis at which every calendar date is pinned
/// before dates are compared or differenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusinessHourAnchor {
    basis: TimeBasis,
    time:  NaiveTime,
}

impl BusinessHourAnchor {
    /// # Errors
    /// Returns `AnchorError::InvalidTime` if hour or minute is out of range.
    pub fn new(basis: TimeBasis, hour: u32, minute: u32) -> Result<Self, AnchorError> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or(AnchorError::InvalidTime { hour, minute })?;
        Ok(Self { basis, time })
    }

    /// 10:30 in the given basis
    pub fn at_default_hour(basis: TimeBasis) -> Self {
        Self {
            basis,
            time: NaiveTime::from_hms_opt(ANCHOR_HOUR, ANCHOR_MINUTE, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    /// Anchor used for manually entered dates: 10:30 local time
    pub fn manual() -> Self {
        Self::at_default_hour(TimeBasis::Local)
    }

    /// Anchor used against the real-time clock: 10:30 UTC
    pub fn live() -> Self {
        Self::at_default_hour(TimeBasis::Utc)
    }

    pub const fn basis(&self) -> TimeBasis {
        self.basis
    }

    pub const fn time(&self) -> NaiveTime {
        self.time
    }

    /// Instant of `date` at the anchor time
    pub fn normalize(&self, date: DateOnly) -> DateTime<Utc> {
        self.basis.resolve(date.naive().and_time(self.time))
    }

    /// Milliseconds since the epoch of `date` at the anchor time
    pub fn normalize_ms(&self, date: DateOnly) -> i64 {
        self.normalize(date).timestamp_millis()
    }

    /// Re-pins an instant to the anchor time of its own calendar date
    pub fn normalize_instant(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.basis
            .resolve(self.basis.date_of(instant).and_time(self.time))
    }

    /// Calendar date of an instant in this anchor's basis
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.basis.date_of(instant)
    }

    /// Whole days from `earlier` to `later`, both pinned to the anchor time
    pub fn days_between_dates(&self, later: DateOnly, earlier: DateOnly) -> i64 {
        round_days(self.normalize_ms(later) - self.normalize_ms(earlier))
    }

    /// Whole days between the calendar dates of two instants
    pub fn days_between(&self, later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
        let later = self.normalize_instant(later).timestamp_millis();
        let earlier = self.normalize_instant(earlier).timestamp_millis();
        round_days(later - earlier)
    }
}

impl Default for BusinessHourAnchor {
    fn default() -> Self {
        Self::manual()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn round_days(ms: i64) -> i64 {
    (ms as f64 / MS_PER_DAY as f64).round() as i64
}
