mod anchor;
mod clock;
pub mod config;
mod consts;
pub mod host;
mod prelude;
mod progress;
mod range;
pub mod render;
pub mod store;
mod ticker;
mod types;

pub use anchor::{AnchorError, BusinessHourAnchor, TimeBasis};
pub use clock::{Clock, FixedClock, SystemClock};
pub use consts::*;
pub use progress::{DateInputs, InputField, Mode, ProgressCalculator, ProgressError, ProgressResult};
pub use range::{DateSpan, InputConstraints};
pub use ticker::LiveTicker;
pub use types::{Hue, Percent, ValueError};

use crate::prelude::*;
use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

/// A calendar date with no time of day, as entered in a date field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Into)]
pub struct DateOnly(NaiveDate);

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ParseError {
    #[display(fmt = "Invalid date format: {_0}")]
    InvalidFormat(String),
    #[display(fmt = "Invalid year: {} (must be 1-{})", "_0", MAX_YEAR)]
    InvalidYear(u16),
    #[display(fmt = "Invalid month: {} (must be 1-{})", "_0", MAX_MONTH)]
    InvalidMonth(u8),
    #[display(fmt = "Invalid day {day} for month {year}-{month:02}")]
    InvalidDay { month: u8, day: u8, year: u16 },
    #[display(fmt = "Empty date string")]
    EmptyInput,
}

impl std::error::Error for ParseError {}

impl DateOnly {
    /// Creates a date from its components, validating each one.
    ///
    /// # Errors
    /// Returns the `ParseError` variant of the first invalid component.
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self, ParseError> {
        if year == 0 || year > MAX_YEAR {
            return Err(ParseError::InvalidYear(year));
        }
        if month == 0 || month > MAX_MONTH {
            return Err(ParseError::InvalidMonth(month));
        }
        NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
            .map(Self)
            .ok_or(ParseError::InvalidDay { month, day, year })
    }

    /// Wraps a chrono date, rejecting years outside `1..=MAX_YEAR`.
    ///
    /// # Errors
    /// Returns `ParseError::InvalidYear` for out-of-range years.
    pub fn from_naive(date: NaiveDate) -> Result<Self, ParseError> {
        let year = u16::try_from(date.year()).map_err(|_| ParseError::InvalidYear(0))?;
        if year == 0 || year > MAX_YEAR {
            return Err(ParseError::InvalidYear(year));
        }
        Ok(Self(date))
    }

    /// Parses an input field value; empty or malformed input is "no value".
    pub fn parse_opt(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Returns the year component
    pub fn year(&self) -> u16 {
        // from_naive and new both bound the year to 1..=MAX_YEAR
        u16::try_from(self.0.year()).unwrap_or_default()
    }

    /// Returns the month component (1-12)
    pub fn month(&self) -> u8 {
        u8::try_from(self.0.month()).unwrap_or_default()
    }

    /// Returns the day-of-month component (1-31)
    pub fn day(&self) -> u8 {
        u8::try_from(self.0.day()).unwrap_or_default()
    }

    /// Returns the underlying chrono date
    #[inline]
    pub const fn naive(&self) -> NaiveDate {
        self.0
    }

    /// Shifts the date by a signed number of days.
    /// Returns `None` if the result leaves the supported year range.
    pub fn add_days(&self, days: i64) -> Option<Self> {
        let shifted = self.0.checked_add_signed(chrono::Duration::try_days(days)?)?;
        Self::from_naive(shifted).ok()
    }
}

impl FromStr for DateOnly {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let parts: Vec<&str> = trimmed.split(DATE_SEPARATOR).collect();
        if parts.len() != 3 {
            return Err(ParseError::InvalidFormat(format!(
                "Expected YYYY{DATE_SEPARATOR}MM{DATE_SEPARATOR}DD, found {} component(s): {trimmed}",
                parts.len()
            )));
        }

        let year = Self::parse_component::<u16>(parts[0], 4)?;
        let month = Self::parse_component::<u8>(parts[1], 2)?;
        let day = Self::parse_component::<u8>(parts[2], 2)?;

        Self::new(year, month, day)
    }
}

impl DateOnly {
    /// Parses one numeric component of exactly `width` ASCII digits
    fn parse_component<T: FromStr>(s: &str, width: usize) -> Result<T, ParseError> {
        if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidFormat(s.to_owned()));
        }
        s.parse::<T>()
            .map_err(|_| ParseError::InvalidFormat(s.to_owned()))
    }
}

impl TryFrom<NaiveDate> for DateOnly {
    type Error = ParseError;

    fn try_from(value: NaiveDate) -> Result<Self, Self::Error> {
        Self::from_naive(value)
    }
}

impl serde::Serialize for DateOnly {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for DateOnly {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
