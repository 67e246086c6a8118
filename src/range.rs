use serde::Serialize;

use crate::{DateOnly, prelude::*};

/// The start and end dates that progress is measured between.
///
/// Unlike a strict interval, a span may be empty (`start == end`) or reversed
/// (`start > end`); progress over such spans is defined rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{start}/{end}")]
pub struct DateSpan {
    start: DateOnly,
    end:   DateOnly,
}

impl DateSpan {
    /// Creates a span without checking the order of its endpoints.
    pub const fn new(start: DateOnly, end: DateOnly) -> Self {
        Self { start, end }
    }

    /// Returns the start date of the span
    pub const fn start(&self) -> DateOnly {
        self.start
    }

    /// Returns the end date of the span
    pub const fn end(&self) -> DateOnly {
        self.end
    }

    /// Returns both start and end dates as a tuple
    pub const fn dates(&self) -> (DateOnly, DateOnly) {
        (self.start, self.end)
    }
}

/// Bounds a date-entry front-end should offer for each field, derived from
/// whichever of start and end currently hold a value.
///
/// The calculator itself never enforces these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InputConstraints {
    pub start_max: Option<DateOnly>,
    pub end_min:   Option<DateOnly>,
    pub today_min: Option<DateOnly>,
    pub today_max: Option<DateOnly>,
}

impl InputConstraints {
    pub const fn from_values(start: Option<DateOnly>, end: Option<DateOnly>) -> Self {
        Self {
            start_max: end,
            end_min:   start,
            today_min: start,
            today_max: end,
        }
    }
}
