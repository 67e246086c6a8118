//! Date-to-progress computation.
//!
//! Manual mode is day-granular: every date, including "today", is pinned to
//! the manual anchor and progress moves in whole-day steps. Live mode reads the
//! clock and progresses continuously at millisecond precision, while its day
//! counts stay whole-day. The two can disagree slightly near midnight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::prelude::*;
use crate::{
    BusinessHourAnchor, Clock, DEFAULT_SPAN_HALF_DAYS, DateOnly, DateSpan, InputConstraints, PERCENT_MAX, Percent,
};

/// Whether "today" comes from the date field or from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    #[display(fmt = "manual")]
    Manual,
    #[display(fmt = "live")]
    Live,
}

impl Mode {
    pub const fn from_live(live: bool) -> Self {
        if live { Self::Live } else { Self::Manual }
    }

    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}

/// The three date fields exactly as entered, each `YYYY-MM-DD` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInputs {
    pub start: String,
    pub today: String,
    pub end:   String,
}

impl DateInputs {
    pub fn new(start: impl Into<String>, today: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            today: today.into(),
            end:   end.into(),
        }
    }

    /// Start 15 days before `today` and end 15 days after it.
    pub fn default_around(today: DateOnly) -> Self {
        let shifted = |days: i64| today.add_days(days).unwrap_or(today).to_string();
        Self::new(
            shifted(-DEFAULT_SPAN_HALF_DAYS),
            today.to_string(),
            shifted(DEFAULT_SPAN_HALF_DAYS),
        )
    }

    /// All three fields hold something
    pub fn is_filled(&self) -> bool {
        !(self.start.is_empty() || self.today.is_empty() || self.end.is_empty())
    }

    pub fn start_date(&self) -> Option<DateOnly> {
        DateOnly::parse_opt(&self.start)
    }

    pub fn today_date(&self) -> Option<DateOnly> {
        DateOnly::parse_opt(&self.today)
    }

    pub fn end_date(&self) -> Option<DateOnly> {
        DateOnly::parse_opt(&self.end)
    }

    /// The span, if both start and end parse
    pub fn span(&self) -> Option<DateSpan> {
        Some(DateSpan::new(self.start_date()?, self.end_date()?))
    }

    pub fn constraints(&self) -> InputConstraints {
        InputConstraints::from_values(self.start_date(), self.end_date())
    }
}

/// Which date field kept the computation from running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum InputField {
    #[display(fmt = "start")]
    Start,
    #[display(fmt = "today")]
    Today,
    #[display(fmt = "end")]
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    /// A required date is empty or does not parse; the caller keeps whatever
    /// it rendered last.
    #[error("Incomplete input: {0} date is missing or invalid")]
    IncompleteInput(InputField),
}

/// Outcome of one progress computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressResult {
    pub mode:           Mode,
    pub percent:        Percent,
    pub elapsed_days:   u32,
    pub total_days:     u32,
    pub marker_percent: Percent,
}

/// Converts dates plus a mode into a [`ProgressResult`].
///
/// Holds one anchor per mode: manual dates are read against local 10:30 by
/// default, live mode against UTC 10:30.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressCalculator {
    manual: BusinessHourAnchor,
    live:   BusinessHourAnchor,
}

impl Default for ProgressCalculator {
    fn default() -> Self {
        Self::new(BusinessHourAnchor::manual(), BusinessHourAnchor::live())
    }
}

impl ProgressCalculator {
    pub const fn new(manual: BusinessHourAnchor, live: BusinessHourAnchor) -> Self {
        Self { manual, live }
    }

    pub const fn anchor_for(&self, mode: Mode) -> &BusinessHourAnchor {
        match mode {
            Mode::Manual => &self.manual,
            Mode::Live => &self.live,
        }
    }

    /// Parses the inputs and computes progress in the given mode.
    ///
    /// # Errors
    /// Returns `ProgressError::IncompleteInput` naming the first date that is
    /// empty or unparseable. "today" is only required in manual mode.
    pub fn compute(&self, inputs: &DateInputs, mode: Mode, clock: &dyn Clock) -> Result<ProgressResult, ProgressError> {
        let start = inputs
            .start_date()
            .ok_or(ProgressError::IncompleteInput(InputField::Start))?;
        let end = inputs
            .end_date()
            .ok_or(ProgressError::IncompleteInput(InputField::End))?;
        let span = DateSpan::new(start, end);

        let result = match mode {
            Mode::Manual => {
                let today = inputs
                    .today_date()
                    .ok_or(ProgressError::IncompleteInput(InputField::Today))?;
                self.compute_manual(span, today)
            },
            Mode::Live => self.compute_live(span, clock.now()),
        };

        trace!(%span, %mode, percent = %result.percent, "computed progress");
        Ok(result)
    }

    /// Day-granular progress of `today` through `span`.
    pub fn compute_manual(&self, span: DateSpan, today: DateOnly) -> ProgressResult {
        let anchor = &self.manual;
        let (start, end) = span.dates();
        let start_at = anchor.normalize(start);
        let end_at = anchor.normalize(end);
        let today_at = anchor.normalize(today);

        let total_raw = anchor.days_between_dates(end, start);
        let total = total_raw.max(0);

        // Instant clamp; on a reversed span the start bound wins.
        let clamped = today_at.min(end_at).max(start_at);
        let elapsed = if total > 0 {
            anchor.days_between(clamped, start_at).clamp(0, total)
        } else {
            0
        };

        let reached_end = today_at >= end_at;
        let percent = if total > 0 {
            Percent::clamped(ratio(elapsed, total) * PERCENT_MAX)
        } else {
            Percent::from_reached(reached_end)
        };

        // Uses the unclamped today and raw total, so the marker can sit
        // exactly on either edge.
        let marker_percent = if total_raw <= 0 {
            Percent::from_reached(reached_end)
        } else {
            Percent::clamped(ratio(anchor.days_between_dates(today, start), total_raw) * PERCENT_MAX)
        };

        ProgressResult {
            mode: Mode::Manual,
            percent,
            elapsed_days: day_count(elapsed),
            total_days: day_count(total),
            marker_percent,
        }
    }

    /// Continuous progress of the instant `now` through `span`.
    pub fn compute_live(&self, span: DateSpan, now: DateTime<Utc>) -> ProgressResult {
        let anchor = &self.live;
        let (start, end) = span.dates();
        let start_ms = anchor.normalize_ms(start);
        let end_ms = anchor.normalize_ms(end);
        let now_ms = now.timestamp_millis();

        let clamped_ms = now_ms.min(end_ms).max(start_ms);
        let total_ms = (end_ms - start_ms).max(0);
        let elapsed_ms = (clamped_ms - start_ms).max(0);

        let reached_end = now_ms >= end_ms;
        let percent = if total_ms > 0 {
            Percent::clamped(ratio(elapsed_ms, total_ms) * PERCENT_MAX)
        } else {
            Percent::from_reached(reached_end)
        };

        let total_raw = anchor.days_between_dates(end, start);
        let total = total_raw.max(0);
        let elapsed = if total > 0 {
            let clamped_now = DateTime::<Utc>::from_timestamp_millis(clamped_ms).unwrap_or(now);
            anchor
                .days_between(clamped_now, anchor.normalize(start))
                .clamp(0, total)
        } else {
            0
        };

        let marker_percent = if total_raw <= 0 {
            Percent::from_reached(reached_end)
        } else {
            percent
        };

        ProgressResult {
            mode: Mode::Live,
            percent,
            elapsed_days: day_count(elapsed),
            total_days: day_count(total),
            marker_percent,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: i64, whole: i64) -> f64 {
    part as f64 / whole as f64
}

fn day_count(days: i64) -> u32 {
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}
