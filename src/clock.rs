use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::{DateOnly, TimeBasis};

/// Source of the current instant for live mode.
///
/// Abstracted so the calculator and host can be driven deterministically.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Returns today's calendar date as seen in `basis`.
    ///
    /// Falls back to `None` only for instants outside the supported year range.
    fn today(&self, basis: TimeBasis) -> Option<DateOnly> {
        DateOnly::from_naive(basis.date_of(self.now())).ok()
    }
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a chosen instant, advanced only explicitly.
#[derive(Debug)]
pub struct FixedClock {
    at: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at: Mutex::new(at) }
    }

    /// Moves the clock forward (or back, for negative deltas).
    pub fn advance(&self, delta: Duration) {
        if let Ok(mut at) = self.at.lock() {
            *at += delta;
        }
    }

    /// Jumps the clock to a new instant.
    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut at) = self.at.lock() {
            *at = to;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
            .lock()
            .map_or_else(|poisoned| *poisoned.into_inner(), |at| *at)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_returns_given_instant() {
        let at = Utc.with_ymd_and_hms(2024, 1, 11, 12, 0, 0).unwrap();
        let clock = FixedClock::new(at);

        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), at);
    }

    #[test]
    fn fixed_clock_advances() {
        let at = Utc.with_ymd_and_hms(2024, 1, 11, 12, 0, 0).unwrap();
        let clock = FixedClock::new(at);
        clock.advance(Duration::days(2));

        assert_eq!(clock.now(), at + Duration::days(2));

        let later = Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn today_follows_basis() {
        let at = Utc.with_ymd_and_hms(2024, 1, 11, 23, 30, 0).unwrap();
        let clock = FixedClock::new(at);

        assert_eq!(clock.today(TimeBasis::Utc), DateOnly::new(2024, 1, 11).ok());

        let east: TimeBasis = "+02:00".parse().unwrap();
        assert_eq!(clock.today(east), DateOnly::new(2024, 1, 12).ok());
    }

    #[test]
    fn clock_trait_object_works() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let clock: Box<dyn Clock> = Box::new(FixedClock::new(at));

        assert_eq!(clock.now(), at);
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
