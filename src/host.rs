//! Owner of the widget state: the three date inputs, the mode flag, the theme
//! and the live ticker.
//!
//! Every change recomputes synchronously on the caller's thread. A successful
//! computation is handed to each registered [`ResultObserver`] and the date
//! record is persisted when it changed; an incomplete one leaves the last
//! result in place.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::render::{PercentStyle, RenderModel};
use crate::store::{PreferenceStore, Preferences, Theme};
use crate::{
    Clock, DateInputs, DateOnly, DateSpan, InputConstraints, LiveTicker, Mode, ProgressCalculator, ProgressError,
    ProgressResult,
};

/// Receives every successfully computed result.
pub trait ResultObserver {
    fn on_result(&mut self, result: &ProgressResult, inputs: &DateInputs);
}

impl<F> ResultObserver for F
where
    F: FnMut(&ProgressResult, &DateInputs),
{
    fn on_result(&mut self, result: &ProgressResult, inputs: &DateInputs) {
        self(result, inputs);
    }
}

/// The last successful computation and the dates it was made from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub result: ProgressResult,
    pub span:   DateSpan,
    /// The manual date, or the clock's date in live mode
    pub today:  DateOnly,
}

pub struct ProgressHost<S> {
    calculator: ProgressCalculator,
    clock:      Arc<dyn Clock>,
    prefs:      Preferences<S>,
    inputs:     DateInputs,
    mode:       Mode,
    theme:      Theme,
    ticker:     LiveTicker,
    last:       Option<Snapshot>,
    /// Date record last written to the store
    saved:      Option<DateInputs>,
    observers:  Vec<Box<dyn ResultObserver>>,
}

impl<S> std::fmt::Debug for ProgressHost<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHost")
            .field("inputs", &self.inputs)
            .field("mode", &self.mode)
            .field("theme", &self.theme)
            .field("ticker", &self.ticker)
            .field("last", &self.last)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<S: PreferenceStore> ProgressHost<S> {
    /// Creates a host in manual mode with empty inputs and a stopped ticker.
    pub fn new(
        calculator: ProgressCalculator,
        clock: Arc<dyn Clock>,
        prefs: Preferences<S>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            calculator,
            clock,
            prefs,
            inputs: DateInputs::default(),
            mode: Mode::Manual,
            theme: Theme::default(),
            ticker: LiveTicker::new(tick_interval),
            last: None,
            saved: None,
            observers: Vec::new(),
        }
    }

    /// Loads the stored theme, dates and live flag, falling back to a span of
    /// 15 days either side of the clock's local date, then computes once.
    pub fn restore(&mut self, system_prefers_dark: bool) -> Option<ProgressResult> {
        self.theme = self.prefs.load_theme(system_prefers_dark);

        self.inputs = match self.prefs.load_dates() {
            Some(stored) => {
                self.saved = Some(stored.clone());
                stored
            },
            None => {
                let basis = self.calculator.anchor_for(Mode::Manual).basis();
                self.clock
                    .today(basis)
                    .map(DateInputs::default_around)
                    .unwrap_or_default()
            },
        };

        let live = self.prefs.load_live();
        info!(inputs = ?self.inputs, live, theme = %self.theme, "restored state");
        self.set_live(live)
    }

    pub fn add_observer(&mut self, observer: impl ResultObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn set_start(&mut self, value: &str) -> Option<ProgressResult> {
        value.clone_into(&mut self.inputs.start);
        self.recompute()
    }

    pub fn set_today(&mut self, value: &str) -> Option<ProgressResult> {
        value.clone_into(&mut self.inputs.today);
        self.recompute()
    }

    pub fn set_end(&mut self, value: &str) -> Option<ProgressResult> {
        value.clone_into(&mut self.inputs.end);
        self.recompute()
    }

    /// Replaces all three inputs at once, recomputing a single time.
    pub fn set_inputs(&mut self, inputs: DateInputs) -> Option<ProgressResult> {
        self.inputs = inputs;
        self.recompute()
    }

    /// Switches between live and manual mode, persisting the flag and
    /// starting or stopping the ticker.
    pub fn set_live(&mut self, enabled: bool) -> Option<ProgressResult> {
        self.mode = Mode::from_live(enabled);
        self.prefs.save_live(enabled);

        if enabled {
            if let Err(err) = self.ticker.start() {
                warn!(error = %err, "could not start live ticker; live mode updates only on input");
            }
        } else {
            self.ticker.stop();
        }
        self.recompute()
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggle());
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.prefs.save_theme(theme);
    }

    /// Runs the calculator on the current inputs.
    ///
    /// Returns the new result, or `None` when an input is incomplete, in which
    /// case the previous result is kept and nothing is notified or persisted.
    /// The date record is only written when it differs from the last write.
    pub fn recompute(&mut self) -> Option<ProgressResult> {
        let result = match self
            .calculator
            .compute(&self.inputs, self.mode, self.clock.as_ref())
        {
            Ok(result) => result,
            Err(ProgressError::IncompleteInput(field)) => {
                debug!(%field, "skipping recompute on incomplete input");
                return None;
            },
        };

        let span = self.inputs.span()?;
        // The live label shows the clock's date on the manual basis, which
        // is local time unless configured otherwise.
        let today = match self.mode {
            Mode::Manual => self.inputs.today_date(),
            Mode::Live => self
                .clock
                .today(self.calculator.anchor_for(Mode::Manual).basis()),
        }
        .unwrap_or_else(|| span.start());

        self.last = Some(Snapshot { result, span, today });
        for observer in &mut self.observers {
            observer.on_result(&result, &self.inputs);
        }
        if self.saved.as_ref() != Some(&self.inputs) {
            self.prefs.save_dates(&self.inputs);
            self.saved = Some(self.inputs.clone());
        }
        Some(result)
    }

    /// Blocks up to `timeout` for a live tick and recomputes when one arrives.
    pub fn wait_for_tick(&mut self, timeout: Duration) -> bool {
        if self.ticker.wait_tick(timeout) {
            self.recompute();
            return true;
        }
        false
    }

    /// Recomputes once if any tick fired since the last call.
    pub fn pump_ticks(&mut self) -> bool {
        if self.ticker.try_tick() {
            self.recompute();
            return true;
        }
        false
    }

    /// Presentation values of the last successful computation
    pub fn render(&self, style: PercentStyle) -> Option<RenderModel> {
        self.last.map(|snap| {
            RenderModel::new(&snap.result, style, snap.span.start(), snap.today, snap.span.end())
        })
    }

    pub fn last_result(&self) -> Option<ProgressResult> {
        self.last.map(|snap| snap.result)
    }

    pub const fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    pub const fn inputs(&self) -> &DateInputs {
        &self.inputs
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn theme(&self) -> Theme {
        self.theme
    }

    pub const fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn constraints(&self) -> InputConstraints {
        self.inputs.constraints()
    }

    pub const fn preferences(&self) -> &Preferences<S> {
        &self.prefs
    }

    /// Stops the ticker. Also happens on drop.
    pub fn shutdown(&mut self) {
        self.ticker.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreResult};
    use crate::{BusinessHourAnchor, DATES_KEY, FixedClock, Percent, TimeBasis};
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store that counts writes of the date record.
    struct CountingStore {
        inner:       MemoryStore,
        date_writes: Arc<AtomicUsize>,
    }

    impl PreferenceStore for CountingStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            if key == DATES_KEY {
                self.date_writes.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.set(key, value)
        }
    }

    fn host_at(clock: Arc<FixedClock>) -> ProgressHost<MemoryStore> {
        let calculator = ProgressCalculator::new(
            BusinessHourAnchor::at_default_hour(TimeBasis::Utc),
            BusinessHourAnchor::live(),
        );
        ProgressHost::new(
            calculator,
            clock,
            Preferences::new(MemoryStore::new()),
            Duration::from_millis(5),
        )
    }

    fn clock_at(y: i32, m: u32, d: u32, h: u32) -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()))
    }

    #[test]
    fn test_restore_defaults_around_today() {
        let mut host = host_at(clock_at(2024, 1, 16, 10));
        let result = host.restore(false).expect("default inputs compute");

        assert_eq!(host.inputs(), &DateInputs::new("2024-01-01", "2024-01-16", "2024-01-31"));
        assert_eq!(host.mode(), Mode::Manual);
        assert_eq!(host.theme(), Theme::Light);
        assert!(!host.is_ticking());
        assert_eq!(result.total_days, 30);
        assert_eq!(result.elapsed_days, 15);
    }

    #[test]
    fn test_incomplete_input_keeps_last_result() {
        let mut host = host_at(clock_at(2024, 1, 16, 10));
        let first = host
            .set_inputs(DateInputs::new("2024-01-01", "2024-01-11", "2024-01-21"))
            .expect("valid inputs");

        assert_eq!(host.set_end(""), None);
        assert_eq!(host.last_result(), Some(first));
        assert_eq!(host.set_start("2024-13-01"), None);
        assert_eq!(host.last_result(), Some(first));

        let stored = host.preferences().load_dates().expect("record saved");
        assert_eq!(stored, DateInputs::new("2024-01-01", "2024-01-11", "2024-01-21"));
    }

    #[test]
    fn test_observers_receive_results() {
        let seen: Rc<RefCell<Vec<Percent>>> = Rc::default();
        let sink = Rc::clone(&seen);

        let mut host = host_at(clock_at(2024, 1, 16, 10));
        host.add_observer(move |result: &ProgressResult, _: &DateInputs| {
            sink.borrow_mut().push(result.percent);
        });

        host.set_inputs(DateInputs::new("2024-01-01", "2024-01-11", "2024-01-21"));
        host.set_today("bogus");
        host.set_today("2024-01-21");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!((seen[0].get() - 50.0).abs() < 1e-9);
        assert_eq!(seen[1], Percent::FULL);
    }

    #[test]
    fn test_live_mode_follows_clock() {
        let clock = clock_at(2024, 1, 6, 10);
        let mut host = host_at(Arc::clone(&clock));
        host.set_inputs(DateInputs::new("2024-01-01", "", "2024-01-21"));
        assert_eq!(host.last_result(), None);

        let result = host.set_live(true).expect("live ignores today field");
        assert!(host.is_ticking());
        assert!(host.preferences().load_live());
        assert!((result.percent.get() - 25.0).abs() < 1e-9);

        clock.advance(chrono::Duration::days(5));
        assert!(host.wait_for_tick(Duration::from_secs(5)));
        let result = host.last_result().expect("ticked result");
        assert!((result.percent.get() - 50.0).abs() < 1e-9);

        let model = host.render(PercentStyle::Precise).expect("render model");
        assert_eq!(model.today_label, "Jan 11, 2024");

        host.set_live(false);
        assert!(!host.is_ticking());
        assert!(!host.preferences().load_live());
        assert!(!host.wait_for_tick(Duration::from_millis(20)));
    }

    #[test]
    fn test_restore_reads_stored_state() {
        let store = MemoryStore::new();
        let prefs = Preferences::new(store);
        prefs.save_dates(&DateInputs::new("2024-03-01", "2024-03-02", "2024-03-05"));
        prefs.save_theme(Theme::Dark);

        let mut host = ProgressHost::new(
            ProgressCalculator::default(),
            clock_at(2024, 6, 1, 10),
            prefs,
            Duration::from_millis(5),
        );
        let result = host.restore(false).expect("stored inputs compute");

        assert_eq!(host.theme(), Theme::Dark);
        assert_eq!(host.inputs().start, "2024-03-01");
        assert_eq!(result.total_days, 4);
        assert_eq!(result.elapsed_days, 1);

        assert_eq!(host.toggle_theme(), Theme::Light);
        assert_eq!(host.preferences().load_theme(true), Theme::Light);
        host.shutdown();
    }

    #[test]
    fn test_constraints_follow_inputs() {
        let mut host = host_at(clock_at(2024, 1, 16, 10));
        host.set_start("2024-01-01");
        let constraints = host.constraints();
        assert_eq!(constraints.today_min, DateOnly::new(2024, 1, 1).ok());
        assert_eq!(constraints.today_max, None);
    }

    #[test]
    fn test_unchanged_dates_not_rewritten_on_ticks() {
        let writes = Arc::new(AtomicUsize::new(0));
        let store = CountingStore {
            inner:       MemoryStore::new(),
            date_writes: Arc::clone(&writes),
        };
        let calculator = ProgressCalculator::new(
            BusinessHourAnchor::at_default_hour(TimeBasis::Utc),
            BusinessHourAnchor::live(),
        );
        let mut host = ProgressHost::new(
            calculator,
            clock_at(2024, 1, 6, 10),
            Preferences::new(store),
            Duration::from_millis(2),
        );

        host.set_inputs(DateInputs::new("2024-01-01", "2024-01-06", "2024-01-21"))
            .expect("valid inputs");
        assert_eq!(writes.load(Ordering::SeqCst), 1);

        host.set_live(true).expect("live result");
        for _ in 0..20 {
            assert!(host.wait_for_tick(Duration::from_secs(5)));
        }
        assert_eq!(writes.load(Ordering::SeqCst), 1);

        host.set_end("2024-01-31");
        assert_eq!(writes.load(Ordering::SeqCst), 2);
        host.shutdown();
    }

    #[test]
    fn test_live_today_label_uses_manual_basis() {
        let plus_five: TimeBasis = "+05:00".parse().expect("offset basis");
        let calculator = ProgressCalculator::new(
            BusinessHourAnchor::at_default_hour(plus_five),
            BusinessHourAnchor::live(),
        );
        // 21:00 UTC on the 10th is already the 11th at +05:00
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 10, 21, 0, 0).unwrap()));
        let mut host = ProgressHost::new(
            calculator,
            clock,
            Preferences::new(MemoryStore::new()),
            Duration::from_millis(5),
        );

        host.set_inputs(DateInputs::new("2024-01-01", "", "2024-01-21"));
        host.set_live(true).expect("live result");

        assert_eq!(host.last_snapshot().map(|snap| snap.today), DateOnly::new(2024, 1, 11).ok());
        let model = host.render(PercentStyle::Compact).expect("render model");
        assert_eq!(model.today_label, "Jan 11, 2024");
        host.shutdown();
    }
}
