use std::io;
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace};

use crate::LIVE_TICK_MS;

struct Running {
    stop:  oneshot::Sender<()>,
    ticks: mpsc::Receiver<Instant>,
    task:  JoinHandle<()>,
}

/// Periodic timer that drives live-mode recomputation.
///
/// An interval task on a private single-worker runtime posts a tick every
/// `interval`; the owner consumes ticks on its own thread with
/// [`try_tick`](Self::try_tick) or [`wait_tick`](Self::wait_tick).
/// Unconsumed ticks coalesce into one. Dropping the ticker stops it.
pub struct LiveTicker {
    interval: Duration,
    runtime:  Option<Runtime>,
    running:  Option<Running>,
}

impl Default for LiveTicker {
    fn default() -> Self {
        Self::new(Duration::from_millis(LIVE_TICK_MS))
    }
}

impl std::fmt::Debug for LiveTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTicker")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl LiveTicker {
    /// Creates a stopped ticker. The runtime is built on first start.
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            runtime: None,
            running: None,
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Starts ticking. Does nothing if already running.
    ///
    /// # Errors
    /// Returns the OS error if the timer runtime cannot be built.
    pub fn start(&mut self) -> io::Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        let runtime = match self.runtime.take() {
            Some(runtime) => runtime,
            None => Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("daytoday-ticker")
                .enable_time()
                .build()?,
        };

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let (tick_tx, tick_rx) = mpsc::channel::<Instant>(1);
        let interval = self.interval;

        let task = runtime.spawn(async move {
            let mut timer = time::interval_at(time::Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    at = timer.tick() => match tick_tx.try_send(at.into_std()) {
                        Ok(()) | Err(TrySendError::Full(_)) => {},
                        Err(TrySendError::Closed(_)) => break,
                    },
                }
            }
            trace!("ticker task exiting");
        });

        debug!(interval_ms = interval.as_millis(), "live ticker started");
        self.runtime = Some(runtime);
        self.running = Some(Running {
            stop: stop_tx,
            ticks: tick_rx,
            task,
        });
        Ok(())
    }

    /// Stops ticking and waits for the interval task to finish. Does nothing
    /// if stopped.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.stop.send(());
        if let Some(runtime) = &self.runtime {
            if let Err(err) = runtime.block_on(running.task) {
                debug!(error = %err, "ticker task failed");
            }
        }
        debug!("live ticker stopped");
    }

    /// Drains pending ticks without blocking; true if any had fired.
    pub fn try_tick(&mut self) -> bool {
        let Some(running) = &mut self.running else {
            return false;
        };
        let mut fired = false;
        while running.ticks.try_recv().is_ok() {
            fired = true;
        }
        fired
    }

    /// Blocks up to `timeout` for the next tick; false on timeout or when stopped.
    pub fn wait_tick(&mut self, timeout: Duration) -> bool {
        let (Some(runtime), Some(running)) = (&self.runtime, &mut self.running) else {
            return false;
        };
        runtime
            .block_on(async { time::timeout(timeout, running.ticks.recv()).await })
            .is_ok_and(|tick| tick.is_some())
    }
}

impl Drop for LiveTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
