//! Fixed-interval polling strategy.

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use tokio::task::{JoinHandle, spawn_local};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;

use super::{DEFAULT_POLL_INTERVAL_MS, Strategy, StrategyError};
use crate::monitor::Monitor;

/// Calls [`Monitor::update`] at a fixed interval.
///
/// The first tick fires one full interval after `start`; the monitor has
/// already updated once by then. Ticks missed while the queue was busy are
/// not replayed in a burst. The timer ends on its own once the monitor is
/// dropped.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use vismon::monitor::MonitorConfig;
/// use vismon::strategy::PollingStrategy;
/// use vismon::target::{HostWindow, Target};
///
/// let monitor = Target::new(|_: &HostWindow| 0.5).monitor(
///     MonitorConfig::default().with_strategy(PollingStrategy::new(Duration::from_millis(250))),
/// );
/// assert!(!monitor.is_started());
/// ```
pub struct PollingStrategy {
    interval: Duration,
    task: RefCell<Option<JoinHandle<()>>>,
}

impl PollingStrategy {
    /// Shortest accepted interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// Creates a polling strategy with the given interval.
    ///
    /// A zero interval is raised to [`Self::MIN_INTERVAL`].
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            Self::MIN_INTERVAL
        } else {
            interval
        };

        Self {
            interval,
            task: RefCell::new(None),
        }
    }

    /// Returns the configured polling interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true while the polling timer is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.task.borrow().is_some()
    }
}

impl Default for PollingStrategy {
    /// Creates a polling strategy with a one-second interval.
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl Strategy for PollingStrategy {
    fn name(&self) -> &'static str {
        "polling"
    }

    /// Starts the polling timer.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`tokio::task::LocalSet`].
    fn start(&self, monitor: &Monitor) -> Result<bool, StrategyError> {
        if self.is_started() {
            return Ok(true);
        }

        let period = self.interval;
        let weak = monitor.downgrade();
        let handle = spawn_local(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut ticks = IntervalStream::new(timer);
            while ticks.next().await.is_some() {
                let Some(monitor) = weak.upgrade() else {
                    break;
                };
                monitor.update();
            }
        });
        *self.task.borrow_mut() = Some(handle);

        tracing::debug!(interval_ms = period.as_millis(), "polling started");
        Ok(true)
    }

    fn stop(&self, _monitor: &Monitor) -> Result<bool, StrategyError> {
        let Some(handle) = self.task.borrow_mut().take() else {
            return Ok(false);
        };

        handle.abort();
        tracing::debug!("polling stopped");
        Ok(true)
    }
}

impl fmt::Debug for PollingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingStrategy")
            .field("interval", &self.interval)
            .field("started", &self.is_started())
            .finish()
    }
}
