//! Host-signal driven strategy.

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use super::{DEFAULT_THROTTLE_MS, Strategy, StrategyError};
use crate::handle::Unregister;
use crate::monitor::Monitor;
use crate::target::HostSignal;
use crate::time::{Debounce, Throttle};

/// How host signals are rate-limited before reaching [`Monitor::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimit {
    /// At most one update per window, with a trailing update capturing the
    /// final state of a burst.
    Throttle(Duration),
    /// One update once signals have been quiet for the window.
    Debounce(Duration),
}

impl RateLimit {
    /// Returns the window duration.
    #[must_use]
    pub const fn window(self) -> Duration {
        match self {
            Self::Throttle(window) | Self::Debounce(window) => window,
        }
    }
}

/// Rate limiter bound to one monitor.
#[derive(Clone)]
enum Limiter {
    Throttle(Throttle),
    Debounce(Debounce),
}

impl Limiter {
    fn new(rate: RateLimit, monitor: &Monitor) -> Self {
        let weak = monitor.downgrade();
        let update = move || {
            if let Some(monitor) = weak.upgrade() {
                monitor.update();
            }
        };

        match rate {
            RateLimit::Throttle(window) => Self::Throttle(Throttle::new(window, update)),
            RateLimit::Debounce(window) => Self::Debounce(Debounce::new(window, update)),
        }
    }

    fn call(&self) {
        match self {
            Self::Throttle(throttle) => throttle.call(),
            Self::Debounce(debounce) => debounce.call(),
        }
    }

    /// Runs the update immediately; a throttle also opens its window.
    fn lead(&self, monitor: &Monitor) {
        match self {
            Self::Throttle(throttle) => throttle.call(),
            Self::Debounce(_) => monitor.update(),
        }
    }

    fn cancel(&self) -> bool {
        match self {
            Self::Throttle(throttle) => throttle.cancel(),
            Self::Debounce(debounce) => debounce.cancel(),
        }
    }
}

/// Subscriptions held while the strategy runs.
struct Active {
    limiter: Limiter,
    subscriptions: Vec<Unregister>,
}

/// Updates the monitor when the host scrolls, resizes, receives touch
/// movement, or changes page visibility.
///
/// Signals are read from the target's reference window and rate-limited
/// (throttled by default). `start` also performs one immediate update.
pub struct EventStrategy {
    rate: RateLimit,
    active: RefCell<Option<Active>>,
}

impl EventStrategy {
    /// Creates a strategy throttling host signals to one update per `window`.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self::with_rate_limit(RateLimit::Throttle(window))
    }

    /// Creates a strategy that updates once signals have been quiet for `window`.
    #[must_use]
    pub const fn debounced(window: Duration) -> Self {
        Self::with_rate_limit(RateLimit::Debounce(window))
    }

    /// Creates a strategy with an explicit rate limit.
    #[must_use]
    pub const fn with_rate_limit(rate: RateLimit) -> Self {
        Self {
            rate,
            active: RefCell::new(None),
        }
    }

    /// Returns the configured rate limit.
    #[must_use]
    pub const fn rate_limit(&self) -> RateLimit {
        self.rate
    }

    /// Returns true while host signals are subscribed.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.active.borrow().is_some()
    }
}

impl Default for EventStrategy {
    /// Creates a strategy with a 50 ms throttle window.
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_THROTTLE_MS))
    }
}

impl Strategy for EventStrategy {
    fn name(&self) -> &'static str {
        "event"
    }

    /// Subscribes to every [`HostSignal`] and performs a leading update.
    ///
    /// # Panics
    ///
    /// Panics if a trailing update has to be scheduled outside of a
    /// [`tokio::task::LocalSet`].
    fn start(&self, monitor: &Monitor) -> Result<bool, StrategyError> {
        if self.is_started() {
            return Ok(true);
        }

        let limiter = Limiter::new(self.rate, monitor);
        let window = monitor.target().reference_window();
        let subscriptions = HostSignal::ALL
            .into_iter()
            .map(|signal| {
                let limiter = limiter.clone();
                window.on(signal, move |_| limiter.call())
            })
            .collect();

        *self.active.borrow_mut() = Some(Active {
            limiter: limiter.clone(),
            subscriptions,
        });
        tracing::debug!(rate = ?self.rate, "host signal subscriptions started");

        limiter.lead(monitor);
        Ok(true)
    }

    fn stop(&self, _monitor: &Monitor) -> Result<bool, StrategyError> {
        let Some(active) = self.active.borrow_mut().take() else {
            return Ok(false);
        };

        for subscription in &active.subscriptions {
            subscription.unregister();
        }
        if active.limiter.cancel() {
            tracing::trace!("dropped pending rate-limited update");
        }

        tracing::debug!("host signal subscriptions stopped");
        Ok(true)
    }
}

impl fmt::Debug for EventStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStrategy")
            .field("rate", &self.rate)
            .field("started", &self.is_started())
            .finish()
    }
}
