//! Update-scheduling strategies.
//!
//! A strategy decides *when* a [`Monitor`] re-evaluates visibility. This
//! module provides:
//! - [`Strategy`]: The lifecycle contract (`init`, `start`, `stop`)
//! - [`BaseStrategy`]: The bare contract; fails fast when started
//! - [`PollingStrategy`]: Fixed-interval updates
//! - [`EventStrategy`]: Rate-limited updates on host signals
//! - [`CompositeStrategy`]: Ordered fan-out to child strategies
//!
//! # Lifecycle
//!
//! `init` runs once when the monitor is constructed. `start` is only called
//! after the monitor has performed at least one update, and is idempotent:
//! starting a running strategy returns `Ok(true)` without side effects.
//! `stop` returns `Ok(false)` when nothing was running.

mod composite;
mod error;
mod event;
mod polling;

pub use composite::CompositeStrategy;
pub use error::StrategyError;
pub use event::{EventStrategy, RateLimit};
pub use polling::PollingStrategy;

use std::rc::Rc;

use crate::monitor::Monitor;

/// Default polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default host-signal throttle window in milliseconds.
pub const DEFAULT_THROTTLE_MS: u64 = 50;

/// Policy deciding when a monitor calls [`Monitor::update`].
///
/// Methods take `&self`; implementations keep their handles in interior
/// mutability and must not hold a borrow across a call into the monitor,
/// since an update may re-enter the strategy through user listeners.
///
/// `start` and `stop` default to [`StrategyError::NotOverridden`], so an
/// incomplete custom strategy fails as soon as the monitor starts.
pub trait Strategy {
    /// Returns a short name for logs and errors.
    fn name(&self) -> &'static str {
        "strategy"
    }

    /// One-time wiring, called when the monitor is constructed.
    fn init(&self, _monitor: &Monitor) {}

    /// Begins triggering updates.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::NotOverridden`] unless overridden.
    fn start(&self, _monitor: &Monitor) -> Result<bool, StrategyError> {
        Err(StrategyError::not_overridden(self.name(), "start"))
    }

    /// Stops triggering updates.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::NotOverridden`] unless overridden.
    fn stop(&self, _monitor: &Monitor) -> Result<bool, StrategyError> {
        Err(StrategyError::not_overridden(self.name(), "stop"))
    }
}

/// The abstract strategy contract with no behaviour of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseStrategy;

impl Strategy for BaseStrategy {
    fn name(&self) -> &'static str {
        "base"
    }
}

/// Returns the strategies a monitor uses when none are configured:
/// polling every second plus throttled host-signal updates.
#[must_use]
pub fn default_strategies() -> Vec<Rc<dyn Strategy>> {
    vec![
        Rc::new(PollingStrategy::default()),
        Rc::new(EventStrategy::default()),
    ]
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MonitorConfig;
    use crate::target::{HostWindow, Target};

    fn monitor() -> Monitor {
        Target::new(|_: &HostWindow| 0.0).monitor(MonitorConfig::manual())
    }

    #[test]
    fn base_start_fails_fast() {
        let result = BaseStrategy.start(&monitor());

        assert_eq!(
            result,
            Err(StrategyError::NotOverridden {
                strategy: "base",
                operation: "start"
            })
        );
    }

    #[test]
    fn base_stop_fails_fast() {
        let result = BaseStrategy.stop(&monitor());

        assert!(matches!(
            result,
            Err(StrategyError::NotOverridden {
                operation: "stop",
                ..
            })
        ));
    }

    #[test]
    fn base_init_is_a_noop() {
        BaseStrategy.init(&monitor());
    }

    #[test]
    fn custom_strategy_inherits_defaults() {
        struct OnlyName;
        impl Strategy for OnlyName {}

        let err = OnlyName.start(&monitor()).unwrap_err();
        assert!(err.to_string().contains("'strategy'"));
    }

    #[test]
    fn default_set_is_polling_then_events() {
        let names: Vec<_> = default_strategies().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["polling", "event"]);
    }
}
