//! Monitor construction options.

use std::fmt;
use std::rc::Rc;

use super::monitor::Event;
use super::topic::Topic;
use crate::strategy::{CompositeStrategy, Strategy, default_strategies};

/// A handler bound to a reserved topic at construction.
pub type Handler = Rc<dyn Fn(&Event)>;

/// Which strategies drive a monitor.
#[derive(Clone, Default)]
pub enum StrategySetting {
    /// Polling plus throttled host signals.
    #[default]
    Default,
    /// No strategy at all; the caller drives [`update`](super::Monitor::update).
    Disabled,
    /// The given strategies, in order.
    Use(Vec<Rc<dyn Strategy>>),
}

impl StrategySetting {
    /// Resolves the setting to the single strategy the monitor holds.
    ///
    /// One strategy is used as-is; anything else is wrapped in a
    /// [`CompositeStrategy`].
    pub(crate) fn into_strategy(self) -> Rc<dyn Strategy> {
        match self {
            Self::Default => Rc::new(CompositeStrategy::new(default_strategies())),
            Self::Disabled => Rc::new(CompositeStrategy::empty()),
            Self::Use(strategies) => match <[Rc<dyn Strategy>; 1]>::try_from(strategies) {
                Ok([single]) => single,
                Err(strategies) => Rc::new(CompositeStrategy::new(strategies)),
            },
        }
    }
}

impl fmt::Debug for StrategySetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Use(strategies) => f
                .debug_tuple("Use")
                .field(&strategies.iter().map(|s| s.name()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Options for [`Monitor::new`](super::Monitor::new).
///
/// # Example
///
/// ```
/// use vismon::monitor::{MonitorConfig, Topic};
/// use vismon::strategy::PollingStrategy;
///
/// let config = MonitorConfig::default()
///     .with_strategy(PollingStrategy::default())
///     .with_handler(Topic::Visible, |event| println!("{} fired", event.topic));
/// ```
#[derive(Clone, Default)]
pub struct MonitorConfig {
    /// Strategies driving updates.
    pub strategy: StrategySetting,
    /// Defer bus dispatch to a later turn of the local task queue.
    pub async_dispatch: bool,
    /// At most one handler per reserved topic, bound at construction.
    pub handlers: Vec<(Topic, Handler)>,
}

impl MonitorConfig {
    /// Returns a configuration without strategies; updates are driven by hand.
    #[must_use]
    pub fn manual() -> Self {
        Self::default().with_strategy_setting(StrategySetting::Disabled)
    }

    /// Uses `strategy` as the only strategy.
    #[must_use]
    pub fn with_strategy(self, strategy: impl Strategy + 'static) -> Self {
        self.with_strategy_setting(StrategySetting::Use(vec![Rc::new(strategy)]))
    }

    /// Uses `strategies`, in order.
    #[must_use]
    pub fn with_strategies(self, strategies: impl IntoIterator<Item = Rc<dyn Strategy>>) -> Self {
        self.with_strategy_setting(StrategySetting::Use(strategies.into_iter().collect()))
    }

    /// Replaces the strategy setting.
    #[must_use]
    pub fn with_strategy_setting(mut self, strategy: StrategySetting) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the bus dispatch mode.
    #[must_use]
    pub fn with_async_dispatch(mut self, async_dispatch: bool) -> Self {
        self.async_dispatch = async_dispatch;
        self
    }

    /// Binds `handler` to `topic`, replacing any handler already set for it.
    #[must_use]
    pub fn with_handler(self, topic: Topic, handler: impl Fn(&Event) + 'static) -> Self {
        self.with_shared_handler(topic, Rc::new(handler))
    }

    pub(crate) fn with_shared_handler(mut self, topic: Topic, handler: Handler) -> Self {
        self.handlers.retain(|(bound, _)| *bound != topic);
        self.handlers.push((topic, handler));
        self
    }
}

impl fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics: Vec<_> = self.handlers.iter().map(|(topic, _)| *topic).collect();
        f.debug_struct("MonitorConfig")
            .field("strategy", &self.strategy)
            .field("async_dispatch", &self.async_dispatch)
            .field("handlers", &topics)
            .finish()
    }
}

/// Options for [`Monitor::start_with`](super::Monitor::start_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Start on a later turn of the local task queue.
    pub async_start: bool,
}

impl StartOptions {
    /// Options for a deferred start.
    #[must_use]
    pub const fn deferred() -> Self {
        Self { async_start: true }
    }
}
