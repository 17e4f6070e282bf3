//! Fluent monitor assembly.

use std::fmt;
use std::rc::Rc;

use super::config::{Handler, MonitorConfig, StrategySetting};
use super::monitor::{Event, Monitor};
use super::topic::Topic;
use crate::strategy::Strategy;
use crate::target::Target;

/// One builder setting.
#[derive(Clone)]
pub enum Setting {
    /// Replaces the configured strategy setting.
    ///
    /// [`StrategySetting::Disabled`] wins over strategies added with
    /// [`MonitorBuilder::strategy`].
    Strategy(StrategySetting),
    /// Sets the bus dispatch mode.
    AsyncDispatch(bool),
    /// Binds a handler to a reserved topic, replacing any previous one.
    Handler(Topic, Handler),
}

impl fmt::Debug for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strategy(setting) => f.debug_tuple("Strategy").field(setting).finish(),
            Self::AsyncDispatch(enabled) => f.debug_tuple("AsyncDispatch").field(enabled).finish(),
            Self::Handler(topic, _) => f.debug_tuple("Handler").field(topic).finish(),
        }
    }
}

type Binding = (String, Rc<dyn Fn(&Event)>);

/// Single-use assembler producing exactly one [`Monitor`].
///
/// Strategies added with [`strategy`](Self::strategy) are appended to any
/// configured through [`Setting::Strategy`]. The first [`build`](Self::build)
/// constructs the monitor; later calls log a warning and return the same one.
///
/// # Example
///
/// ```
/// use vismon::monitor::{MonitorBuilder, Setting, Topic};
/// use vismon::strategy::PollingStrategy;
/// use vismon::target::{HostWindow, Target};
///
/// let mut builder = MonitorBuilder::new(Target::new(|_: &HostWindow| 1.0))
///     .set(Setting::AsyncDispatch(false))
///     .strategy(PollingStrategy::default())
///     .on(Topic::FullyVisible, |event| println!("{}", event.topic));
///
/// let monitor = builder.build();
/// assert!(!monitor.is_started());
/// ```
pub struct MonitorBuilder {
    target: Target,
    config: MonitorConfig,
    strategies: Vec<Rc<dyn Strategy>>,
    bindings: Vec<Binding>,
    built: Option<Monitor>,
}

impl MonitorBuilder {
    /// Starts assembling a monitor for `target`.
    #[must_use]
    pub fn new(target: Target) -> Self {
        Self {
            target,
            config: MonitorConfig::default(),
            strategies: Vec::new(),
            bindings: Vec::new(),
            built: None,
        }
    }

    /// Applies one setting.
    #[must_use]
    pub fn set(mut self, setting: Setting) -> Self {
        self.config = match setting {
            Setting::Strategy(strategy) => self.config.with_strategy_setting(strategy),
            Setting::AsyncDispatch(enabled) => self.config.with_async_dispatch(enabled),
            Setting::Handler(topic, handler) => self.config.with_shared_handler(topic, handler),
        };
        self
    }

    /// Adds a strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Rc::new(strategy));
        self
    }

    /// Adds several shared strategies, in order.
    #[must_use]
    pub fn strategies(mut self, strategies: impl IntoIterator<Item = Rc<dyn Strategy>>) -> Self {
        self.strategies.extend(strategies);
        self
    }

    /// Binds `listener` to `topic` (reserved or custom) once the monitor exists.
    #[must_use]
    pub fn on(mut self, topic: impl AsRef<str>, listener: impl Fn(&Event) + 'static) -> Self {
        self.bindings
            .push((topic.as_ref().to_string(), Rc::new(listener)));
        self
    }

    /// Builds the monitor, or returns the one already built.
    pub fn build(&mut self) -> Monitor {
        self.build_with(|_| {})
    }

    /// Builds the monitor and passes it to `consumer`.
    ///
    /// On repeated calls the cached monitor is returned and `consumer` does
    /// not run.
    pub fn build_with(&mut self, consumer: impl FnOnce(&Monitor)) -> Monitor {
        if let Some(monitor) = &self.built {
            tracing::warn!("monitor already built; returning the existing instance");
            return monitor.clone();
        }

        let mut config = std::mem::take(&mut self.config);
        let added = std::mem::take(&mut self.strategies);
        config.strategy = merge_strategies(config.strategy, added);

        let monitor = Monitor::new(self.target.clone(), config);
        for (topic, listener) in self.bindings.drain(..) {
            monitor.on(topic, move |event| listener(event));
        }
        consumer(&monitor);

        self.built = Some(monitor.clone());
        monitor
    }

    /// Returns true once [`build`](Self::build) has run.
    #[must_use]
    pub const fn is_built(&self) -> bool {
        self.built.is_some()
    }
}

fn merge_strategies(setting: StrategySetting, added: Vec<Rc<dyn Strategy>>) -> StrategySetting {
    match setting {
        StrategySetting::Disabled => StrategySetting::Disabled,
        StrategySetting::Default if added.is_empty() => StrategySetting::Default,
        StrategySetting::Default => StrategySetting::Use(added),
        StrategySetting::Use(mut explicit) => {
            explicit.extend(added);
            StrategySetting::Use(explicit)
        }
    }
}

impl fmt::Debug for MonitorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorBuilder")
            .field("config", &self.config)
            .field("strategies", &self.strategies.len())
            .field("bindings", &self.bindings.len())
            .field("built", &self.is_built())
            .finish_non_exhaustive()
    }
}
