//! The stateful visibility orchestrator.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use super::config::{MonitorConfig, StartOptions};
use super::error::MonitorError;
use super::state::VisState;
use super::topic::{CASCADE, Topic};
use crate::handle::{Cancel, Unregister};
use crate::pubsub::{PubSub, PubSubConfig, unique_any_topic};
use crate::strategy::Strategy;
use crate::target::Target;
use crate::time::defer;

/// Payload delivered to every monitor listener.
#[derive(Clone)]
pub struct Event {
    /// The topic this event was published on.
    pub topic: String,
    /// The publishing monitor.
    pub monitor: Monitor,
    /// Caller-supplied data; `Null` for reserved topics.
    pub data: Value,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("topic", &self.topic)
            .field("state", &self.monitor.state())
            .field("data", &self.data)
            .finish()
    }
}

/// Watches one [`Target`] and publishes visibility events.
///
/// A monitor owns the current [`VisState`], a private event bus and the
/// strategy deciding when [`update`](Self::update) runs. `Monitor` is a cheap
/// handle: clones refer to the same monitor.
///
/// # Events
///
/// Each update publishes [`Topic::Update`]. Listeners bound at construction
/// derive further topics from it:
///
/// - [`Topic::PercentageChange`] when the visible fraction changed
/// - [`Topic::VisibilityChange`] when the classification changed
/// - [`Topic::Visible`], [`Topic::FullyVisible`], [`Topic::Hidden`] on the
///   matching classification change
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use vismon::monitor::{MonitorConfig, Topic};
/// use vismon::target::{HostWindow, Target};
///
/// let visible = Rc::new(Cell::new(0.0));
/// let oracle = Rc::clone(&visible);
/// let monitor = Target::new(move |_: &HostWindow| oracle.get()).monitor(MonitorConfig::manual());
///
/// let shown = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&shown);
/// monitor.on(Topic::Visible, move |_| counter.set(counter.get() + 1));
///
/// monitor.start().unwrap();
/// visible.set(0.5);
/// monitor.update();
/// assert_eq!(shown.get(), 1);
/// ```
#[derive(Clone)]
pub struct Monitor {
    inner: Rc<Inner>,
}

/// A non-owning reference to a [`Monitor`].
#[derive(Clone, Debug)]
pub struct WeakMonitor {
    inner: Weak<Inner>,
}

struct Inner {
    target: Target,
    state: RefCell<Option<Rc<VisState>>>,
    bus: PubSub<Event>,
    strategy: Rc<dyn Strategy>,
    started: Cell<bool>,
    pending_start: RefCell<Option<Cancel>>,
}

impl Monitor {
    /// Creates a monitor for `target`.
    ///
    /// Cascade listeners are bound first, then the configured handlers, then
    /// the strategy's `init` runs. The monitor is not started.
    #[must_use]
    pub fn new(target: Target, config: MonitorConfig) -> Self {
        let MonitorConfig {
            strategy,
            async_dispatch,
            handlers,
        } = config;

        let monitor = Self {
            inner: Rc::new(Inner {
                target,
                state: RefCell::new(None),
                bus: PubSub::with_config(PubSubConfig {
                    any_topic: unique_any_topic(),
                    async_dispatch,
                }),
                strategy: strategy.into_strategy(),
                started: Cell::new(false),
                pending_start: RefCell::new(None),
            }),
        };

        monitor.bind_cascade();
        for (topic, handler) in handlers {
            monitor.on(topic, move |event| handler(event));
        }
        monitor.inner.strategy.init(&monitor);

        tracing::debug!(strategy = monitor.inner.strategy.name(), async_dispatch, "monitor created");
        monitor
    }

    fn bind_cascade(&self) {
        for rule in CASCADE {
            self.inner.bus.on(rule.source.name(), move |event: &Event| {
                let Some(state) = event.monitor.state() else {
                    return;
                };
                if (rule.fires)(&state, state.previous()) {
                    event.monitor.emit(rule.derived);
                }
            });
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Returns the current state, or `None` before the first update.
    ///
    /// While the reading is stable the same `Rc` is returned across updates,
    /// so [`Rc::ptr_eq`] is a valid "nothing changed" test.
    #[must_use]
    pub fn state(&self) -> Option<Rc<VisState>> {
        self.inner.state.borrow().clone()
    }

    /// Returns the observed target.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// Returns true while the monitor is started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.started.get()
    }

    /// Re-evaluates the target and publishes [`Topic::Update`].
    ///
    /// Does nothing unless the monitor is started. When the reading matches
    /// both the current state and its predecessor, the current state is kept
    /// as-is.
    pub fn update(&self) {
        if !self.is_started() {
            return;
        }

        let observed = self.inner.target.state();
        let next = match self.state() {
            Some(current) if current.is_settled_at(observed.percentage()) => current,
            Some(current) => Rc::new(observed.with_previous(&current)),
            None => Rc::new(observed),
        };

        tracing::trace!(state = %next, "update");
        *self.inner.state.borrow_mut() = Some(next);
        self.emit(Topic::Update);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Starts the monitor synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Strategy`] if the strategy fails to start.
    pub fn start(&self) -> Result<(), MonitorError> {
        self.start_with(StartOptions::default())
    }

    /// Starts the monitor.
    ///
    /// Does nothing if already started. Any pending deferred start is
    /// cancelled. Otherwise the monitor performs one update, publishes
    /// [`Topic::Start`] and starts its strategy. If the strategy fails it is
    /// stopped again, undoing any partial start, and the monitor is left
    /// stopped.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Strategy`] if the strategy fails to start.
    pub fn start_with(&self, options: StartOptions) -> Result<(), MonitorError> {
        if self.is_started() {
            return Ok(());
        }
        self.cancel_pending_start();

        if options.async_start {
            self.start_async_with(options);
            return Ok(());
        }

        self.inner.started.set(true);
        self.update();
        self.emit(Topic::Start);

        if let Err(error) = self.inner.strategy.start(self) {
            if let Err(rollback) = self.inner.strategy.stop(self) {
                tracing::warn!(%rollback, "strategy rollback after failed start");
            }
            self.inner.started.set(false);
            return Err(error.into());
        }

        tracing::debug!(strategy = self.inner.strategy.name(), "monitor started");
        Ok(())
    }

    /// Schedules a start on a later turn of the local task queue.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`tokio::task::LocalSet`].
    pub fn start_async(&self) -> Cancel {
        self.start_async_with(StartOptions::deferred())
    }

    /// Schedules `start_with(options)` on a later turn of the local task queue.
    ///
    /// Replaces any pending deferred start; calling [`start`](Self::start),
    /// `start_async` or [`stop`](Self::stop) before it fires cancels it.
    /// A failing deferred start is logged.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`tokio::task::LocalSet`].
    pub fn start_async_with(&self, options: StartOptions) -> Cancel {
        self.cancel_pending_start();

        let monitor = self.clone();
        let options = StartOptions {
            async_start: false,
            ..options
        };
        let cancel = defer(move || {
            monitor.inner.pending_start.borrow_mut().take();
            if let Err(error) = monitor.start_with(options) {
                tracing::error!(%error, "deferred start failed");
            }
        });

        *self.inner.pending_start.borrow_mut() = Some(cancel.clone());
        tracing::trace!("start deferred");
        cancel
    }

    /// Stops the monitor.
    ///
    /// Cancels any pending deferred start. Returns `Ok(false)` if the monitor
    /// was not started.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Strategy`] if the strategy fails to stop; the
    /// monitor then stays started.
    pub fn stop(&self) -> Result<bool, MonitorError> {
        self.cancel_pending_start();
        if !self.is_started() {
            return Ok(false);
        }

        self.inner.strategy.stop(self)?;
        self.emit(Topic::Stop);
        self.inner.started.set(false);

        tracing::debug!("monitor stopped");
        Ok(true)
    }

    fn cancel_pending_start(&self) {
        let pending = self.inner.pending_start.borrow_mut().take();
        if pending.is_some_and(|cancel| cancel.cancel()) {
            tracing::trace!("pending start cancelled");
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Registers `listener` on `topic`, reserved or custom.
    pub fn on(&self, topic: impl AsRef<str>, listener: impl Fn(&Event) + 'static) -> Unregister {
        self.inner.bus.on(topic.as_ref(), listener)
    }

    /// Registers `listener` for every topic published by this monitor.
    pub fn on_any(&self, listener: impl Fn(&Event) + 'static) -> Unregister {
        self.inner.bus.on(self.any_topic(), listener)
    }

    /// Returns this monitor's any-topic name. It is unique per monitor.
    #[must_use]
    pub fn any_topic(&self) -> &str {
        self.inner.bus.any_topic()
    }

    /// Publishes `data` on a custom topic.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ReservedTopic`] if `topic` names one of the
    /// monitor's own [`Topic`]s.
    ///
    /// # Panics
    ///
    /// Panics if the bus is asynchronous and this is called outside of a
    /// [`tokio::task::LocalSet`].
    pub fn publish(&self, topic: &str, data: Value) -> Result<Cancel, MonitorError> {
        if Topic::is_reserved(topic) {
            return Err(MonitorError::ReservedTopic(topic.to_string()));
        }
        Ok(self.dispatch(topic, data))
    }

    /// Publishes a reserved topic.
    fn emit(&self, topic: Topic) -> Cancel {
        self.dispatch(topic.name(), Value::Null)
    }

    fn dispatch(&self, topic: &str, data: Value) -> Cancel {
        let event = Event {
            topic: topic.to_string(),
            monitor: self.clone(),
            data,
        };
        self.inner.bus.publish(topic, event)
    }

    /// Returns a non-owning reference to this monitor.
    #[must_use]
    pub fn downgrade(&self) -> WeakMonitor {
        WeakMonitor {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl WeakMonitor {
    /// Returns the monitor if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Monitor> {
        self.inner.upgrade().map(|inner| Monitor { inner })
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("started", &self.is_started())
            .field("state", &self.state())
            .field("strategy", &self.inner.strategy.name())
            .field("any_topic", &self.any_topic())
            .finish_non_exhaustive()
    }
}
