//! Shared test fixtures for monitor and strategy tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::handle::Unregister;
use crate::monitor::{Monitor, MonitorConfig};
use crate::strategy::{Strategy, StrategyError};
use crate::target::{HostWindow, Target};

/// Oracle whose reading is set by hand.
#[derive(Clone)]
pub struct Dial {
    value: Rc<Cell<f64>>,
}

impl Dial {
    pub fn new(value: f64) -> Self {
        Self {
            value: Rc::new(Cell::new(value)),
        }
    }

    pub fn set(&self, value: f64) {
        self.value.set(value);
    }

    pub fn target(&self) -> Target {
        let value = Rc::clone(&self.value);
        Target::new(move |_: &HostWindow| value.get())
    }

    /// A manually driven monitor over this dial.
    pub fn monitor(&self) -> Monitor {
        self.target().monitor(MonitorConfig::manual())
    }
}

/// Oracle returning scripted readings in order; the last one repeats.
pub fn scripted_target(readings: &[f64]) -> Target {
    let queue = RefCell::new(readings.iter().copied().collect::<VecDeque<_>>());
    Target::new(move |_: &HostWindow| {
        let mut queue = queue.borrow_mut();
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().copied().unwrap_or_default()
        }
    })
}

/// Records every topic a monitor publishes.
#[derive(Clone, Default)]
pub struct EventLog {
    topics: Rc<RefCell<Vec<String>>>,
}

impl EventLog {
    pub fn attach(monitor: &Monitor) -> Self {
        let log = Self::default();
        let topics = Rc::clone(&log.topics);
        monitor.on_any(move |event| topics.borrow_mut().push(event.topic.clone()));
        log
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.borrow().clone()
    }

    pub fn count(&self, topic: impl AsRef<str>) -> usize {
        let topic = topic.as_ref();
        self.topics.borrow().iter().filter(|t| *t == topic).count()
    }

    pub fn clear(&self) {
        self.topics.borrow_mut().clear();
    }
}

/// Counts how often `topic` fires on `monitor`.
pub fn counter(monitor: &Monitor, topic: impl AsRef<str>) -> (Rc<Cell<usize>>, Unregister) {
    let count = Rc::new(Cell::new(0));
    let sink = Rc::clone(&count);
    let unregister = monitor.on(topic, move |_| sink.set(sink.get() + 1));
    (count, unregister)
}

/// Strategy recording its lifecycle calls into a shared journal.
pub struct Recording {
    name: &'static str,
    journal: Rc<RefCell<Vec<String>>>,
    fail_start: bool,
    running: Cell<bool>,
}

impl Recording {
    pub fn new(name: &'static str, journal: &Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            name,
            journal: Rc::clone(journal),
            fail_start: false,
            running: Cell::new(false),
        }
    }

    pub fn failing(name: &'static str, journal: &Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            fail_start: true,
            ..Self::new(name, journal)
        }
    }

    fn record(&self, operation: &str) {
        self.journal
            .borrow_mut()
            .push(format!("{}:{operation}", self.name));
    }
}

impl Strategy for Recording {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&self, _monitor: &Monitor) {
        self.record("init");
    }

    fn start(&self, _monitor: &Monitor) -> Result<bool, StrategyError> {
        self.record("start");
        if self.fail_start {
            return Err(StrategyError::not_overridden(self.name, "start"));
        }
        self.running.set(true);
        Ok(true)
    }

    fn stop(&self, _monitor: &Monitor) -> Result<bool, StrategyError> {
        self.record("stop");
        Ok(self.running.replace(false))
    }
}
