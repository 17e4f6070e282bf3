//! Ordered fan-out over child strategies.

use std::fmt;
use std::rc::Rc;

use super::{Strategy, StrategyError};
use crate::monitor::Monitor;

/// Forwards each lifecycle call to its children in order.
///
/// The first failing child aborts the fan-out; children already started (or
/// stopped) are not rolled back.
#[derive(Clone, Default)]
pub struct CompositeStrategy {
    children: Vec<Rc<dyn Strategy>>,
}

impl CompositeStrategy {
    /// Creates a composite over `children`.
    #[must_use]
    pub fn new(children: Vec<Rc<dyn Strategy>>) -> Self {
        Self { children }
    }

    /// Creates a composite with no children. Starting it does nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    /// Returns the child strategies.
    #[must_use]
    pub fn children(&self) -> &[Rc<dyn Strategy>] {
        &self.children
    }

    /// Returns the number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns true if there are no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Strategy for CompositeStrategy {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn init(&self, monitor: &Monitor) {
        for child in &self.children {
            child.init(monitor);
        }
    }

    fn start(&self, monitor: &Monitor) -> Result<bool, StrategyError> {
        for child in &self.children {
            child.start(monitor)?;
        }
        Ok(true)
    }

    /// Returns true if at least one child was running.
    fn stop(&self, monitor: &Monitor) -> Result<bool, StrategyError> {
        let mut stopped = false;
        for child in &self.children {
            stopped |= child.stop(monitor)?;
        }
        Ok(stopped)
    }
}

impl fmt::Debug for CompositeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.children.iter().map(|child| child.name()).collect();
        f.debug_struct("CompositeStrategy")
            .field("children", &names)
            .finish()
    }
}
