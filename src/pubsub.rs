//! Topic-addressed publish/subscribe bus.
//!
//! This module provides [`PubSub`], a registry mapping topic names to ordered
//! listener sequences, plus one "any-topic" sequence notified on every publish
//! to another topic.
//!
//! # Dispatch
//!
//! - **Snapshot**: `publish` copies the listener sequence before invoking it, so
//!   listeners registering or unregistering during dispatch never cause a
//!   sibling to be skipped or invoked twice.
//! - **Synchronous** (default): listeners run before `publish` returns.
//! - **Deferred**: listeners run on a later turn of the local task queue; the
//!   returned [`Cancel`] drops the whole pending dispatch.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::handle::{Cancel, Unregister};
use crate::time::defer;

/// Default name of the any-topic.
pub const ANY_TOPIC: &str = "*";

/// A shared listener callback.
pub type Listener<A> = Rc<dyn Fn(&A)>;

static ANY_TOPIC_SEQ: AtomicU64 = AtomicU64::new(0);

/// Returns a process-unique any-topic name.
///
/// Used to keep independently created buses from interpreting each other's
/// any-topic names as regular topics.
#[must_use]
pub fn unique_any_topic() -> String {
    let seq = ANY_TOPIC_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{ANY_TOPIC}any-{seq}")
}

/// Bus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubConfig {
    /// Topic name whose listeners observe every publish.
    pub any_topic: String,
    /// Defer dispatch to a later turn of the local task queue.
    pub async_dispatch: bool,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            any_topic: ANY_TOPIC.to_string(),
            async_dispatch: false,
        }
    }
}

/// Topic-addressed listener registry.
///
/// `PubSub` is a cheap handle; clones share the same registry.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use vismon::pubsub::PubSub;
///
/// let bus = PubSub::<u32>::new();
/// let seen = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&seen);
/// let unregister = bus.on("tick", move |n: &u32| sink.set(*n));
///
/// bus.publish("tick", 7);
/// assert_eq!(seen.get(), 7);
///
/// assert!(unregister.unregister());
/// bus.publish("tick", 9);
/// assert_eq!(seen.get(), 7);
/// ```
pub struct PubSub<A> {
    inner: Rc<Inner<A>>,
}

struct Inner<A> {
    config: PubSubConfig,
    topics: RefCell<HashMap<String, Vec<Listener<A>>>>,
}

impl<A: Clone + 'static> PubSub<A> {
    /// Creates a synchronous bus with the default any-topic name.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PubSubConfig::default())
    }

    /// Creates a bus with the given configuration.
    #[must_use]
    pub fn with_config(config: PubSubConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                config,
                topics: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Returns the any-topic name of this bus.
    #[must_use]
    pub fn any_topic(&self) -> &str {
        &self.inner.config.any_topic
    }

    /// Returns true if dispatch is deferred.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.inner.config.async_dispatch
    }

    /// Registers `listener` on `topic`.
    ///
    /// Registering on the any-topic name subscribes to every publish.
    /// The returned handle removes exactly this registration.
    pub fn on(&self, topic: &str, listener: impl Fn(&A) + 'static) -> Unregister {
        let listener: Listener<A> = Rc::new(listener);
        self.inner
            .topics
            .borrow_mut()
            .entry(topic.to_string())
            .or_default()
            .push(Rc::clone(&listener));

        tracing::trace!(topic, "listener registered");

        let registry: Weak<Inner<A>> = Rc::downgrade(&self.inner);
        let topic = topic.to_string();
        Unregister::new(move || {
            registry
                .upgrade()
                .is_some_and(|inner| inner.remove(&topic, &listener))
        })
    }

    /// Publishes `args` to every listener of `topic`, followed by every
    /// any-topic listener (unless `topic` is the any-topic itself).
    ///
    /// Returns a handle that cancels a deferred dispatch; for synchronous
    /// buses the dispatch has already completed and the handle is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the bus is asynchronous and this is called outside of a
    /// [`tokio::task::LocalSet`].
    pub fn publish(&self, topic: &str, args: A) -> Cancel {
        let snapshot = self.snapshot(topic);
        if snapshot.is_empty() {
            return Cancel::noop();
        }

        tracing::trace!(topic, listeners = snapshot.len(), "publishing");

        if self.is_async() {
            defer(move || dispatch(&snapshot, &args))
        } else {
            dispatch(&snapshot, &args);
            Cancel::noop()
        }
    }

    /// Returns the number of listeners registered on `topic`.
    #[must_use]
    pub fn listener_count(&self, topic: &str) -> usize {
        self.inner.topics.borrow().get(topic).map_or(0, Vec::len)
    }

    /// Copies the listeners that a publish to `topic` must reach, in order.
    fn snapshot(&self, topic: &str) -> Vec<Listener<A>> {
        let topics = self.inner.topics.borrow();
        let mut listeners: Vec<Listener<A>> = topics.get(topic).cloned().unwrap_or_default();

        if topic != self.any_topic() {
            if let Some(any) = topics.get(self.any_topic()) {
                listeners.extend(any.iter().cloned());
            }
        }

        listeners
    }
}

impl<A> Inner<A> {
    fn remove(&self, topic: &str, listener: &Listener<A>) -> bool {
        let mut topics = self.topics.borrow_mut();
        let Some(listeners) = topics.get_mut(topic) else {
            return false;
        };
        let Some(index) = listeners.iter().position(|l| Rc::ptr_eq(l, listener)) else {
            return false;
        };

        listeners.remove(index);
        if listeners.is_empty() {
            topics.remove(topic);
        }
        tracing::trace!(topic, "listener unregistered");
        true
    }
}

fn dispatch<A>(listeners: &[Listener<A>], args: &A) {
    for listener in listeners {
        listener(args);
    }
}

impl<A: Clone + 'static> Default for PubSub<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for PubSub<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for PubSub<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.inner.topics.borrow();
        f.debug_struct("PubSub")
            .field("any_topic", &self.inner.config.any_topic)
            .field("async_dispatch", &self.inner.config.async_dispatch)
            .field("topics", &topics.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "pubsub_tests.rs"]
mod tests;
