//! Capability handles returned by registration and scheduling calls.
//!
//! This module provides:
//! - [`Cancel`]: Undoes a pending deferred action (async dispatch, async start)
//! - [`Unregister`]: Removes one exact listener from the bus it was added to
//!
//! Both handles have exactly-once semantics: the underlying action runs on the
//! first invocation only, and later invocations are harmless no-ops.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type CancelAction = Box<dyn FnOnce()>;
type UnregisterAction = Box<dyn FnOnce() -> bool>;

/// Handle for cancelling a pending deferred action.
///
/// Clones share the same underlying action, so cancelling through any clone
/// cancels for all of them.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use vismon::handle::Cancel;
///
/// let count = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&count);
/// let cancel = Cancel::new(move || counter.set(counter.get() + 1));
///
/// assert!(cancel.cancel());
/// assert!(!cancel.cancel());
/// assert_eq!(count.get(), 1);
/// ```
#[derive(Clone)]
pub struct Cancel {
    action: Rc<RefCell<Option<CancelAction>>>,
}

impl Cancel {
    /// Creates a handle that runs `action` on the first cancellation.
    #[must_use]
    pub fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            action: Rc::new(RefCell::new(Some(Box::new(action)))),
        }
    }

    /// Creates a handle with nothing to cancel.
    ///
    /// Returned for synchronous publishes, which have already completed.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            action: Rc::new(RefCell::new(None)),
        }
    }

    /// Cancels the pending action.
    ///
    /// Returns `true` if this call performed the cancellation, `false` if it
    /// had already been cancelled (or there was nothing to cancel).
    pub fn cancel(&self) -> bool {
        let action = self.action.borrow_mut().take();
        action.is_some_and(|action| {
            action();
            true
        })
    }

    /// Returns true once the handle can no longer cancel anything.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.action.borrow().is_none()
    }
}

impl fmt::Debug for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancel")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Handle for removing a registered listener.
///
/// Returned by every `on` call. Dropping the handle does NOT unregister the
/// listener; only an explicit [`Unregister::unregister`] call does.
pub struct Unregister {
    action: RefCell<Option<UnregisterAction>>,
}

impl Unregister {
    /// Creates a handle that runs `action` on the first call.
    #[must_use]
    pub fn new(action: impl FnOnce() -> bool + 'static) -> Self {
        Self {
            action: RefCell::new(Some(Box::new(action))),
        }
    }

    /// Creates a handle that removes nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            action: RefCell::new(None),
        }
    }

    /// Removes the listener.
    ///
    /// Returns `true` if a listener was actually removed by this call.
    pub fn unregister(&self) -> bool {
        let action = self.action.borrow_mut().take();
        action.is_some_and(|action| action())
    }
}

impl fmt::Debug for Unregister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unregister")
            .field("spent", &self.action.borrow().is_none())
            .finish()
    }
}
