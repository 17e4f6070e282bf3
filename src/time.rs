//! Time-based call primitives driven by the local task queue.
//!
//! This module provides:
//! - [`defer`]: Run a closure on a later turn of the queue
//! - [`Throttle`]: At most one call per window, with leading and trailing calls
//! - [`Debounce`]: One call after the input has been quiet for a window
//!
//! All primitives schedule work with [`tokio::task::spawn_local`], so the
//! deferred parts must be triggered from within a [`tokio::task::LocalSet`].
//! Cancelling aborts the spawned task; a task that has not started yet never runs.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::task::{JoinHandle, spawn_local};
use tokio::time::{Instant, sleep};

use crate::handle::Cancel;

/// Runs `f` on a later turn of the local task queue.
///
/// # Panics
///
/// Panics if called outside of a [`tokio::task::LocalSet`].
pub fn defer(f: impl FnOnce() + 'static) -> Cancel {
    let handle = spawn_local(async move { f() });
    Cancel::new(move || handle.abort())
}

// ============================================================================
// Throttle
// ============================================================================

/// Rate limiter guaranteeing at most one call per window.
///
/// The first call runs immediately. Calls arriving inside the window collapse
/// into a single trailing call at the end of the window, so the last input is
/// never lost.
///
/// Clones share the same window and pending call.
#[derive(Clone)]
pub struct Throttle {
    inner: Rc<ThrottleInner>,
}

struct ThrottleInner {
    window: Duration,
    callback: Box<dyn Fn()>,
    last_run: RefCell<Option<Instant>>,
    trailing: RefCell<Option<JoinHandle<()>>>,
}

impl Throttle {
    /// Creates a throttled wrapper around `callback`.
    #[must_use]
    pub fn new(window: Duration, callback: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(ThrottleInner {
                window,
                callback: Box::new(callback),
                last_run: RefCell::new(None),
                trailing: RefCell::new(None),
            }),
        }
    }

    /// Returns the throttle window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Requests a call.
    ///
    /// # Panics
    ///
    /// Panics if a trailing call must be scheduled outside of a
    /// [`tokio::task::LocalSet`].
    pub fn call(&self) {
        let now = Instant::now();
        let remaining = self
            .inner
            .last_run
            .borrow()
            .map_or(Duration::ZERO, |last| {
                self.inner
                    .window
                    .saturating_sub(now.saturating_duration_since(last))
            });

        if remaining.is_zero() {
            if let Some(pending) = self.inner.trailing.borrow_mut().take() {
                pending.abort();
            }
            *self.inner.last_run.borrow_mut() = Some(now);
            (self.inner.callback)();
            return;
        }

        if self.inner.trailing.borrow().is_some() {
            return;
        }

        let weak = Rc::downgrade(&self.inner);
        let handle = spawn_local(async move {
            sleep(remaining).await;
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.trailing.borrow_mut().take();
                *inner.last_run.borrow_mut() = Some(Instant::now());
                (inner.callback)();
            }
        });
        *self.inner.trailing.borrow_mut() = Some(handle);
    }

    /// Drops any pending trailing call and resets the window.
    ///
    /// Returns true if a trailing call was pending.
    pub fn cancel(&self) -> bool {
        *self.inner.last_run.borrow_mut() = None;
        let pending = self.inner.trailing.borrow_mut().take();
        pending.is_some_and(|handle| {
            handle.abort();
            true
        })
    }

    /// Returns true if a trailing call is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.trailing.borrow().is_some()
    }
}

impl fmt::Debug for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("window", &self.inner.window)
            .field("pending", &self.is_pending())
            .finish()
    }
}

// ============================================================================
// Debounce
// ============================================================================

/// Delays a call until no further calls arrived for a full window.
///
/// Every call restarts the window; only the last call of a burst runs.
#[derive(Clone)]
pub struct Debounce {
    inner: Rc<DebounceInner>,
}

struct DebounceInner {
    window: Duration,
    callback: Box<dyn Fn()>,
    pending: RefCell<Option<JoinHandle<()>>>,
}

impl Debounce {
    /// Creates a debounced wrapper around `callback`.
    #[must_use]
    pub fn new(window: Duration, callback: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(DebounceInner {
                window,
                callback: Box::new(callback),
                pending: RefCell::new(None),
            }),
        }
    }

    /// Returns the debounce window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Requests a call, restarting the quiet window.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`tokio::task::LocalSet`].
    pub fn call(&self) {
        if let Some(previous) = self.inner.pending.borrow_mut().take() {
            previous.abort();
        }

        let weak = Rc::downgrade(&self.inner);
        let window = self.inner.window;
        let handle = spawn_local(async move {
            sleep(window).await;
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.pending.borrow_mut().take();
                (inner.callback)();
            }
        });
        *self.inner.pending.borrow_mut() = Some(handle);
    }

    /// Drops the pending call, if any.
    ///
    /// Returns true if a call was pending.
    pub fn cancel(&self) -> bool {
        let pending = self.inner.pending.borrow_mut().take();
        pending.is_some_and(|handle| {
            handle.abort();
            true
        })
    }

    /// Returns true if a call is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }
}

impl fmt::Debug for Debounce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounce")
            .field("window", &self.inner.window)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::task::{LocalSet, yield_now};

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let handle = Rc::clone(&count);
        (count, move || handle.set(handle.get() + 1))
    }

    mod defer {
        use super::*;

        #[tokio::test]
        async fn runs_on_a_later_turn() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let _cancel = super::super::defer(bump);

                    assert_eq!(count.get(), 0);
                    yield_now().await;
                    assert_eq!(count.get(), 1);
                })
                .await;
        }

        #[tokio::test]
        async fn cancel_before_turn_prevents_run() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let cancel = super::super::defer(bump);

                    assert!(cancel.cancel());
                    yield_now().await;
                    yield_now().await;
                    assert_eq!(count.get(), 0);
                    assert!(!cancel.cancel());
                })
                .await;
        }
    }

    mod throttle {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn first_call_runs_immediately() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let throttle = Throttle::new(Duration::from_millis(50), bump);

                    throttle.call();
                    assert_eq!(count.get(), 1);
                    assert!(!throttle.is_pending());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn burst_collapses_into_one_trailing_call() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let throttle = Throttle::new(Duration::from_millis(50), bump);

                    throttle.call();
                    throttle.call();
                    throttle.call();
                    throttle.call();
                    assert_eq!(count.get(), 1);
                    assert!(throttle.is_pending());

                    sleep(Duration::from_millis(60)).await;
                    assert_eq!(count.get(), 2);
                    assert!(!throttle.is_pending());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn call_after_window_runs_immediately() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let throttle = Throttle::new(Duration::from_millis(50), bump);

                    throttle.call();
                    sleep(Duration::from_millis(80)).await;
                    throttle.call();

                    assert_eq!(count.get(), 2);
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn trailing_call_restarts_window() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let throttle = Throttle::new(Duration::from_millis(50), bump);

                    throttle.call();
                    sleep(Duration::from_millis(10)).await;
                    throttle.call();
                    sleep(Duration::from_millis(45)).await;
                    assert_eq!(count.get(), 2);

                    // Within the window opened by the trailing call
                    throttle.call();
                    assert_eq!(count.get(), 2);
                    assert!(throttle.is_pending());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn cancel_drops_trailing_call() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let throttle = Throttle::new(Duration::from_millis(50), bump);

                    throttle.call();
                    throttle.call();
                    assert!(throttle.cancel());
                    sleep(Duration::from_millis(100)).await;

                    assert_eq!(count.get(), 1);
                    assert!(!throttle.cancel());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn cancel_resets_window() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let throttle = Throttle::new(Duration::from_millis(50), bump);

                    throttle.call();
                    throttle.cancel();
                    throttle.call();

                    assert_eq!(count.get(), 2);
                })
                .await;
        }

        #[test]
        fn debug_includes_window() {
            let throttle = Throttle::new(Duration::from_millis(50), || {});
            let debug_str = format!("{throttle:?}");

            assert!(debug_str.contains("Throttle"));
            assert!(debug_str.contains("window"));
            assert_eq!(throttle.window(), Duration::from_millis(50));
        }
    }

    mod debounce {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn runs_once_after_quiet_window() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let debounce = Debounce::new(Duration::from_millis(100), bump);

                    debounce.call();
                    sleep(Duration::from_millis(60)).await;
                    debounce.call();
                    sleep(Duration::from_millis(60)).await;
                    assert_eq!(count.get(), 0);

                    sleep(Duration::from_millis(60)).await;
                    assert_eq!(count.get(), 1);
                    assert!(!debounce.is_pending());
                })
                .await;
        }

        #[tokio::test(start_paused = true)]
        async fn cancel_drops_pending_call() {
            LocalSet::new()
                .run_until(async {
                    let (count, bump) = counter();
                    let debounce = Debounce::new(Duration::from_millis(100), bump);

                    debounce.call();
                    assert!(debounce.cancel());
                    sleep(Duration::from_millis(200)).await;

                    assert_eq!(count.get(), 0);
                    assert!(!debounce.cancel());
                })
                .await;
        }

        #[test]
        fn window_accessor_returns_duration() {
            let debounce = Debounce::new(Duration::from_secs(2), || {});
            assert_eq!(debounce.window(), Duration::from_secs(2));
        }
    }
}
