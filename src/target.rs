//! The observed surface and its visibility oracle.
//!
//! This module provides:
//! - [`Surface`]: The percentage hook computing a visible fraction
//! - [`Target`]: A surface plus thresholds, visibility hooks and a reference window
//! - [`HostWindow`]: The reference window delivering host signals ([`HostSignal`])
//!
//! The engine never measures geometry itself; it only reads the fraction a
//! [`Surface`] reports and classifies it.

use std::fmt;
use std::rc::Rc;

use crate::handle::Unregister;
use crate::monitor::{Monitor, MonitorConfig, VisState};
use crate::pubsub::{PubSub, PubSubConfig, unique_any_topic};

/// Default fraction at or below which a surface counts as hidden.
pub const DEFAULT_HIDDEN: f64 = 0.0;

/// Default fraction at or above which a surface counts as fully visible.
pub const DEFAULT_FULLY_VISIBLE: f64 = 1.0;

/// Default number of decimal places percentages are rounded to.
pub const DEFAULT_PRECISION: u32 = 3;

// ============================================================================
// Host window
// ============================================================================

/// Host signals that may change how much of a surface is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostSignal {
    /// The viewport scrolled.
    Scroll,
    /// The viewport was resized.
    Resize,
    /// A touch gesture moved the content.
    TouchMove,
    /// The page was shown or hidden.
    VisibilityChange,
}

impl HostSignal {
    /// Every host signal, in subscription order.
    pub const ALL: [Self; 4] = [
        Self::Scroll,
        Self::Resize,
        Self::TouchMove,
        Self::VisibilityChange,
    ];

    /// Returns the signal's topic name on the host window.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scroll => "scroll",
            Self::Resize => "resize",
            Self::TouchMove => "touchmove",
            Self::VisibilityChange => "visibilitychange",
        }
    }
}

impl fmt::Display for HostSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference window through which host signals are delivered.
///
/// The embedding application calls [`HostWindow::emit`] whenever the host
/// scrolls, resizes and so on; strategies subscribe with [`HostWindow::on`].
/// Clones share the same signal registry.
#[derive(Clone, Debug)]
pub struct HostWindow {
    signals: PubSub<HostSignal>,
}

impl HostWindow {
    /// Creates a window with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signals: PubSub::with_config(PubSubConfig {
                any_topic: unique_any_topic(),
                async_dispatch: false,
            }),
        }
    }

    /// Subscribes `listener` to `signal`.
    pub fn on(&self, signal: HostSignal, listener: impl Fn(&HostSignal) + 'static) -> Unregister {
        self.signals.on(signal.name(), listener)
    }

    /// Delivers `signal` to its subscribers synchronously.
    pub fn emit(&self, signal: HostSignal) {
        tracing::trace!(%signal, "host signal");
        self.signals.publish(signal.name(), signal);
    }

    /// Returns the number of subscribers for `signal`.
    #[must_use]
    pub fn listener_count(&self, signal: HostSignal) -> usize {
        self.signals.listener_count(signal.name())
    }
}

impl Default for HostWindow {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Surface
// ============================================================================

/// Percentage hook: reports the visible fraction of a surface.
///
/// Any `Fn(&HostWindow) -> f64` closure is a surface.
pub trait Surface {
    /// Returns the visible fraction of the surface in `[0, 1]`.
    fn percentage(&self, window: &HostWindow) -> f64;
}

impl<F> Surface for F
where
    F: Fn(&HostWindow) -> f64,
{
    fn percentage(&self, window: &HostWindow) -> f64 {
        self(window)
    }
}

// ============================================================================
// Target
// ============================================================================

/// Classification thresholds and rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetOptions {
    /// Fraction at or below which the surface counts as hidden.
    pub hidden: f64,
    /// Fraction at or above which the surface counts as fully visible.
    pub fully_visible: f64,
    /// Decimal places percentages are rounded to.
    pub precision: u32,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            hidden: DEFAULT_HIDDEN,
            fully_visible: DEFAULT_FULLY_VISIBLE,
            precision: DEFAULT_PRECISION,
        }
    }
}

type VisibilityHook = Rc<dyn Fn() -> bool>;

/// A watched surface together with its classification options.
///
/// `Target` is a cheap handle; several monitors may observe clones of the
/// same target.
///
/// # Example
///
/// ```
/// use vismon::target::{HostWindow, Target};
/// use vismon::monitor::VisCode;
///
/// let target = Target::new(|_: &HostWindow| 0.4567);
/// let state = target.state();
///
/// assert_eq!(state.code(), VisCode::Visible);
/// assert!((state.percentage() - 0.457).abs() < f64::EPSILON);
/// ```
#[derive(Clone)]
pub struct Target {
    surface: Rc<dyn Surface>,
    window: HostWindow,
    options: TargetOptions,
    visibility_hooks: Vec<VisibilityHook>,
}

impl Target {
    /// Creates a target with default options and a fresh reference window.
    #[must_use]
    pub fn new(surface: impl Surface + 'static) -> Self {
        Self {
            surface: Rc::new(surface),
            window: HostWindow::new(),
            options: TargetOptions::default(),
            visibility_hooks: Vec::new(),
        }
    }

    /// Uses `window` as the reference window.
    #[must_use]
    pub fn with_window(mut self, window: HostWindow) -> Self {
        self.window = window;
        self
    }

    /// Replaces the classification options.
    #[must_use]
    pub fn with_options(mut self, options: TargetOptions) -> Self {
        self.options = options;
        self
    }

    /// Adds a visibility hook.
    ///
    /// When any hook returns `false`, the surface is reported hidden with a
    /// percentage of `0` regardless of its geometry.
    #[must_use]
    pub fn with_visibility_hook(mut self, hook: impl Fn() -> bool + 'static) -> Self {
        self.visibility_hooks.push(Rc::new(hook));
        self
    }

    /// Returns the classification options.
    #[must_use]
    pub const fn options(&self) -> &TargetOptions {
        &self.options
    }

    /// Returns the reference window strategies attach host signals to.
    #[must_use]
    pub const fn reference_window(&self) -> &HostWindow {
        &self.window
    }

    /// Returns the current visible fraction, clamped and rounded.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if !self.visibility_hooks.iter().all(|hook| hook()) {
            return 0.0;
        }

        let raw = self.surface.percentage(&self.window);
        round(clamp_fraction(raw), self.options.precision)
    }

    /// Classifies the surface now.
    ///
    /// The returned state has no `previous` link.
    #[must_use]
    pub fn state(&self) -> VisState {
        VisState::classify(self.percentage(), &self.options)
    }

    /// Returns true if the surface is currently hidden.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.state().is_hidden()
    }

    /// Returns true if the surface is currently visible (including fully).
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state().is_visible()
    }

    /// Returns true if the surface is currently fully visible.
    #[must_use]
    pub fn is_fully_visible(&self) -> bool {
        self.state().is_fully_visible()
    }

    /// Creates a monitor observing this target.
    #[must_use]
    pub fn monitor(&self, config: MonitorConfig) -> Monitor {
        Monitor::new(self.clone(), config)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("options", &self.options)
            .field("visibility_hooks", &self.visibility_hooks.len())
            .finish_non_exhaustive()
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn round(value: f64, precision: u32) -> f64 {
    let exponent = i32::try_from(precision).unwrap_or(i32::MAX);
    let factor = 10_f64.powi(exponent);
    if factor.is_finite() {
        (value * factor).round() / factor
    } else {
        value
    }
}
