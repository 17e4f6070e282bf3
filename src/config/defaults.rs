//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

use crate::strategy::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_THROTTLE_MS};

/// Default polling interval in milliseconds.
pub const POLL_INTERVAL_MS: u64 = DEFAULT_POLL_INTERVAL_MS;

/// Default host-signal throttle window in milliseconds.
pub const THROTTLE_MS: u64 = DEFAULT_THROTTLE_MS;

/// Default replay duration in milliseconds.
pub const DURATION_MS: u64 = 5000;

/// Default viewport width.
pub const VIEWPORT_WIDTH: f64 = 1280.0;

/// Default viewport height.
pub const VIEWPORT_HEIGHT: f64 = 720.0;

/// Largest accepted rounding precision.
pub const MAX_PRECISION: u32 = 10;

/// Default polling interval as Duration.
#[must_use]
pub const fn poll_interval() -> Duration {
    Duration::from_millis(POLL_INTERVAL_MS)
}

/// Default throttle window as Duration.
#[must_use]
pub const fn throttle() -> Duration {
    Duration::from_millis(THROTTLE_MS)
}

/// Default replay duration as Duration.
#[must_use]
pub const fn duration() -> Duration {
    Duration::from_millis(DURATION_MS)
}
