//! Error types for the monitor layer.

use thiserror::Error;

use crate::strategy::StrategyError;

/// Error type for monitor operations.
///
/// Both variants are programming-contract violations: callers are expected to
/// fix the call site rather than retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// A caller tried to publish one of the monitor's own topics.
    ///
    /// Reserved topics are published exclusively by the monitor's cascade.
    #[error("Topic '{0}' is reserved and cannot be published externally")]
    ReservedTopic(String),

    /// The active strategy failed to start or stop.
    #[error("Strategy failed: {0}")]
    Strategy(#[from] StrategyError),
}
