//! Error types for the strategy layer.

use thiserror::Error;

/// Error type for strategy lifecycle operations.
///
/// These are programming-contract violations: they indicate an incomplete
/// custom strategy and are never recovered from internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// A strategy did not override a required lifecycle operation.
    #[error("Strategy '{strategy}' must override '{operation}'")]
    NotOverridden {
        /// Name of the offending strategy
        strategy: &'static str,
        /// The lifecycle operation that was not overridden
        operation: &'static str,
    },
}

impl StrategyError {
    /// Creates a `NotOverridden` error.
    #[must_use]
    pub const fn not_overridden(strategy: &'static str, operation: &'static str) -> Self {
        Self::NotOverridden {
            strategy,
            operation,
        }
    }
}
