//! Immutable visibility snapshots.

use std::fmt;

use serde::Serialize;

use crate::target::TargetOptions;

/// Visibility classification of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisCode {
    /// At or below the hidden threshold.
    Hidden = 0,
    /// Between the hidden and fully-visible thresholds.
    Visible = 1,
    /// At or above the fully-visible threshold.
    FullyVisible = 2,
}

impl VisCode {
    /// Returns the numeric code (`0`, `1` or `2`).
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Returns the display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Visible => "visible",
            Self::FullyVisible => "fullyvisible",
        }
    }
}

impl fmt::Display for VisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One classification result.
///
/// A `VisState` is never mutated after construction. It links to at most one
/// prior snapshot, whose own link has been removed, so history depth is
/// bounded to a single generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisState {
    code: VisCode,
    percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous: Option<Box<VisState>>,
}

impl VisState {
    /// Classifies an already rounded `percentage` against `options`.
    ///
    /// - `percentage <= hidden` → [`VisCode::Hidden`]
    /// - `percentage >= fully_visible` → [`VisCode::FullyVisible`]
    /// - otherwise → [`VisCode::Visible`]
    #[must_use]
    pub fn classify(percentage: f64, options: &TargetOptions) -> Self {
        let code = if percentage <= options.hidden {
            VisCode::Hidden
        } else if percentage >= options.fully_visible {
            VisCode::FullyVisible
        } else {
            VisCode::Visible
        };

        Self {
            code,
            percentage,
            previous: None,
        }
    }

    /// Creates a hidden state with a percentage of `0`.
    #[must_use]
    pub const fn hidden() -> Self {
        Self {
            code: VisCode::Hidden,
            percentage: 0.0,
            previous: None,
        }
    }

    /// Returns this state chained to `previous`.
    ///
    /// Only `previous` itself is kept; its own link is dropped.
    #[must_use]
    pub fn with_previous(mut self, previous: &Self) -> Self {
        self.previous = Some(Box::new(previous.detached()));
        self
    }

    /// Returns a copy of this state without its `previous` link.
    #[must_use]
    pub const fn detached(&self) -> Self {
        Self {
            code: self.code,
            percentage: self.percentage,
            previous: None,
        }
    }

    /// Returns the classification.
    #[must_use]
    pub const fn code(&self) -> VisCode {
        self.code
    }

    /// Returns the display label of the classification.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.code.label()
    }

    /// Returns the visible fraction in `[0, 1]`.
    #[must_use]
    pub const fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Returns true if the surface is hidden.
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        matches!(self.code, VisCode::Hidden)
    }

    /// Returns true if the surface is visible or fully visible.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        matches!(self.code, VisCode::Visible | VisCode::FullyVisible)
    }

    /// Returns true if the surface is fully visible.
    #[must_use]
    pub const fn is_fully_visible(&self) -> bool {
        matches!(self.code, VisCode::FullyVisible)
    }

    /// Returns the prior snapshot, if any.
    #[must_use]
    pub fn previous(&self) -> Option<&Self> {
        self.previous.as_deref()
    }

    /// Returns true if a reading of `percentage` would change nothing
    /// observable: both this state and its predecessor already hold it.
    // Percentages are rounded to a fixed precision before they get here.
    #[allow(clippy::float_cmp)]
    #[must_use]
    pub fn is_settled_at(&self, percentage: f64) -> bool {
        self.percentage == percentage
            && self
                .previous
                .as_ref()
                .is_some_and(|previous| previous.percentage == percentage)
    }
}

impl fmt::Display for VisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}%)", self.code, self.percentage * 100.0)
    }
}
