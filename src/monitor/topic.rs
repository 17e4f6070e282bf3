//! Reserved monitor topics and the derived-event cascade.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::state::VisState;

/// Topics published by the monitor itself.
///
/// These names are reserved: callers may listen to them but not publish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The monitor started.
    Start,
    /// The monitor stopped.
    Stop,
    /// A new state was computed.
    Update,
    /// The surface became hidden.
    Hidden,
    /// The surface became visible coming from hidden.
    Visible,
    /// The surface became fully visible.
    FullyVisible,
    /// The visible fraction changed.
    PercentageChange,
    /// The classification changed.
    VisibilityChange,
}

impl Topic {
    /// Every reserved topic.
    pub const ALL: [Self; 8] = [
        Self::Start,
        Self::Stop,
        Self::Update,
        Self::Hidden,
        Self::Visible,
        Self::FullyVisible,
        Self::PercentageChange,
        Self::VisibilityChange,
    ];

    /// Returns the topic name on the bus.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Update => "update",
            Self::Hidden => "hidden",
            Self::Visible => "visible",
            Self::FullyVisible => "fullyvisible",
            Self::PercentageChange => "percentagechange",
            Self::VisibilityChange => "visibilitychange",
        }
    }

    /// Returns true if `name` is one of the reserved topic names.
    #[must_use]
    pub fn is_reserved(name: &str) -> bool {
        name.parse::<Self>().is_ok()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

/// Error returned when parsing an unknown topic name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown topic '{0}'")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.name() == s)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

// ============================================================================
// Cascade
// ============================================================================

/// One derived-event rule: when `source` is published and `fires` holds for
/// the current state and its predecessor, `derived` is published.
#[derive(Clone, Copy)]
pub(crate) struct CascadeRule {
    pub source: Topic,
    pub derived: Topic,
    pub fires: fn(&VisState, Option<&VisState>) -> bool,
}

/// The cascade, in registration order.
///
/// `Visible`, `FullyVisible` and `Hidden` hang off `VisibilityChange`, not
/// `Update`, which makes them edge-triggered: staying in one classification
/// never fires them again.
pub(crate) const CASCADE: [CascadeRule; 5] = [
    CascadeRule {
        source: Topic::Update,
        derived: Topic::PercentageChange,
        fires: percentage_changed,
    },
    CascadeRule {
        source: Topic::Update,
        derived: Topic::VisibilityChange,
        fires: code_changed,
    },
    CascadeRule {
        source: Topic::VisibilityChange,
        derived: Topic::Visible,
        fires: became_visible,
    },
    CascadeRule {
        source: Topic::VisibilityChange,
        derived: Topic::FullyVisible,
        fires: is_fully_visible,
    },
    CascadeRule {
        source: Topic::VisibilityChange,
        derived: Topic::Hidden,
        fires: is_hidden,
    },
];

// A missing predecessor compares unequal to everything.
#[allow(clippy::float_cmp)]
fn percentage_changed(state: &VisState, previous: Option<&VisState>) -> bool {
    previous.is_none_or(|previous| previous.percentage() != state.percentage())
}

fn code_changed(state: &VisState, previous: Option<&VisState>) -> bool {
    previous.is_none_or(|previous| previous.code() != state.code())
}

fn became_visible(state: &VisState, previous: Option<&VisState>) -> bool {
    state.is_visible() && !previous.is_some_and(VisState::is_visible)
}

fn is_fully_visible(state: &VisState, _previous: Option<&VisState>) -> bool {
    state.is_fully_visible()
}

fn is_hidden(state: &VisState, _previous: Option<&VisState>) -> bool {
    state.is_hidden()
}
