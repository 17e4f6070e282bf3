//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Classification thresholds
    #[serde(default)]
    pub target: TargetSection,

    /// Monitoring configuration
    #[serde(default)]
    pub monitor: MonitorSection,

    /// The watched surface rectangle
    pub surface: Option<SurfaceSection>,

    /// Viewport size
    #[serde(default)]
    pub viewport: ViewportSection,

    /// Scroll positions to replay, as `[[scroll]]` tables
    #[serde(default)]
    pub scroll: Vec<ScrollSection>,
}

/// Classification threshold section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    /// Fraction at or below which the surface counts as hidden
    pub hidden: Option<f64>,

    /// Fraction at or above which the surface counts as fully visible
    pub fully_visible: Option<f64>,

    /// Decimal places visible fractions are rounded to
    pub precision: Option<u32>,
}

/// Monitoring configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Polling interval in milliseconds
    pub poll_interval: Option<u64>,

    /// Host-signal throttle window in milliseconds
    pub throttle: Option<u64>,

    /// Enable the polling strategy (default: true)
    pub polling: Option<bool>,

    /// Enable the host-signal strategy (default: true)
    pub events: Option<bool>,

    /// Start the monitor on a later turn of the event loop
    #[serde(default)]
    pub async_start: bool,

    /// Deliver events on a later turn of the event loop
    #[serde(default)]
    pub async_dispatch: bool,

    /// Total replay duration in milliseconds
    pub duration: Option<u64>,
}

/// Surface rectangle section, in page coordinates.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceSection {
    /// Left edge
    #[serde(default)]
    pub x: f64,

    /// Top edge
    #[serde(default)]
    pub y: f64,

    /// Width
    pub width: f64,

    /// Height
    pub height: f64,
}

/// Viewport size section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewportSection {
    /// Viewport width
    pub width: Option<f64>,

    /// Viewport height
    pub height: Option<f64>,
}

/// One scroll step of the replay timeline.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollSection {
    /// Offset from the start of the replay in milliseconds
    pub at: u64,

    /// Horizontal scroll offset
    #[serde(default)]
    pub x: f64,

    /// Vertical scroll offset
    #[serde(default)]
    pub y: f64,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# Vismon Configuration File

[target]
# Fraction at or below which the surface counts as hidden (default: 0.0)
# hidden = 0.0

# Fraction at or above which the surface counts as fully visible (default: 1.0)
# fully_visible = 1.0

# Decimal places visible fractions are rounded to (default: 3, max: 10)
# precision = 3

[monitor]
# Polling interval in milliseconds (default: 1000)
poll_interval = 1000

# Host-signal throttle window in milliseconds (default: 50)
throttle = 50

# Enable or disable the individual strategies (default: both enabled)
# When both are disabled, the replay drives updates itself after each scroll.
# polling = true
# events = true

# Start the monitor on a later turn of the event loop
# async_start = false

# Deliver events on a later turn of the event loop
# async_dispatch = false

# Total replay duration in milliseconds (default: 5000)
duration = 3000

# The watched surface, in page coordinates (required)
[surface]
x = 0
y = 900
width = 400
height = 300

# Viewport size (default: 1280 x 720)
[viewport]
width = 1280
height = 720

# Scroll timeline: each step scrolls the viewport at `at` milliseconds
[[scroll]]
at = 500
y = 400

[[scroll]]
at = 1000
y = 900

[[scroll]]
at = 2000
y = 0
"#
    .to_string()
}
