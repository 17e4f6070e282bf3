//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::target::{DEFAULT_FULLY_VISIBLE, DEFAULT_HIDDEN, DEFAULT_PRECISION, TargetOptions};

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::scenario::{Rect, ScrollStep, Viewport};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// This struct represents a complete, validated configuration where all
/// required fields are present and all values have been validated.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct ValidatedConfig {
    /// Classification thresholds and rounding
    pub target: TargetOptions,

    /// Polling interval
    pub poll_interval: Duration,

    /// Host-signal throttle window
    pub throttle: Duration,

    /// Whether the polling strategy is enabled
    pub polling: bool,

    /// Whether the host-signal strategy is enabled
    pub events: bool,

    /// Start the monitor on a later turn of the event loop
    pub async_start: bool,

    /// Deliver events on a later turn of the event loop
    pub async_dispatch: bool,

    /// Total replay duration
    pub duration: Duration,

    /// The watched surface (required)
    pub surface: Rect,

    /// Viewport size
    pub viewport: Viewport,

    /// Scroll steps, sorted by time
    pub timeline: Vec<ScrollStep>,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ surface: {}, viewport: {}x{}, hidden: {}, fully_visible: {}, \
             precision: {}, polling: {} ({}ms), events: {} ({}ms), async_start: {}, \
             async_dispatch: {}, duration: {}ms, scroll_steps: {} }}",
            self.surface,
            self.viewport.width,
            self.viewport.height,
            self.target.hidden,
            self.target.fully_visible,
            self.target.precision,
            self.polling,
            self.poll_interval.as_millis(),
            self.events,
            self.throttle.as_millis(),
            self.async_start,
            self.async_dispatch,
            self.duration.as_millis(),
            self.timeline.len(),
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The surface is missing or has no area
    /// - Thresholds are outside `[0, 1]` or not ordered
    /// - Precision exceeds the maximum
    /// - Duration values are zero
    /// - A scroll step lies beyond the replay duration
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let target = Self::resolve_target(cli, toml)?;

        let poll_interval = resolve_millis(
            "poll_interval",
            cli.poll_interval,
            toml.and_then(|t| t.monitor.poll_interval),
            defaults::POLL_INTERVAL_MS,
        )?;
        let throttle = resolve_millis(
            "throttle",
            cli.throttle,
            toml.and_then(|t| t.monitor.throttle),
            defaults::THROTTLE_MS,
        )?;
        let duration = resolve_millis(
            "duration",
            cli.duration,
            toml.and_then(|t| t.monitor.duration),
            defaults::DURATION_MS,
        )?;

        // Disabling flags win over TOML
        let polling = !cli.no_polling && toml.and_then(|t| t.monitor.polling).unwrap_or(true);
        let events = !cli.no_events && toml.and_then(|t| t.monitor.events).unwrap_or(true);

        // Enabling flags use OR semantics
        let async_start = cli.async_start || toml.is_some_and(|t| t.monitor.async_start);
        let async_dispatch = toml.is_some_and(|t| t.monitor.async_dispatch);

        let surface = Self::resolve_surface(toml)?;
        let viewport = Self::resolve_viewport(toml)?;
        let timeline = Self::build_timeline(toml, duration)?;

        Ok(Self {
            target,
            poll_interval,
            throttle,
            polling,
            events,
            async_start,
            async_dispatch,
            duration,
            surface,
            viewport,
            timeline,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_target(cli: &Cli, toml: Option<&TomlConfig>) -> Result<TargetOptions, ConfigError> {
        let section = toml.map(|t| &t.target);

        // Priority: CLI explicit > TOML > default
        let hidden = cli
            .hidden
            .or_else(|| section.and_then(|s| s.hidden))
            .unwrap_or(DEFAULT_HIDDEN);
        let fully_visible = cli
            .fully_visible
            .or_else(|| section.and_then(|s| s.fully_visible))
            .unwrap_or(DEFAULT_FULLY_VISIBLE);
        let precision = cli
            .precision
            .or_else(|| section.and_then(|s| s.precision))
            .unwrap_or(DEFAULT_PRECISION);

        validate_fraction("hidden", hidden)?;
        validate_fraction("fully_visible", fully_visible)?;

        if hidden >= fully_visible {
            return Err(ConfigError::InvalidThreshold {
                field: "hidden",
                value: hidden,
                reason: format!("must be less than fully_visible ({fully_visible})"),
            });
        }

        if precision > defaults::MAX_PRECISION {
            return Err(ConfigError::InvalidPrecision {
                value: precision,
                max: defaults::MAX_PRECISION,
            });
        }

        Ok(TargetOptions {
            hidden,
            fully_visible,
            precision,
        })
    }

    fn resolve_surface(toml: Option<&TomlConfig>) -> Result<Rect, ConfigError> {
        let section = toml.and_then(|t| t.surface.as_ref()).ok_or_else(|| {
            ConfigError::missing(
                field::SURFACE,
                "Add a [surface] section with width and height to the config file",
            )
        })?;

        for (name, value) in [("surface.x", section.x), ("surface.y", section.y)] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidGeometry {
                    field: name,
                    reason: "must be a finite number".to_string(),
                });
            }
        }
        validate_extent("surface.width", section.width)?;
        validate_extent("surface.height", section.height)?;

        Ok(Rect::new(section.x, section.y, section.width, section.height))
    }

    fn resolve_viewport(toml: Option<&TomlConfig>) -> Result<Viewport, ConfigError> {
        let section = toml.map(|t| &t.viewport);

        let width = section
            .and_then(|s| s.width)
            .unwrap_or(defaults::VIEWPORT_WIDTH);
        let height = section
            .and_then(|s| s.height)
            .unwrap_or(defaults::VIEWPORT_HEIGHT);

        validate_extent("viewport.width", width)?;
        validate_extent("viewport.height", height)?;

        Ok(Viewport { width, height })
    }

    fn build_timeline(
        toml: Option<&TomlConfig>,
        duration: Duration,
    ) -> Result<Vec<ScrollStep>, ConfigError> {
        let Some(toml) = toml else {
            return Ok(Vec::new());
        };

        let mut timeline = Vec::with_capacity(toml.scroll.len());
        for step in &toml.scroll {
            let at = Duration::from_millis(step.at);
            if at > duration {
                return Err(ConfigError::InvalidTimeline(format!(
                    "step at {}ms is beyond the run duration ({}ms)",
                    step.at,
                    duration.as_millis()
                )));
            }
            if !step.x.is_finite() || !step.y.is_finite() {
                return Err(ConfigError::InvalidTimeline(format!(
                    "step at {}ms has a non-finite scroll offset",
                    step.at
                )));
            }
            timeline.push(ScrollStep {
                at,
                x: step.x,
                y: step.y,
            });
        }

        // Stable: steps sharing a time keep file order
        timeline.sort_by_key(|step| step.at);
        Ok(timeline)
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn resolve_millis(
    field: &'static str,
    cli: Option<u64>,
    toml: Option<u64>,
    default: u64,
) -> Result<Duration, ConfigError> {
    // Priority: CLI explicit > TOML > default
    let millis = cli.or(toml).unwrap_or(default);

    if millis == 0 {
        return Err(ConfigError::InvalidDuration {
            field,
            reason: "must be greater than 0".to_string(),
        });
    }

    Ok(Duration::from_millis(millis))
}

fn validate_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        return Ok(());
    }

    Err(ConfigError::InvalidThreshold {
        field,
        value,
        reason: "must be within [0, 1]".to_string(),
    })
}

fn validate_extent(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }

    Err(ConfigError::InvalidGeometry {
        field,
        reason: format!("must be a positive finite number, got {value}"),
    })
}
