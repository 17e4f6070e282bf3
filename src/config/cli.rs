//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Vismon: Surface Visibility Monitor
///
/// Replays a scripted scroll timeline against a surface and prints every
/// visibility event as a JSON line.
#[derive(Debug, Parser)]
#[command(name = "vismon")]
#[command(version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are naturally boolean
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Polling interval in milliseconds
    #[arg(long = "poll-interval", value_name = "MS")]
    pub poll_interval: Option<u64>,

    /// Host-signal throttle window in milliseconds
    #[arg(long, value_name = "MS")]
    pub throttle: Option<u64>,

    /// Fraction at or below which the surface counts as hidden
    #[arg(long)]
    pub hidden: Option<f64>,

    /// Fraction at or above which the surface counts as fully visible
    #[arg(long = "fully-visible")]
    pub fully_visible: Option<f64>,

    /// Decimal places visible fractions are rounded to
    #[arg(long)]
    pub precision: Option<u32>,

    /// Disable the polling strategy
    #[arg(long = "no-polling")]
    pub no_polling: bool,

    /// Disable the host-signal strategy
    #[arg(long = "no-events")]
    pub no_events: bool,

    /// Start the monitor on a later turn of the event loop
    #[arg(long = "async-start")]
    pub async_start: bool,

    /// Total replay duration in milliseconds
    #[arg(long, value_name = "MS")]
    pub duration: Option<u64>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Subcommands for vismon
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "vismon.toml")]
        output: PathBuf,
    },
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }
}
