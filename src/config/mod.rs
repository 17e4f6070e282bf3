//! Configuration layer for the vismon binary.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Replay geometry ([`Rect`], [`Viewport`], [`ScrollStep`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! The surface rectangle, viewport and scroll timeline are TOML-only; the
//! surface has no default and must be present.
//!
//! # Boolean Flag Semantics
//!
//! - `--async-start` uses OR semantics: `true` in either CLI or TOML wins.
//! - `--no-polling` / `--no-events` only disable: once given, TOML cannot
//!   re-enable the strategy.

mod cli;
pub mod defaults;
mod error;
mod scenario;
mod toml;
mod validated;


pub use cli::{Cli, Command};
pub use error::{ConfigError, field};
pub use scenario::{Rect, ScrollStep, Viewport};
pub use toml::{TomlConfig, default_config_template};
pub use validated::{ValidatedConfig, write_default_config};
