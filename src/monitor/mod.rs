//! Visibility monitoring engine.
//!
//! This module provides types and functions for:
//! - Representing classification snapshots ([`VisState`], [`VisCode`])
//! - Naming the reserved bus topics ([`Topic`])
//! - Driving updates and the derived-event cascade ([`Monitor`], [`Event`])
//! - Configuring and assembling monitors ([`MonitorConfig`], [`MonitorBuilder`])
//! - Error handling ([`MonitorError`])

mod builder;
mod config;
mod error;
#[allow(clippy::module_inception)]
mod monitor;
mod state;
mod topic;

#[cfg(test)]
mod monitor_tests;

pub use builder::{MonitorBuilder, Setting};
pub use config::{Handler, MonitorConfig, StartOptions, StrategySetting};
pub use error::MonitorError;
pub use monitor::{Event, Monitor, WeakMonitor};
pub use state::{VisCode, VisState};
pub use topic::{Topic, UnknownTopic};
