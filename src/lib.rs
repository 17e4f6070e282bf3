//! Vismon: Surface Visibility Monitor
//!
//! A library for classifying how much of a rendered surface is visible
//! and notifying observers when that classification or the visible
//! fraction changes.

pub mod config;
pub mod handle;
pub mod monitor;
pub mod pubsub;
pub mod strategy;
pub mod target;
pub mod time;

#[cfg(test)]
mod test_fixtures;
