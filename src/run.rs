//! Application execution logic.
//!
//! This module replays the configured scroll timeline against the surface,
//! drives a monitor assembled from the configured strategies, and prints
//! every monitor event as one JSON line on stdout.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::signal;
use tokio::time::{Instant, sleep_until};

use vismon::config::{Rect, ScrollStep, ValidatedConfig, Viewport};
use vismon::monitor::{
    Event, Monitor, MonitorBuilder, MonitorError, Setting, StartOptions, StrategySetting, VisState,
};
use vismon::strategy::{EventStrategy, PollingStrategy};
use vismon::target::{HostSignal, HostWindow, Target};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// The monitor failed to start.
    #[error("Failed to start monitor: {0}")]
    Start(#[source] MonitorError),

    /// The monitor failed to stop.
    #[error("Failed to stop monitor: {0}")]
    Stop(#[source] MonitorError),
}

// ============================================================================
// Scenario
// ============================================================================

/// The replayed page: a fixed surface seen through a scrolling viewport.
struct Scenario {
    surface: Rect,
    viewport: Viewport,
    scroll: Rc<Cell<(f64, f64)>>,
    window: HostWindow,
}

impl Scenario {
    fn new(surface: Rect, viewport: Viewport) -> Self {
        Self {
            surface,
            viewport,
            scroll: Rc::new(Cell::new((0.0, 0.0))),
            window: HostWindow::new(),
        }
    }

    /// Returns a target whose oracle measures the surface against the
    /// viewport at the current scroll position.
    fn target(&self, config: &ValidatedConfig) -> Target {
        let (surface, viewport) = (self.surface, self.viewport);
        let scroll = Rc::clone(&self.scroll);

        Target::new(move |_: &HostWindow| {
            let (x, y) = scroll.get();
            surface.visible_fraction(&viewport.at(x, y))
        })
        .with_window(self.window.clone())
        .with_options(config.target)
    }

    /// Moves the viewport and notifies the host window.
    fn scroll_to(&self, step: &ScrollStep) {
        self.scroll.set((step.x, step.y));
        tracing::debug!(x = step.x, y = step.y, "scroll");
        self.window.emit(HostSignal::Scroll);
    }
}

// ============================================================================
// Reporting
// ============================================================================

/// One printed event.
#[derive(Debug, Serialize)]
struct EventLine<'a> {
    elapsed_ms: u128,
    topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a VisState>,
    #[serde(skip_serializing_if = "Value::is_null")]
    data: &'a Value,
}

/// Per-topic event counts collected during a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    counts: BTreeMap<String, usize>,
}

impl Summary {
    fn record(&mut self, topic: &str) {
        *self.counts.entry(topic.to_string()).or_default() += 1;
    }

    /// Returns how often `topic` was published.
    #[must_use]
    pub fn count(&self, topic: impl AsRef<str>) -> usize {
        self.counts.get(topic.as_ref()).copied().unwrap_or_default()
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self
            .counts
            .iter()
            .map(|(topic, count)| format!("{topic}={count}"))
            .collect();
        write!(f, "{} event(s): {}", self.total(), parts.join(", "))
    }
}

/// Formats `event` as a JSON line.
fn format_event(event: &Event, elapsed: Duration) -> String {
    let state = event.monitor.state();
    let line = EventLine {
        elapsed_ms: elapsed.as_millis(),
        topic: &event.topic,
        state: state.as_deref(),
        data: &event.data,
    };

    serde_json::to_string(&line).unwrap_or_else(|e| {
        tracing::warn!("Failed to serialize event: {e}");
        String::new()
    })
}

/// Counts every event on `monitor` and passes its JSON line to `output`.
fn attach_reporter(
    monitor: &Monitor,
    origin: Instant,
    output: impl Fn(&str) + 'static,
) -> Rc<RefCell<Summary>> {
    let summary = Rc::new(RefCell::new(Summary::default()));
    let sink = Rc::clone(&summary);

    monitor.on_any(move |event| {
        sink.borrow_mut().record(&event.topic);
        let line = format_event(event, origin.elapsed());
        if !line.is_empty() {
            output(&line);
        }
    });

    summary
}

// ============================================================================
// Execution
// ============================================================================

/// Assembles the monitor described by `config`.
///
/// With both strategies disabled the monitor is manual and the replay
/// updates it after each scroll step.
fn build_monitor(config: &ValidatedConfig, target: Target) -> Monitor {
    let mut builder =
        MonitorBuilder::new(target).set(Setting::AsyncDispatch(config.async_dispatch));

    if config.polling {
        builder = builder.strategy(PollingStrategy::new(config.poll_interval));
    }
    if config.events {
        builder = builder.strategy(EventStrategy::new(config.throttle));
    }
    if !config.polling && !config.events {
        builder = builder.set(Setting::Strategy(StrategySetting::Disabled));
    }

    builder.build()
}

/// Plays `timeline` against `scenario`, then waits out the run `duration`.
async fn replay(
    scenario: &Scenario,
    monitor: &Monitor,
    timeline: &[ScrollStep],
    duration: Duration,
    manual: bool,
) {
    let origin = Instant::now();

    for step in timeline {
        sleep_until(origin + step.at).await;
        scenario.scroll_to(step);
        if manual {
            monitor.update();
        }
    }

    sleep_until(origin + duration).await;
}

/// Executes the scenario replay.
///
/// This function:
/// 1. Builds the geometry oracle and the monitor
/// 2. Attaches the JSON line reporter
/// 3. Starts the monitor (optionally deferred)
/// 4. Replays the scroll timeline until the run ends or a shutdown signal arrives
/// 5. Stops the monitor and logs a per-topic summary
///
/// Must run inside a [`tokio::task::LocalSet`].
///
/// # Errors
///
/// Returns an error if the monitor's strategy fails to start or stop.
pub async fn execute(config: ValidatedConfig) -> Result<Summary, RunError> {
    let scenario = Scenario::new(config.surface, config.viewport);
    let monitor = build_monitor(&config, scenario.target(&config));
    let summary = attach_reporter(&monitor, Instant::now(), |line| println!("{line}"));

    let manual = !config.polling && !config.events;
    run_monitor(&scenario, &monitor, &config, manual, shutdown_signal()).await?;

    let summary = summary.borrow().clone();
    tracing::info!("Replay finished: {summary}");
    Ok(summary)
}

/// Starts `monitor`, replays the timeline until it ends or `shutdown`
/// completes, then stops the monitor.
async fn run_monitor(
    scenario: &Scenario,
    monitor: &Monitor,
    config: &ValidatedConfig,
    manual: bool,
    shutdown: impl Future<Output = ()>,
) -> Result<(), RunError> {
    monitor
        .start_with(StartOptions {
            async_start: config.async_start,
        })
        .map_err(RunError::Start)?;
    tracing::info!(
        "Monitoring {} in a {}x{} viewport",
        config.surface,
        config.viewport.width,
        config.viewport.height
    );

    tokio::pin!(shutdown);
    tokio::select! {
        biased;

        () = &mut shutdown => {
            tracing::info!("Shutdown signal received, stopping...");
        }

        () = replay(scenario, monitor, &config.timeline, config.duration, manual) => {
            tracing::debug!("Timeline complete");
        }
    }

    monitor.stop().map_err(RunError::Stop)?;
    Ok(())
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
