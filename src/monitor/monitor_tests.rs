//! Tests for `Monitor` updates, the event cascade and the lifecycle.

use super::*;
use crate::strategy::{BaseStrategy, EventStrategy, PollingStrategy, Strategy, StrategyError};
use crate::target::HostSignal;
use crate::target::TargetOptions;
use crate::test_fixtures::{Dial, EventLog, Recording, counter, scripted_target};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

// ============================================================================
// Update and caching
// ============================================================================

mod update {
    use super::*;

    #[test]
    fn state_is_none_before_start() {
        let monitor = Dial::new(0.5).monitor();
        assert!(monitor.state().is_none());
    }

    #[test]
    fn update_is_ignored_while_stopped() {
        let monitor = Dial::new(0.5).monitor();
        let log = EventLog::attach(&monitor);

        monitor.update();

        assert!(monitor.state().is_none());
        assert!(log.topics().is_empty());
    }

    #[test]
    fn start_performs_first_update() {
        let monitor = Dial::new(0.5).monitor();
        monitor.start().unwrap();

        let state = monitor.state().unwrap();
        assert_eq!(state.code(), VisCode::Visible);
        assert!(state.previous().is_none());
    }

    #[test]
    fn stable_reading_reuses_state_reference() {
        let monitor = Dial::new(0.4).monitor();
        monitor.start().unwrap();
        monitor.update();
        let settled = monitor.state().unwrap();

        for _ in 0..3 {
            monitor.update();
            assert!(Rc::ptr_eq(&settled, &monitor.state().unwrap()));
        }
    }

    #[test]
    fn second_identical_reading_still_allocates() {
        let monitor = Dial::new(0.4).monitor();
        monitor.start().unwrap();
        let first = monitor.state().unwrap();

        monitor.update();
        let second = monitor.state().unwrap();

        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(second.previous().unwrap().percentage(), first.percentage());
    }

    #[test]
    fn changed_reading_chains_previous() {
        let dial = Dial::new(0.0);
        let monitor = dial.monitor();
        monitor.start().unwrap();

        dial.set(0.75);
        monitor.update();

        let state = monitor.state().unwrap();
        assert!(state.is_visible());
        assert!(state.previous().unwrap().is_hidden());
        assert!(state.previous().unwrap().previous().is_none());
    }

    #[test]
    fn update_publishes_even_when_state_is_reused() {
        let monitor = Dial::new(1.0).monitor();
        let (updates, _) = counter(&monitor, Topic::Update);
        monitor.start().unwrap();
        monitor.update();
        monitor.update();
        monitor.update();

        assert_eq!(updates.get(), 4);
    }

    #[test]
    fn custom_thresholds_drive_classification() {
        let target = Dial::new(0.95).target().with_options(TargetOptions {
            hidden: 0.1,
            fully_visible: 0.9,
            precision: 2,
        });
        let monitor = target.monitor(MonitorConfig::manual());
        monitor.start().unwrap();

        assert!(monitor.state().unwrap().is_fully_visible());
    }
}

// ============================================================================
// Cascade
// ============================================================================

mod cascade {
    use super::*;

    #[test]
    fn scripted_scenario_counts() {
        let monitor = scripted_target(&[0.0, 0.0, 0.6, 1.0, 1.0]).monitor(MonitorConfig::manual());
        let log = EventLog::attach(&monitor);

        monitor.start().unwrap();
        for _ in 0..4 {
            monitor.update();
        }

        assert_eq!(log.count(Topic::Hidden), 1);
        assert_eq!(log.count(Topic::VisibilityChange), 3);
        assert_eq!(log.count(Topic::Visible), 1);
        assert_eq!(log.count(Topic::FullyVisible), 1);
        assert_eq!(log.count(Topic::PercentageChange), 3);
        assert_eq!(log.count(Topic::Update), 5);
        assert_eq!(log.count(Topic::Start), 1);
    }

    #[test]
    fn first_update_event_order() {
        let monitor = Dial::new(0.0).monitor();
        let log = EventLog::attach(&monitor);

        monitor.start().unwrap();

        assert_eq!(
            log.topics(),
            vec![
                "percentagechange",
                "hidden",
                "visibilitychange",
                "update",
                "start"
            ]
        );
    }

    #[test]
    fn visible_is_not_fired_between_visible_and_fully_visible() {
        let dial = Dial::new(0.5);
        let monitor = dial.monitor();
        let (visible, _) = counter(&monitor, Topic::Visible);
        let (fully, _) = counter(&monitor, Topic::FullyVisible);
        monitor.start().unwrap();
        assert_eq!(visible.get(), 1);

        dial.set(1.0);
        monitor.update();
        dial.set(0.5);
        monitor.update();
        dial.set(1.0);
        monitor.update();

        assert_eq!(visible.get(), 1);
        assert_eq!(fully.get(), 2);
    }

    #[test]
    fn hidden_to_fully_visible_fires_visible_once() {
        let dial = Dial::new(0.0);
        let monitor = dial.monitor();
        let (visible, _) = counter(&monitor, Topic::Visible);
        monitor.start().unwrap();

        dial.set(1.0);
        monitor.update();
        monitor.update();

        assert_eq!(visible.get(), 1);
    }

    #[test]
    fn staying_fully_visible_does_not_refire() {
        let dial = Dial::new(0.9);
        let monitor = dial.monitor();
        let (fully, _) = counter(&monitor, Topic::FullyVisible);
        monitor.start().unwrap();

        dial.set(1.0);
        for _ in 0..5 {
            monitor.update();
        }

        assert_eq!(fully.get(), 1);
    }

    #[test]
    fn percentage_change_without_code_change() {
        let dial = Dial::new(0.3);
        let monitor = dial.monitor();
        monitor.start().unwrap();
        let log = EventLog::attach(&monitor);

        dial.set(0.6);
        monitor.update();

        assert_eq!(log.topics(), vec!["percentagechange", "update"]);
    }

    #[test]
    fn visibility_hook_forces_hidden() {
        let page_visible = Rc::new(Cell::new(true));
        let flag = Rc::clone(&page_visible);
        let target = Dial::new(1.0)
            .target()
            .with_visibility_hook(move || flag.get());
        let monitor = target.monitor(MonitorConfig::manual());
        let (hidden, _) = counter(&monitor, Topic::Hidden);
        monitor.start().unwrap();

        page_visible.set(false);
        monitor.update();

        assert_eq!(hidden.get(), 1);
        assert!(monitor.state().unwrap().percentage().abs() < f64::EPSILON);
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    #[test]
    fn start_is_idempotent() {
        let monitor = Dial::new(0.5).monitor();
        let log = EventLog::attach(&monitor);

        monitor.start().unwrap();
        monitor.start().unwrap();

        assert_eq!(log.count(Topic::Start), 1);
        assert_eq!(log.count(Topic::Update), 1);
    }

    #[test]
    fn stop_publishes_once() {
        let monitor = Dial::new(0.5).monitor();
        let log = EventLog::attach(&monitor);
        monitor.start().unwrap();

        assert!(monitor.stop().unwrap());
        assert!(!monitor.stop().unwrap());
        assert!(!monitor.is_started());
        assert_eq!(log.count(Topic::Stop), 1);
    }

    #[test]
    fn stop_on_fresh_monitor_is_noop() {
        let monitor = Dial::new(0.5).monitor();
        let log = EventLog::attach(&monitor);

        assert!(!monitor.stop().unwrap());
        assert!(log.topics().is_empty());
    }

    #[test]
    fn restart_keeps_history() {
        let dial = Dial::new(0.5);
        let monitor = dial.monitor();
        monitor.start().unwrap();
        monitor.stop().unwrap();

        dial.set(0.0);
        monitor.start().unwrap();

        let state = monitor.state().unwrap();
        assert!(state.is_hidden());
        assert!(state.previous().unwrap().is_visible());
    }

    #[test]
    fn strategy_is_started_after_first_update() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let monitor = Dial::new(0.5)
            .target()
            .monitor(MonitorConfig::default().with_strategy(Recording::new("rec", &journal)));
        let seen = Rc::clone(&journal);
        monitor.on(Topic::Update, move |_| seen.borrow_mut().push("update".to_string()));

        monitor.start().unwrap();
        monitor.stop().unwrap();

        assert_eq!(
            *journal.borrow(),
            vec!["rec:init", "update", "rec:start", "rec:stop"]
        );
    }

    #[test]
    fn base_strategy_fails_fast_and_leaves_monitor_stopped() {
        let monitor = Dial::new(0.5)
            .target()
            .monitor(MonitorConfig::default().with_strategy(BaseStrategy));

        let error = monitor.start().unwrap_err();

        assert_eq!(
            error,
            MonitorError::Strategy(StrategyError::not_overridden("base", "start"))
        );
        assert!(!monitor.is_started());
    }

    #[tokio::test]
    async fn failed_start_detaches_event_subscriptions() {
        LocalSet::new()
            .run_until(async {
                let events: Rc<dyn Strategy> =
                    Rc::new(EventStrategy::debounced(Duration::from_millis(50)));
                let monitor = Dial::new(0.5).target().monitor(
                    MonitorConfig::default()
                        .with_strategies([events, Rc::new(BaseStrategy) as Rc<dyn Strategy>]),
                );
                let window = monitor.target().reference_window().clone();

                assert!(monitor.start().is_err());
                assert!(!monitor.is_started());
                for signal in HostSignal::ALL {
                    assert_eq!(window.listener_count(signal), 0, "{signal}");
                }

                assert!(!monitor.stop().unwrap());
                assert_eq!(window.listener_count(HostSignal::Scroll), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn failed_start_cancels_polling_timer() {
        LocalSet::new()
            .run_until(async {
                let polling = Rc::new(PollingStrategy::new(Duration::from_millis(100)));
                let monitor = Dial::new(0.5).target().monitor(
                    MonitorConfig::default().with_strategies([
                        Rc::clone(&polling) as Rc<dyn Strategy>,
                        Rc::new(BaseStrategy),
                    ]),
                );

                assert!(monitor.start().is_err());

                assert!(!polling.is_started());
            })
            .await;
    }

    #[test]
    fn failed_start_stops_children_that_started() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let monitor = Dial::new(0.5).target().monitor(MonitorConfig::default().with_strategies([
            Rc::new(Recording::new("rec", &journal)) as Rc<dyn Strategy>,
            Rc::new(Recording::failing("broken", &journal)),
        ]));

        assert!(monitor.start().is_err());

        assert_eq!(
            *journal.borrow(),
            vec![
                "rec:init",
                "broken:init",
                "rec:start",
                "broken:start",
                "rec:stop",
                "broken:stop"
            ]
        );
    }

    #[test]
    fn handlers_from_config_are_bound() {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let (on_start, on_visible) = (Rc::clone(&fired), Rc::clone(&fired));
        let config = MonitorConfig::manual()
            .with_handler(Topic::Start, move |e| on_start.borrow_mut().push(e.topic.clone()))
            .with_handler(Topic::Visible, move |e| {
                on_visible.borrow_mut().push(e.topic.clone());
            });

        Dial::new(0.5).target().monitor(config).start().unwrap();

        assert_eq!(*fired.borrow(), vec!["visible", "start"]);
    }

    #[test]
    fn listener_may_stop_monitor_during_update() {
        let monitor = Dial::new(1.0).monitor();
        monitor.on(Topic::FullyVisible, |event| {
            event.monitor.stop().unwrap();
        });
        let log = EventLog::attach(&monitor);

        monitor.start().unwrap();

        assert!(!monitor.is_started());
        assert_eq!(log.count(Topic::Stop), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_async_then_stop_never_updates() {
        LocalSet::new()
            .run_until(async {
                let monitor = Dial::new(0.5).monitor();
                let (updates, _) = counter(&monitor, Topic::Update);

                let _cancel = monitor.start_async();
                monitor.stop().unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;

                assert_eq!(updates.get(), 0);
                assert!(!monitor.is_started());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_async_starts_on_later_turn() {
        LocalSet::new()
            .run_until(async {
                let monitor = Dial::new(0.5).monitor();

                monitor.start_with(StartOptions::deferred()).unwrap();
                assert!(!monitor.is_started());

                tokio::task::yield_now().await;
                tokio::time::sleep(Duration::from_millis(1)).await;
                assert!(monitor.is_started());
                assert!(monitor.state().is_some());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_pending_async_start() {
        LocalSet::new()
            .run_until(async {
                let monitor = Dial::new(0.5).monitor();
                let (starts, _) = counter(&monitor, Topic::Start);

                let first = monitor.start_async();
                let _second = monitor.start_async();
                assert!(first.is_spent());

                tokio::time::sleep(Duration::from_millis(1)).await;
                assert_eq!(starts.get(), 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_handle_drops_async_start() {
        LocalSet::new()
            .run_until(async {
                let monitor = Dial::new(0.5).monitor();

                let cancel = monitor.start_async();
                assert!(cancel.cancel());
                tokio::time::sleep(Duration::from_millis(1)).await;

                assert!(!monitor.is_started());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn sync_start_cancels_pending_async_start() {
        LocalSet::new()
            .run_until(async {
                let monitor = Dial::new(0.5).monitor();
                let (starts, _) = counter(&monitor, Topic::Start);

                let pending = monitor.start_async();
                monitor.start().unwrap();
                assert!(pending.is_spent());

                monitor.stop().unwrap();
                tokio::time::sleep(Duration::from_millis(1)).await;

                assert_eq!(starts.get(), 1);
                assert!(!monitor.is_started());
            })
            .await;
    }
}

// ============================================================================
// Bus
// ============================================================================

mod bus {
    use super::*;

    #[test]
    fn reserved_topics_cannot_be_published() {
        let monitor = Dial::new(0.5).monitor();

        for topic in Topic::ALL {
            let error = monitor.publish(topic.name(), json!(null)).unwrap_err();
            assert_eq!(error, MonitorError::ReservedTopic(topic.name().to_string()));
        }
    }

    #[test]
    fn custom_topic_carries_data() {
        let monitor = Dial::new(0.5).monitor();
        let received = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&received);
        monitor.on("impression", move |event| {
            *sink.borrow_mut() = Some(event.data.clone());
        });

        monitor.publish("impression", json!({"slot": 3})).unwrap();

        assert_eq!(*received.borrow(), Some(json!({"slot": 3})));
    }

    #[test]
    fn any_topic_is_unique_per_monitor() {
        let a = Dial::new(0.5).monitor();
        let b = Dial::new(0.5).monitor();

        assert_ne!(a.any_topic(), b.any_topic());
    }

    #[test]
    fn any_listener_sees_custom_topics() {
        let monitor = Dial::new(0.5).monitor();
        let log = EventLog::attach(&monitor);

        monitor.publish("custom", json!(1)).unwrap();

        assert_eq!(log.topics(), vec!["custom"]);
    }

    #[test]
    fn unregister_during_dispatch_keeps_siblings() {
        let monitor = Dial::new(0.5).monitor();
        let calls = Rc::new(RefCell::new(Vec::new()));

        let handle: Rc<RefCell<Option<crate::handle::Unregister>>> = Rc::new(RefCell::new(None));
        let (slot, first_calls) = (Rc::clone(&handle), Rc::clone(&calls));
        let unregister = monitor.on("ping", move |_| {
            first_calls.borrow_mut().push("first");
            if let Some(handle) = slot.borrow_mut().take() {
                handle.unregister();
            }
        });
        *handle.borrow_mut() = Some(unregister);

        let second_calls = Rc::clone(&calls);
        monitor.on("ping", move |_| second_calls.borrow_mut().push("second"));

        monitor.publish("ping", json!(null)).unwrap();
        monitor.publish("ping", json!(null)).unwrap();

        assert_eq!(*calls.borrow(), vec!["first", "second", "second"]);
    }

    #[test]
    fn event_references_publishing_monitor() {
        let monitor = Dial::new(0.5).monitor();
        let started = Rc::new(Cell::new(false));
        let sink = Rc::clone(&started);
        monitor.on(Topic::Start, move |event| sink.set(event.monitor.is_started()));

        monitor.start().unwrap();

        assert!(started.get());
    }

    #[tokio::test(start_paused = true)]
    async fn async_dispatch_defers_cascade() {
        LocalSet::new()
            .run_until(async {
                let monitor = Dial::new(1.0)
                    .target()
                    .monitor(MonitorConfig::manual().with_async_dispatch(true));
                let log = EventLog::attach(&monitor);

                monitor.start().unwrap();
                assert!(log.topics().is_empty());

                tokio::time::sleep(Duration::from_millis(1)).await;
                assert_eq!(log.count(Topic::Update), 1);
                assert_eq!(log.count(Topic::FullyVisible), 1);
                assert_eq!(log.count(Topic::Start), 1);
            })
            .await;
    }
}
