//! Delivery guarantees of a monitor run: ordering, filtering, routing,
//! single terminal result and the startup barrier.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eventmon_core::{Event, MonitorError, SubscriptionOptions};
use eventmon_monitor::{
    ActionIs, EventHandler, FnHandler, HandlerRegistry, KindKey, Monitor, MonitorConfig,
};
use eventmon_test::{
    EventRecorder, MockEventSource, container_event, init_test_logging, kind_event,
    malformed_raw_event, test_event,
};
use tokio_util::sync::CancellationToken;

use common::{finish, no_filter, settle, shared};

#[tokio::test]
async fn test_events_arrive_in_feed_order() {
    init_test_logging();
    let source = MockEventSource::new().with_events((1..=200).map(test_event));
    let recorder = EventRecorder::new();

    let run = Monitor::subscribe_all(
        shared(&source),
        SubscriptionOptions::new(),
        no_filter(),
        recorder.callback(),
        CancellationToken::new(),
    )
    .await;

    assert!(finish(run).await.is_ok());
    assert_eq!(recorder.seqs(), (1..=200).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_filter_selects_exactly_the_matching_subsequence() {
    init_test_logging();
    let actions = ["start", "die", "start", "oom", "die", "start"];
    let events: Vec<Event> = actions
        .iter()
        .enumerate()
        .map(|(i, a)| container_event(a, &format!("c{i}")))
        .collect();

    let source = MockEventSource::new().with_events(events.clone());
    let filtered = EventRecorder::new();
    let run = Monitor::subscribe_all(
        shared(&source),
        SubscriptionOptions::new(),
        Some(ActionIs("die".into())),
        filtered.callback(),
        CancellationToken::new(),
    )
    .await;
    assert!(finish(run).await.is_ok());

    let expected: Vec<Event> = events
        .iter()
        .filter(|e| e.action() == "die")
        .cloned()
        .collect();
    assert_eq!(filtered.events(), expected);

    // Without a filter every event is delivered.
    let everything = EventRecorder::new();
    let run = Monitor::subscribe_all(
        shared(&source),
        SubscriptionOptions::new(),
        no_filter(),
        everything.callback(),
        CancellationToken::new(),
    )
    .await;
    assert!(finish(run).await.is_ok());
    assert_eq!(everything.events(), events);
}

#[tokio::test]
async fn test_routing_keys_never_cross() {
    init_test_logging();
    let source = MockEventSource::new().with_events([
        kind_event("container", "start"),
        kind_event("image", "pull"),
        kind_event("network", "connect"),
        kind_event("container", "die"),
        kind_event("image", "delete"),
    ]);

    let monitor = Monitor::builder(shared(&source))
        .key_extractor(KindKey)
        .build();
    let containers = EventRecorder::new();
    let images = EventRecorder::new();
    monitor.register("container", no_filter(), containers.callback());
    monitor.register("image", no_filter(), images.callback());

    let run = monitor
        .start(SubscriptionOptions::new(), CancellationToken::new())
        .await;
    assert!(finish(run).await.is_ok());

    assert_eq!(containers.actions(), vec!["start", "die"]);
    assert_eq!(images.actions(), vec!["pull", "delete"]);
    assert!(containers.events().iter().all(|e| e.kind() == "container"));
    assert!(images.events().iter().all(|e| e.kind() == "image"));
}

#[tokio::test]
async fn test_each_run_reports_exactly_once() {
    init_test_logging();

    // Cancelled.
    let source = MockEventSource::new().keep_open();
    let cancel = CancellationToken::new();
    let mut run = Monitor::new(shared(&source))
        .start(SubscriptionOptions::new(), cancel.clone())
        .await;
    assert!(run.try_result().is_none());
    cancel.cancel();
    assert!(settle(&mut run).await.is_ok());
    assert!(run.try_result().is_none());

    // Initial error.
    let source = MockEventSource::new().with_initial_error("bad filter syntax");
    let mut run = Monitor::new(shared(&source))
        .start(SubscriptionOptions::new(), CancellationToken::new())
        .await;
    assert!(settle(&mut run).await.unwrap_err().is_subscription());
    assert!(run.try_result().is_none());

    // Decode error, with a cancellation racing in afterwards.
    let source = MockEventSource::new()
        .with_raw_events([malformed_raw_event()])
        .keep_open();
    let cancel = CancellationToken::new();
    let mut run = Monitor::new(shared(&source))
        .start(SubscriptionOptions::new(), cancel.clone())
        .await;
    let result = settle(&mut run).await;
    cancel.cancel();
    assert!(result.unwrap_err().is_decode());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(run.try_result().is_none());
}

#[tokio::test]
async fn test_start_waits_for_the_subscribe_attempt() {
    init_test_logging();
    let (source, gate) = MockEventSource::new().keep_open().with_open_gate();
    let monitor = Monitor::new(shared(&source));

    let starting = tokio::spawn(async move {
        monitor
            .start(SubscriptionOptions::new(), CancellationToken::new())
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!starting.is_finished(), "start returned before open completed");

    gate.release();
    let mut run = tokio::time::timeout(Duration::from_secs(5), starting)
        .await
        .unwrap()
        .unwrap();

    // Returned without waiting for an event; the feed is still open.
    assert_eq!(source.open_count(), 1);
    assert!(run.try_result().is_none());
}

#[tokio::test]
async fn test_start_returns_before_late_confirmation() {
    init_test_logging();
    let (source, confirm) = MockEventSource::new()
        .with_events((1..=2).map(test_event))
        .with_pending_confirmation();
    let recorder = EventRecorder::new();

    let mut run = Monitor::subscribe_all(
        shared(&source),
        SubscriptionOptions::new(),
        no_filter(),
        recorder.callback(),
        CancellationToken::new(),
    )
    .await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(run.try_result().is_none());
    assert!(recorder.is_empty(), "events delivered before confirmation");

    assert!(confirm.confirm());
    assert!(settle(&mut run).await.is_ok());
    assert_eq!(recorder.seqs(), vec![1, 2]);
}

#[tokio::test]
async fn test_late_subscription_failure() {
    init_test_logging();
    let (source, confirm) = MockEventSource::new()
        .with_events((1..=2).map(test_event))
        .with_pending_confirmation();
    let recorder = EventRecorder::new();

    let run = Monitor::subscribe_all(
        shared(&source),
        SubscriptionOptions::new(),
        no_filter(),
        recorder.callback(),
        CancellationToken::new(),
    )
    .await;

    assert!(confirm.fail("unauthorized"));
    let err = finish(run).await.unwrap_err();
    assert_eq!(err.to_string(), "subscription failed: unauthorized");
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_cancel_before_subscription_is_placed() {
    init_test_logging();
    let (source, _gate) = MockEventSource::new().keep_open().with_open_gate();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let run = Monitor::new(shared(&source))
        .start(SubscriptionOptions::new(), cancel)
        .await;
    assert!(finish(run).await.is_ok());
}

#[tokio::test]
async fn test_panicking_handler_does_not_stop_delivery() {
    init_test_logging();
    let source = MockEventSource::new().with_events((1..=3).map(test_event));
    let monitor = Monitor::new(shared(&source));

    monitor.register("", no_filter(), |_: &Event| panic!("handler bug"));
    let recorder = EventRecorder::new();
    monitor.register("", no_filter(), recorder.callback());

    let run = monitor
        .start(SubscriptionOptions::new(), CancellationToken::new())
        .await;
    assert!(finish(run).await.is_ok());
    assert_eq!(recorder.seqs(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_unisolated_panic_stops_the_dispatcher() {
    init_test_logging();
    let source = MockEventSource::new()
        .with_events((1..=3).map(test_event))
        .keep_open();
    let monitor = Monitor::builder(shared(&source))
        .config(MonitorConfig {
            isolate_handler_panics: false,
            ..MonitorConfig::default()
        })
        .build();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    monitor.register("", no_filter(), move |_: &Event| {
        counter.fetch_add(1, Ordering::SeqCst);
        panic!("handler bug");
    });

    let run = monitor
        .start(SubscriptionOptions::new(), CancellationToken::new())
        .await;
    let err = finish(run).await.unwrap_err();
    assert!(
        matches!(err, MonitorError::DispatcherStopped { .. }),
        "unexpected error: {err}"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.reads(), 1);
}

#[tokio::test]
async fn test_panic_isolation_follows_each_monitor_config() {
    init_test_logging();
    let source = MockEventSource::new().with_events((1..=3).map(test_event));
    let registry = Arc::new(HandlerRegistry::default());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    registry.register("", no_filter(), move |_: &Event| {
        counter.fetch_add(1, Ordering::SeqCst);
        panic!("handler bug");
    });

    let strict = Monitor::builder(shared(&source))
        .registry(Arc::clone(&registry))
        .config(MonitorConfig {
            isolate_handler_panics: false,
            ..MonitorConfig::named("strict")
        })
        .build();
    assert!(!strict.config().isolate_handler_panics);

    let run = strict
        .start(SubscriptionOptions::new(), CancellationToken::new())
        .await;
    let err = finish(run).await.unwrap_err();
    assert!(
        matches!(err, MonitorError::DispatcherStopped { .. }),
        "unexpected error: {err}"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A second monitor on the same registry keeps isolating.
    let lenient = Monitor::builder(shared(&source))
        .registry(Arc::clone(&registry))
        .build();
    let run = lenient
        .start(SubscriptionOptions::new(), CancellationToken::new())
        .await;
    assert!(finish(run).await.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_shared_registry_and_repeated_runs() {
    init_test_logging();
    let source = MockEventSource::new().with_events([
        container_event("start", "web"),
        container_event("die", "web"),
    ]);

    let registry = Arc::new(HandlerRegistry::default());
    let recorder = EventRecorder::new();
    let handler: Arc<dyn EventHandler> = Arc::new(
        FnHandler::new("die-watcher", recorder.callback()).with_predicate(ActionIs("die".into())),
    );
    registry.register_handler("", handler);

    let monitor = Monitor::builder(shared(&source))
        .registry(Arc::clone(&registry))
        .config(MonitorConfig::named("web-watch"))
        .build();

    for _ in 0..2 {
        let run = monitor
            .start(SubscriptionOptions::new(), CancellationToken::new())
            .await;
        assert_eq!(run.name(), "web-watch");
        assert!(finish(run).await.is_ok());
    }

    assert_eq!(recorder.actions(), vec!["die", "die"]);
    assert_eq!(source.open_count(), 2);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_live_feed_delivery_and_unregister() {
    init_test_logging();
    let (source, feed) = MockEventSource::new().keep_open().with_feed();
    let monitor = Monitor::new(shared(&source));
    let recorder = EventRecorder::new();
    let id = monitor.register("", no_filter(), recorder.callback());

    let cancel = CancellationToken::new();
    let run = monitor.start(SubscriptionOptions::new(), cancel.clone()).await;

    assert!(feed.send(&test_event(1)));
    assert!(recorder.wait_for(1, Duration::from_secs(5)).await);

    assert!(monitor.unregister(id));
    assert!(feed.send(&test_event(2)));
    // Wait until the second event was pulled and dispatched to nobody.
    let pulled = async {
        while source.reads() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), pulled)
        .await
        .unwrap();

    cancel.cancel();
    assert!(finish(run).await.is_ok());
    assert_eq!(recorder.seqs(), vec![1]);
}

#[tokio::test]
async fn test_handler_registered_mid_run_sees_later_events() {
    init_test_logging();
    let (source, feed) = MockEventSource::new().keep_open().with_feed();
    let monitor = Monitor::new(shared(&source));
    let early = EventRecorder::new();
    monitor.register("", no_filter(), early.callback());

    let cancel = CancellationToken::new();
    let run = monitor.start(SubscriptionOptions::new(), cancel.clone()).await;

    assert!(feed.send(&test_event(1)));
    assert!(early.wait_for(1, Duration::from_secs(5)).await);

    let late = EventRecorder::new();
    monitor.register("", no_filter(), late.callback());
    assert_eq!(monitor.registry().len(), 2);

    for seq in 2..=3 {
        assert!(feed.send(&test_event(seq)));
    }
    assert!(early.wait_for(3, Duration::from_secs(5)).await);
    assert!(late.wait_for(2, Duration::from_secs(5)).await);

    cancel.cancel();
    assert!(finish(run).await.is_ok());
    assert_eq!(early.seqs(), vec![1, 2, 3]);
    assert_eq!(late.seqs(), vec![2, 3]);
}
