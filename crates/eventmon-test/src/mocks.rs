//! Mock implementations for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{Notify, mpsc, oneshot};

use eventmon_core::{
    Event, EventSource, RawEvent, SourceError, Subscription, SubscriptionOptions,
};

use crate::fixtures::raw;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Script {
    events: Vec<RawEvent>,
    initial_error: Option<String>,
    keep_open: bool,
    feed: Option<mpsc::UnboundedReceiver<RawEvent>>,
    gate: Option<Arc<Notify>>,
    confirmation: Option<Arc<Mutex<Option<oneshot::Sender<SourceError>>>>>,
}

/// Scripted implementation of [`EventSource`].
///
/// Every `open` replays the scripted messages, then either ends the stream,
/// keeps it open forever ([`keep_open`](Self::keep_open)) or forwards a live
/// feed ([`with_feed`](Self::with_feed), first subscription only). Options
/// passed to `open` and messages pulled from the stream are recorded.
#[derive(Debug, Clone, Default)]
pub struct MockEventSource {
    script: Arc<Mutex<Script>>,
    opened: Arc<Mutex<Vec<SubscriptionOptions>>>,
    reads: Arc<AtomicUsize>,
}

impl MockEventSource {
    /// A source whose subscriptions end immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay these events on every subscription.
    #[must_use]
    pub fn with_events(self, events: impl IntoIterator<Item = Event>) -> Self {
        lock(&self.script)
            .events
            .extend(events.into_iter().map(|e| raw(&e)));
        self
    }

    /// Replay these raw messages, possibly malformed.
    #[must_use]
    pub fn with_raw_events(self, raw: impl IntoIterator<Item = RawEvent>) -> Self {
        lock(&self.script).events.extend(raw);
        self
    }

    /// Fail every subscribe attempt with `message`.
    #[must_use]
    pub fn with_initial_error(self, message: impl Into<String>) -> Self {
        lock(&self.script).initial_error = Some(message.into());
        self
    }

    /// Keep the stream open after the scripted messages.
    #[must_use]
    pub fn keep_open(self) -> Self {
        lock(&self.script).keep_open = true;
        self
    }

    /// Forward messages pushed through the returned handle after the
    /// scripted ones. Dropping the handle ends the stream unless
    /// [`keep_open`](Self::keep_open) is set.
    #[must_use]
    pub fn with_feed(self) -> (Self, FeedHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.script).feed = Some(rx);
        (self, FeedHandle { tx })
    }

    /// Hold `open` until the returned gate is released.
    #[must_use]
    pub fn with_open_gate(self) -> (Self, OpenGate) {
        let notify = Arc::new(Notify::new());
        lock(&self.script).gate = Some(Arc::clone(&notify));
        (self, OpenGate { notify })
    }

    /// Leave the initial-error slot pending after `open` returns, until the
    /// returned handle confirms or fails the subscription.
    #[must_use]
    pub fn with_pending_confirmation(self) -> (Self, ConfirmHandle) {
        let slot = Arc::new(Mutex::new(None));
        lock(&self.script).confirmation = Some(Arc::clone(&slot));
        (self, ConfirmHandle { slot })
    }

    /// Options of every `open` call, in call order.
    #[must_use]
    pub fn opened(&self) -> Vec<SubscriptionOptions> {
        lock(&self.opened).clone()
    }

    /// Number of `open` calls.
    #[must_use]
    pub fn open_count(&self) -> usize {
        lock(&self.opened).len()
    }

    /// Number of messages pulled from the streams handed out so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn live_tail(script: &mut Script) -> BoxStream<'static, RawEvent> {
        let live = script.feed.take().map(|rx| {
            stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|e| (e, rx)) }).boxed()
        });
        match (live, script.keep_open) {
            (Some(live), true) => live.chain(stream::pending()).boxed(),
            (Some(live), false) => live,
            (None, true) => stream::pending().boxed(),
            (None, false) => stream::empty().boxed(),
        }
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn open(&self, options: &SubscriptionOptions) -> Subscription {
        lock(&self.opened).push(options.clone());

        let gate = lock(&self.script).gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut script = lock(&self.script);
        if let Some(message) = &script.initial_error {
            return Subscription::failed(message.clone());
        }

        let reads = Arc::clone(&self.reads);
        let events = stream::iter(script.events.clone())
            .chain(Self::live_tail(&mut script))
            .inspect(move |_| {
                reads.fetch_add(1, Ordering::SeqCst);
            });

        match &script.confirmation {
            Some(slot) => {
                let (tx, rx) = oneshot::channel();
                *lock(slot) = Some(tx);
                Subscription::new(events, rx)
            },
            None => Subscription::ready(events),
        }
    }
}

/// Pushes live messages into a [`MockEventSource`] subscription.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    tx: mpsc::UnboundedSender<RawEvent>,
}

impl FeedHandle {
    /// Push an event. Returns `false` once the subscription is gone.
    pub fn send(&self, event: &Event) -> bool {
        self.tx.send(raw(event)).is_ok()
    }

    /// Push a raw message.
    pub fn send_raw(&self, raw: RawEvent) -> bool {
        self.tx.send(raw).is_ok()
    }
}

/// Releases a gated [`MockEventSource::open`].
#[derive(Debug, Clone)]
pub struct OpenGate {
    notify: Arc<Notify>,
}

impl OpenGate {
    /// Let one pending or future `open` call proceed.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

/// Settles a subscription left pending by
/// [`MockEventSource::with_pending_confirmation`].
#[derive(Debug, Clone)]
pub struct ConfirmHandle {
    slot: Arc<Mutex<Option<oneshot::Sender<SourceError>>>>,
}

impl ConfirmHandle {
    /// Report success by closing the slot. Returns `false` if nothing was
    /// pending.
    pub fn confirm(&self) -> bool {
        lock(&self.slot).take().is_some()
    }

    /// Report a failed initial attempt. Returns `false` if nothing was
    /// pending or the monitor stopped listening.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        let Some(tx) = lock(&self.slot).take() else {
            return false;
        };
        let message: String = message.into();
        tx.send(message.into()).is_ok()
    }
}
