//! One monitor run: the subscribe-and-decode state machine, the dispatch
//! loop and the cancellation watcher.
//!
//! ```text
//!   Starting ──initial error──────────────────────────┐
//!      │                                              │
//!      ├──cancel──┐                                   │
//!      ▼          ▼                                   ▼
//!   Running ──► Draining ──(dispatcher joined)──►   Done ──► terminal result
//!      │  cancel / decode error / end of stream / dispatcher lost
//!      └─► next message
//! ```
//!
//! The state-machine task owns the only sender of the terminal-result
//! channel, and `oneshot::Sender::send` consumes it, so a run cannot report
//! twice.

use std::future::IntoFuture;
use std::sync::Arc;

use eventmon_core::{
    Event, EventSource, MonitorError, MonitorResult, RawEventStream, SubscriptionOptions,
};
use futures::StreamExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::decoder::EventDecoder;
use crate::registry::HandlerRegistry;

/// Everything the subscribe-and-decode task needs.
pub(crate) struct RunContext {
    pub(crate) name: String,
    pub(crate) source: Arc<dyn EventSource>,
    pub(crate) decoder: Arc<dyn EventDecoder>,
    pub(crate) registry: Arc<HandlerRegistry>,
    pub(crate) isolate_panics: bool,
    pub(crate) options: SubscriptionOptions,
}

/// A decoded event handed to the dispatcher, acknowledged once every
/// matching handler has returned.
struct Delivery {
    event: Event,
    done: oneshot::Sender<()>,
}

/// States of the subscribe-and-decode task. Every state before `Done` owns
/// the dispatcher link, so the dispatcher is closed exactly once.
enum RunState {
    Starting(DispatchLink),
    Running(RawEventStream, DispatchLink),
    Draining(DispatchLink, MonitorResult<()>),
    Done(MonitorResult<()>),
}

impl RunState {
    fn label(&self) -> &'static str {
        match self {
            Self::Starting(_) => "starting",
            Self::Running(..) => "running",
            Self::Draining(..) => "draining",
            Self::Done(_) => "done",
        }
    }
}

/// Sending half towards the dispatcher plus its task handle.
struct DispatchLink {
    deliveries: mpsc::Sender<Delivery>,
    task: JoinHandle<()>,
}

impl DispatchLink {
    /// Stop feeding the dispatcher and wait for the in-flight event to finish.
    async fn close(self) -> Result<(), String> {
        drop(self.deliveries);
        self.task.await.map_err(|e| e.to_string())
    }
}

/// Terminal-result handle of a monitor run.
///
/// Resolves exactly once: `Ok(())` when the run was cancelled or the feed
/// ended, the first error otherwise. Can be awaited directly.
#[derive(Debug)]
pub struct MonitorRun {
    name: String,
    result: oneshot::Receiver<MonitorResult<()>>,
    taken: bool,
}

impl MonitorRun {
    /// Name of the monitor that produced this run.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the run to end.
    ///
    /// # Errors
    ///
    /// Returns the run's terminal error, or [`MonitorError::Aborted`] if the
    /// run was torn down (runtime shutdown) before it could report.
    pub async fn wait(self) -> MonitorResult<()> {
        self.result.await.unwrap_or(Err(MonitorError::Aborted))
    }

    /// Poll for the terminal result without blocking.
    ///
    /// Returns `None` while the run is still going. The result is handed out
    /// once; later calls return `None`.
    pub fn try_result(&mut self) -> Option<MonitorResult<()>> {
        if self.taken {
            return None;
        }
        let result = match self.result.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(MonitorError::Aborted),
        };
        self.taken = true;
        Some(result)
    }
}

impl IntoFuture for MonitorRun {
    type Output = MonitorResult<()>;
    type IntoFuture = BoxFuture<'static, MonitorResult<()>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

/// Spawn the three tasks of a run and wait at the startup barrier.
pub(crate) async fn launch(ctx: RunContext, cancel: CancellationToken) -> MonitorRun {
    let (delivery_tx, delivery_rx) = mpsc::channel::<Delivery>(1);
    let (started_tx, started_rx) = oneshot::channel::<()>();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (result_tx, result_rx) = oneshot::channel::<MonitorResult<()>>();

    let registry = Arc::clone(&ctx.registry);
    let isolate_panics = ctx.isolate_panics;
    let dispatcher = tokio::task::spawn_blocking(move || {
        dispatch_loop(&registry, isolate_panics, delivery_rx);
    });
    tokio::spawn(watch_cancellation(cancel, stop_tx));

    let name = ctx.name.clone();
    let link = DispatchLink {
        deliveries: delivery_tx,
        task: dispatcher,
    };
    tokio::spawn(drive(ctx, started_tx, stop_rx, link, result_tx));

    // A dropped sender also means the attempt is over.
    let _ = started_rx.await;
    debug!(monitor = %name, "Startup barrier passed");

    MonitorRun {
        name,
        result: result_rx,
        taken: false,
    }
}

/// Runs handlers on the blocking pool, one delivery at a time.
fn dispatch_loop(
    registry: &HandlerRegistry,
    isolate_panics: bool,
    mut deliveries: mpsc::Receiver<Delivery>,
) {
    while let Some(Delivery { event, done }) = deliveries.blocking_recv() {
        let invoked = registry.dispatch_with(&event, isolate_panics);
        trace!(
            kind = %event.kind(),
            action = %event.action(),
            invoked,
            "Event delivered"
        );
        let _ = done.send(());
    }
    debug!("Dispatcher finished");
}

/// Forwards the external cancellation signal to the state machine.
///
/// Exits without sending when the run ends on its own.
async fn watch_cancellation(cancel: CancellationToken, mut stop: oneshot::Sender<()>) {
    let cancelled = tokio::select! {
        () = cancel.cancelled() => true,
        () = stop.closed() => false,
    };
    if cancelled {
        debug!("Cancellation requested");
        let _ = stop.send(());
    }
}

async fn drive(
    ctx: RunContext,
    started: oneshot::Sender<()>,
    mut stop: oneshot::Receiver<()>,
    link: DispatchLink,
    result: oneshot::Sender<MonitorResult<()>>,
) {
    let mut started = Some(started);
    let mut state = RunState::Starting(link);

    let outcome = loop {
        let from = state.label();
        state = match state {
            RunState::Starting(link) => start(&ctx, &mut stop, started.take(), link).await,
            RunState::Running(events, link) => step(&ctx, events, &mut stop, link).await,
            RunState::Draining(link, outcome) => RunState::Done(drain(link, outcome).await),
            RunState::Done(outcome) => break outcome,
        };
        if from != state.label() {
            debug!(monitor = %ctx.name, from, to = state.label(), "Monitor state transition");
        }
    };

    match &outcome {
        Ok(()) => info!(monitor = %ctx.name, "Monitor run finished"),
        Err(e) => warn!(monitor = %ctx.name, error = %e, "Monitor run failed"),
    }
    let _ = result.send(outcome);
}

/// Open the subscription, release the startup barrier, check the initial slot.
async fn start(
    ctx: &RunContext,
    stop: &mut oneshot::Receiver<()>,
    started: Option<oneshot::Sender<()>>,
    link: DispatchLink,
) -> RunState {
    let opened = tokio::select! {
        biased;
        _ = &mut *stop => None,
        subscription = ctx.source.open(&ctx.options) => Some(subscription),
    };

    if let Some(barrier) = started {
        let _ = barrier.send(());
    }

    let Some(subscription) = opened else {
        debug!(monitor = %ctx.name, "Cancelled before the subscription was placed");
        return RunState::Draining(link, Ok(()));
    };

    let (events, initial_error) = subscription.into_parts();
    let slot = tokio::select! {
        biased;
        slot = initial_error => Some(slot),
        _ = &mut *stop => None,
    };

    match slot {
        Some(Ok(err)) => {
            warn!(monitor = %ctx.name, error = %err, "Subscription failed");
            // Nothing was delivered; the dispatcher only has to be joined.
            RunState::Done(drain(link, Err(MonitorError::Subscription(err))).await)
        },
        Some(Err(_)) => {
            info!(
                monitor = %ctx.name,
                since = ?ctx.options.since,
                until = ?ctx.options.until,
                filters = %ctx.options.filters.to_json(),
                "Subscription placed"
            );
            RunState::Running(events, link)
        },
        None => RunState::Draining(link, Ok(())),
    }
}

/// Read, decode and deliver one message.
async fn step(
    ctx: &RunContext,
    mut events: RawEventStream,
    stop: &mut oneshot::Receiver<()>,
    link: DispatchLink,
) -> RunState {
    let next = tokio::select! {
        biased;
        _ = &mut *stop => None,
        raw = events.next() => Some(raw),
    };

    let raw = match next {
        None => return RunState::Draining(link, Ok(())),
        Some(None) => {
            info!(monitor = %ctx.name, "Event stream ended");
            return RunState::Draining(link, Ok(()));
        },
        Some(Some(raw)) => raw,
    };

    let event = match ctx.decoder.decode(raw) {
        Ok(event) => event,
        Err(e) => {
            warn!(monitor = %ctx.name, error = %e, "Malformed event, stopping");
            return RunState::Draining(link, Err(e.into()));
        },
    };

    let (done_tx, done_rx) = oneshot::channel();
    let delivery = Delivery {
        event,
        done: done_tx,
    };

    let sent = tokio::select! {
        biased;
        _ = &mut *stop => None,
        sent = link.deliveries.send(delivery) => Some(sent.is_ok()),
    };
    match sent {
        None => return RunState::Draining(link, Ok(())),
        Some(false) => return RunState::Draining(link, Err(dispatcher_lost())),
        Some(true) => {},
    }

    let ack = tokio::select! {
        biased;
        _ = &mut *stop => None,
        ack = done_rx => Some(ack.is_ok()),
    };
    match ack {
        None => RunState::Draining(link, Ok(())),
        Some(true) => RunState::Running(events, link),
        Some(false) => RunState::Draining(link, Err(dispatcher_lost())),
    }
}

/// Close the dispatcher and fold its exit status into the outcome.
///
/// The first error wins.
async fn drain(link: DispatchLink, outcome: MonitorResult<()>) -> MonitorResult<()> {
    match (link.close().await, outcome) {
        (Ok(()), outcome) | (Err(_), outcome @ Err(_)) => outcome,
        (Err(reason), Ok(())) => Err(MonitorError::DispatcherStopped { reason }),
    }
}

fn dispatcher_lost() -> MonitorError {
    MonitorError::DispatcherStopped {
        reason: "dispatcher dropped the delivery".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (oneshot::Sender<MonitorResult<()>>, MonitorRun) {
        let (tx, rx) = oneshot::channel();
        let run = MonitorRun {
            name: "test".to_string(),
            result: rx,
            taken: false,
        };
        (tx, run)
    }

    #[tokio::test]
    async fn test_dropped_sender_reads_as_aborted() {
        let (tx, run) = handle();
        drop(tx);
        assert!(matches!(run.await, Err(MonitorError::Aborted)));
    }

    #[test]
    fn test_try_result_hands_out_once() {
        let (tx, mut run) = handle();
        assert!(run.try_result().is_none());

        tx.send(Ok(())).unwrap();
        assert!(matches!(run.try_result(), Some(Ok(()))));
        assert!(run.try_result().is_none());
    }

    #[tokio::test]
    async fn test_drain_keeps_first_error() {
        let (deliveries, _rx) = mpsc::channel(1);
        let task = tokio::spawn(async {});
        let link = DispatchLink { deliveries, task };

        let outcome = drain(link, Err(dispatcher_lost())).await;
        assert!(matches!(outcome, Err(MonitorError::DispatcherStopped { .. })));
    }

    #[tokio::test]
    async fn test_drain_reports_dispatcher_panic() {
        let (deliveries, _rx) = mpsc::channel(1);
        let task = tokio::task::spawn_blocking(|| panic!("dispatcher bug"));
        let link = DispatchLink { deliveries, task };

        let outcome = drain(link, Ok(())).await;
        assert!(matches!(outcome, Err(MonitorError::DispatcherStopped { .. })));
    }
}
