//! Eventmon Monitor - Subscription-and-dispatch pipeline.
//!
//! This crate provides:
//! - [`EventDecoder`] turning raw feed messages into typed events
//! - [`HandlerRegistry`] routing events to handlers by key and predicate
//! - [`Monitor`] running the subscription lifecycle and reporting a single
//!   terminal result per run through [`MonitorRun`]
//!
//! # Architecture
//!
//! Each call to [`Monitor::start`] spawns three tasks:
//!
//! 1. **Subscribe-and-decode**: opens the subscription, reads raw messages one
//!    at a time, decodes them and hands each event to the dispatcher. It owns
//!    the run's state machine and the only sender of its terminal result.
//! 2. **Dispatcher**: runs on the blocking pool and delivers each event to the
//!    registry, synchronously, in feed order.
//! 3. **Cancellation watcher**: forwards the caller's `CancellationToken`.
//!
//! `start` returns once the subscription attempt has completed. Cancellation
//! ends the run with `Ok(())`; an initial subscription failure or a malformed
//! message ends it with that error.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use eventmon_core::{Event, EventSource, SubscriptionOptions};
//! use eventmon_monitor::{KindKey, Monitor};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(source: Arc<dyn EventSource>) {
//! let monitor = Monitor::builder(source).key_extractor(KindKey).build();
//! monitor.register("container", None::<fn(&Event) -> bool>, |e: &Event| {
//!     println!("container {} {}", e.actor_id(), e.action());
//! });
//!
//! let cancel = CancellationToken::new();
//! let run = monitor.start(SubscriptionOptions::new(), cancel.clone()).await;
//! cancel.cancel();
//! run.await.expect("clean shutdown");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bridge;
pub mod prelude;

mod decoder;
mod handler;
mod monitor;
mod registry;
mod run;

pub use decoder::{EventDecoder, JsonDecoder};
pub use handler::{
    ActionIs, ActionKey, ConstantKey, EventHandler, FnHandler, KeyExtractor, KindActionKey,
    KindIs, KindKey, Predicate,
};
pub use monitor::{DEFAULT_MONITOR_NAME, Monitor, MonitorBuilder, MonitorConfig};
pub use registry::{HandlerRegistry, RegistrationId};
pub use run::MonitorRun;
