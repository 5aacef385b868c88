//! Eventmon Core - Shared types for the eventmon subscription pipeline.
//!
//! This crate provides:
//! - The typed [`Event`] value delivered to handlers
//! - [`SubscriptionOptions`] describing the time range and server-side filters
//! - The [`EventSource`] seam a remote event feed is plugged in through
//! - The error taxonomy surfaced as a monitor run's terminal result
//!
//! # Example
//!
//! ```rust
//! use eventmon_core::{Event, RawEvent, SubscriptionOptions};
//!
//! let options = SubscriptionOptions::new()
//!     .since("1700000000")
//!     .filter("type", "container");
//! assert_eq!(options.filters.values("type"), ["container"]);
//!
//! let event = Event::new("container", "start").with_actor_id("abc123");
//! let raw = RawEvent::from_event(&event)?;
//! assert_eq!(raw.as_value()["Action"], "start");
//! # Ok::<(), serde_json::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod event;
mod options;
mod source;

pub use error::{DecodeError, MonitorError, MonitorResult, SourceError};
pub use event::{Actor, Event};
pub use options::{Filters, SubscriptionOptions};
pub use source::{EventSource, RawEvent, RawEventStream, Subscription};
