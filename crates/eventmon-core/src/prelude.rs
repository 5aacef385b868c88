//! Prelude module - commonly used types for convenient import.
//!
//! Use `use eventmon_core::prelude::*;` to import all essential types.

// Events
pub use crate::{Actor, Event};

// Subscription request
pub use crate::{Filters, SubscriptionOptions};

// Event source seam
pub use crate::{EventSource, RawEvent, RawEventStream, Subscription};

// Errors
pub use crate::{DecodeError, MonitorError, MonitorResult, SourceError};
