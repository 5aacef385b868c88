//! Prelude module - commonly used types for convenient import.
//!
//! Use `use eventmon_monitor::prelude::*;` to import all essential types.

// Monitor
pub use crate::DEFAULT_MONITOR_NAME;
pub use crate::{Monitor, MonitorBuilder, MonitorConfig, MonitorRun};

// Registry
pub use crate::{EventHandler, FnHandler, HandlerRegistry, RegistrationId};

// Routing and filtering
pub use crate::{
    ActionIs, ActionKey, ConstantKey, KeyExtractor, KindActionKey, KindIs, KindKey, Predicate,
};

// Decoding
pub use crate::{EventDecoder, JsonDecoder};
