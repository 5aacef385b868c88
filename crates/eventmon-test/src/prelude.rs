//! Commonly used test utilities.
//!
//! `use eventmon_test::prelude::*;` in test modules.

pub use crate::fixtures::{
    container_event, kind_event, malformed_raw_event, raw, raw_all, seq_of, test_event,
};
pub use crate::harness::init_test_logging;
pub use crate::mocks::{ConfirmHandle, FeedHandle, MockEventSource, OpenGate};
pub use crate::recorder::EventRecorder;
