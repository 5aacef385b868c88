//! Shared test utilities for eventmon.
//!
//! Mock event sources, event fixtures and a callback recorder, used by the
//! other eventmon crates as a dev-dependency.
//!
//! ```rust,ignore
//! use eventmon_test::{EventRecorder, MockEventSource, test_event};
//!
//! #[tokio::test]
//! async fn test_delivery() {
//!     let source = Arc::new(MockEventSource::new().with_events((1..=3).map(test_event)));
//!     let recorder = EventRecorder::new();
//!     let no_filter = None::<fn(&Event) -> bool>;
//!     let run = Monitor::subscribe_all(source, options, no_filter, recorder.callback(), cancel).await;
//!     assert!(run.await.is_ok());
//!     assert_eq!(recorder.seqs(), vec![1, 2, 3]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;
pub mod recorder;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
pub use recorder::*;
