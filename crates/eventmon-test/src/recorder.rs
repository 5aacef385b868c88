//! Thread-safe capture of callback invocations.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use eventmon_core::Event;

use crate::fixtures::seq_of;

/// Records every event passed to its callback.
///
/// Clones share the same log, so one clone can be moved into a callback
/// while the test keeps another.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that appends to this recorder.
    #[must_use]
    pub fn callback(&self) -> impl Fn(&Event) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &Event| {
            if let Ok(mut guard) = events.lock() {
                guard.push(event.clone());
            }
        }
    }

    /// Record one event directly.
    pub fn record(&self, event: &Event) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }

    /// Snapshot of the recorded events, in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().map(|g| g.len()).unwrap_or_default()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence numbers of the recorded [`test_event`](crate::test_event)s.
    #[must_use]
    pub fn seqs(&self) -> Vec<u64> {
        self.events().iter().filter_map(seq_of).collect()
    }

    /// Actions of the recorded events.
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e.action().to_owned())
            .collect()
    }

    /// Wait until at least `count` events were recorded.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let poll = async {
            while self.len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }
}
