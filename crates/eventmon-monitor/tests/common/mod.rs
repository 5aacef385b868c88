//! Helpers shared by the monitor integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use eventmon_core::{Event, EventSource, MonitorResult};
use eventmon_monitor::MonitorRun;
use eventmon_test::MockEventSource;

/// Upper bound for any single run in these tests.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// No top-level filter.
pub fn no_filter() -> Option<fn(&Event) -> bool> {
    None
}

/// Share a mock source as a trait object, keeping a handle for assertions.
pub fn shared(source: &MockEventSource) -> Arc<dyn EventSource> {
    Arc::new(source.clone())
}

/// Await a run's terminal result, failing the test if it hangs.
pub async fn finish(run: MonitorRun) -> MonitorResult<()> {
    tokio::time::timeout(RUN_TIMEOUT, run)
        .await
        .expect("monitor run did not finish in time")
}

/// Poll `try_result` until the run reports.
pub async fn settle(run: &mut MonitorRun) -> MonitorResult<()> {
    let poll = async {
        loop {
            if let Some(result) = run.try_result() {
                return result;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(RUN_TIMEOUT, poll)
        .await
        .expect("monitor run did not report in time")
}
