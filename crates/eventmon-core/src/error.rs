//! Error types surfaced as a monitor run's terminal result.

use thiserror::Error;

/// Error reported by an event source when the initial subscribe attempt fails.
///
/// Boxed so the source's own error value reaches the caller unchanged.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A raw message did not have the shape of an [`Event`](crate::Event).
#[derive(Debug, Error)]
#[error("malformed event: {message}")]
pub struct DecodeError {
    message: String,
    #[source]
    source: Option<serde_json::Error>,
}

impl DecodeError {
    /// Create a decode error with a plain description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Human-readable description of what was wrong with the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            message: e.to_string(),
            source: Some(e),
        }
    }
}

/// Terminal error of a monitor run.
///
/// A run ends with exactly one `MonitorResult<()>`. Cancellation is not an
/// error and is reported as `Ok(())`.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The remote feed could not be opened.
    #[error("subscription failed: {0}")]
    Subscription(#[source] SourceError),

    /// A message in the stream could not be decoded; the run stopped.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The dispatch task went away before the run finished.
    #[error("event dispatcher stopped: {reason}")]
    DispatcherStopped {
        /// Why the dispatcher is gone.
        reason: String,
    },

    /// The run was torn down without producing a result.
    #[error("monitor run aborted before reporting a result")]
    Aborted,
}

impl MonitorError {
    /// Wrap an error reported by the event source.
    pub fn subscription(err: impl Into<SourceError>) -> Self {
        Self::Subscription(err.into())
    }

    /// Returns `true` if this is an initial subscription failure.
    #[must_use]
    pub fn is_subscription(&self) -> bool {
        matches!(self, Self::Subscription(_))
    }

    /// Returns `true` if this is a mid-stream decode failure.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Result type for monitor runs.
pub type MonitorResult<T> = Result<T, MonitorError>;
