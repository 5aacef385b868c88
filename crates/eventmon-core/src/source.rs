//! The seam between the monitor and the remote event feed.
//!
//! An [`EventSource`] opens a subscription and hands back two things: a
//! stream of raw messages and a one-shot slot that is filled only if the
//! initial subscribe attempt failed. Transport, authentication and wire
//! framing all live behind this trait.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::SourceError;
use crate::event::Event;
use crate::options::SubscriptionOptions;

/// An undecoded message as it came off the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent(Value);

impl RawEvent {
    /// Wrap a JSON value read from the feed.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Encode a typed event into the feed's wire shape.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if the event cannot be encoded.
    pub fn from_event(event: &Event) -> Result<Self, serde_json::Error> {
        serde_json::to_value(event).map(Self)
    }

    /// Borrow the underlying JSON.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Take the underlying JSON.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for RawEvent {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Stream of raw messages yielded by an open subscription.
pub type RawEventStream = BoxStream<'static, RawEvent>;

/// Handles returned by [`EventSource::open`].
pub struct Subscription {
    events: RawEventStream,
    initial_error: oneshot::Receiver<SourceError>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl Subscription {
    /// Build a subscription from a message stream and an initial-error slot.
    ///
    /// The source sends on the slot's sender only when the subscribe attempt
    /// failed; dropping the sender without sending reports success.
    pub fn new<S>(events: S, initial_error: oneshot::Receiver<SourceError>) -> Self
    where
        S: Stream<Item = RawEvent> + Send + 'static,
    {
        Self {
            events: events.boxed(),
            initial_error,
        }
    }

    /// A subscription that was placed successfully.
    pub fn ready<S>(events: S) -> Self
    where
        S: Stream<Item = RawEvent> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        drop(tx);
        Self::new(events, rx)
    }

    /// A subscription whose initial attempt failed with `err`.
    pub fn failed(err: impl Into<SourceError>) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive in `rx`, so this cannot fail.
        let _ = tx.send(err.into());
        Self::new(stream::empty(), rx)
    }

    /// Split into the message stream and the initial-error slot.
    #[must_use]
    pub fn into_parts(self) -> (RawEventStream, oneshot::Receiver<SourceError>) {
        (self.events, self.initial_error)
    }
}

/// A remote feed that can be subscribed to.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Place a subscription with the given options.
    ///
    /// Implementations may return before the remote side has confirmed the
    /// subscription; a late failure of the initial attempt is reported
    /// through the returned [`Subscription`]'s initial-error slot.
    async fn open(&self, options: &SubscriptionOptions) -> Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_ready_subscription_reports_no_error() {
        let sub = Subscription::ready(stream::iter(vec![RawEvent::new(json!({}))]));
        let (mut events, initial) = sub.into_parts();

        assert!(initial.await.is_err());
        assert!(events.next().await.is_some());
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_subscription_reports_error() {
        let sub = Subscription::failed("connection refused");
        let (mut events, initial) = sub.into_parts();

        let err = initial.await.unwrap();
        assert_eq!(err.to_string(), "connection refused");
        assert!(events.next().await.is_none());
    }

    #[test]
    fn test_raw_event_from_event() {
        let event = Event::new("container", "die").with_actor_id("abc");
        let raw = RawEvent::from_event(&event).unwrap();
        assert_eq!(raw.as_value()["Type"], "container");
        assert_eq!(raw.as_value()["Actor"]["ID"], "abc");
    }
}
