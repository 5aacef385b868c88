//! Test fixtures for events and raw messages.

use eventmon_core::{Event, RawEvent};
use serde_json::json;

/// Attribute carrying the sequence number set by [`test_event`].
pub const SEQ_ATTRIBUTE: &str = "seq";

/// A container `start` event tagged with a sequence number.
///
/// The actor ID is `container-{seq}` and the number is also stored in the
/// [`SEQ_ATTRIBUTE`] attribute, so ordering can be checked on either.
#[must_use]
pub fn test_event(seq: u64) -> Event {
    Event::new("container", "start")
        .with_actor_id(format!("container-{seq}"))
        .with_attribute(SEQ_ATTRIBUTE, seq.to_string())
}

/// A container event with the given action and container ID.
#[must_use]
pub fn container_event(action: &str, id: &str) -> Event {
    Event::new("container", action)
        .with_actor_id(id)
        .with_attribute("name", format!("{id}-name"))
        .with_scope("local")
}

/// An event of any kind and action.
#[must_use]
pub fn kind_event(kind: &str, action: &str) -> Event {
    Event::new(kind, action).with_scope("local")
}

/// The sequence number stored by [`test_event`].
#[must_use]
pub fn seq_of(event: &Event) -> Option<u64> {
    event.attribute(SEQ_ATTRIBUTE)?.parse().ok()
}

/// Encode an event as the feed would send it.
///
/// # Panics
///
/// Panics if the event cannot be encoded.
#[must_use]
pub fn raw(event: &Event) -> RawEvent {
    RawEvent::from_event(event).expect("test event encodes to JSON")
}

/// Encode a batch of events.
///
/// # Panics
///
/// Panics if an event cannot be encoded.
#[must_use]
pub fn raw_all(events: &[Event]) -> Vec<RawEvent> {
    events.iter().map(raw).collect()
}

/// A message that cannot be decoded into an event.
#[must_use]
pub fn malformed_raw_event() -> RawEvent {
    RawEvent::new(json!({ "Type": 42, "Action": ["not", "a", "string"] }))
}
