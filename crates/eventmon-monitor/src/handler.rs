//! Handler, predicate and routing-key abstractions.

use std::sync::Arc;

use eventmon_core::Event;

/// Decides whether an event is accepted.
pub trait Predicate: Send + Sync {
    /// Return `true` to accept the event.
    fn test(&self, event: &Event) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Event) -> bool + Send + Sync,
{
    fn test(&self, event: &Event) -> bool {
        self(event)
    }
}

/// Derives the routing key used to select registrations for an event.
pub trait KeyExtractor: Send + Sync {
    /// Routing key for this event.
    fn key(&self, event: &Event) -> String;
}

impl<F> KeyExtractor for F
where
    F: Fn(&Event) -> String + Send + Sync,
{
    fn key(&self, event: &Event) -> String {
        self(event)
    }
}

/// Routes every event to the same key, so every registration under that key
/// sees every event. The default key is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantKey(pub String);

impl KeyExtractor for ConstantKey {
    fn key(&self, _event: &Event) -> String {
        self.0.clone()
    }
}

/// Routes by event kind (`container`, `image`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct KindKey;

impl KeyExtractor for KindKey {
    fn key(&self, event: &Event) -> String {
        event.kind().to_string()
    }
}

/// Routes by event action (`start`, `die`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionKey;

impl KeyExtractor for ActionKey {
    fn key(&self, event: &Event) -> String {
        event.action().to_string()
    }
}

/// Routes by `kind:action`, e.g. `container:start`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindActionKey;

impl KeyExtractor for KindActionKey {
    fn key(&self, event: &Event) -> String {
        format!("{}:{}", event.kind(), event.action())
    }
}

/// Accepts events of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindIs(pub String);

impl Predicate for KindIs {
    fn test(&self, event: &Event) -> bool {
        event.kind() == self.0
    }
}

/// Accepts events with one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionIs(pub String);

impl Predicate for ActionIs {
    fn test(&self, event: &Event) -> bool {
        event.action() == self.0
    }
}

/// Receives dispatched events.
///
/// Handlers run synchronously on the dispatch path: the next event is not
/// delivered until every matching handler for the current one has returned.
/// Keep `on_event` fast, or hand heavy work to your own task.
pub trait EventHandler: Send + Sync {
    /// Called for every event routed to this handler that it accepts.
    fn on_event(&self, event: &Event);

    /// Per-handler filter. Default accepts everything.
    fn accepts(&self, event: &Event) -> bool {
        let _ = event;
        true
    }

    /// Name used in logs.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Closure-backed handler with an optional predicate.
pub struct FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    name: String,
    predicate: Option<Arc<dyn Predicate>>,
    callback: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    /// Create a handler that accepts every event.
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            predicate: None,
            callback,
        }
    }

    /// Only invoke the callback for events the predicate accepts.
    #[must_use]
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Predicate + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Same as [`with_predicate`](Self::with_predicate) for an already shared predicate.
    #[must_use]
    pub fn with_shared_predicate(mut self, predicate: Option<Arc<dyn Predicate>>) -> Self {
        self.predicate = predicate;
        self
    }
}

impl<F> std::fmt::Debug for FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .field("has_predicate", &self.predicate.is_some())
            .finish_non_exhaustive()
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        (self.callback)(event);
    }

    fn accepts(&self, event: &Event) -> bool {
        self.predicate.as_ref().is_none_or(|p| p.test(event))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_predicate_and_key() {
        let is_start = |e: &Event| e.action() == "start";
        let by_id = |e: &Event| e.actor_id().to_string();

        let event = Event::new("container", "start").with_actor_id("abc");
        assert!(is_start.test(&event));
        assert_eq!(by_id.key(&event), "abc");
    }

    #[test]
    fn test_key_strategies() {
        let event = Event::new("image", "pull");
        assert_eq!(ConstantKey::default().key(&event), "");
        assert_eq!(ConstantKey("all".into()).key(&event), "all");
        assert_eq!(KindKey.key(&event), "image");
        assert_eq!(ActionKey.key(&event), "pull");
        assert_eq!(KindActionKey.key(&event), "image:pull");
    }

    #[test]
    fn test_predicate_strategies() {
        let event = Event::new("volume", "create");
        assert!(KindIs("volume".into()).test(&event));
        assert!(!KindIs("container".into()).test(&event));
        assert!(ActionIs("create".into()).test(&event));
        assert!(!ActionIs("destroy".into()).test(&event));
    }

    #[test]
    fn test_fn_handler_without_predicate_accepts_all() {
        let count = AtomicUsize::new(0);
        let handler = FnHandler::new("counter", |_: &Event| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        let event = Event::new("network", "connect");
        assert!(handler.accepts(&event));
        handler.on_event(&event);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(handler.name(), "counter");
    }

    #[test]
    fn test_fn_handler_with_predicate() {
        let handler =
            FnHandler::new("starts", |_: &Event| {}).with_predicate(ActionIs("start".into()));

        assert!(handler.accepts(&Event::new("container", "start")));
        assert!(!handler.accepts(&Event::new("container", "stop")));
    }
}
