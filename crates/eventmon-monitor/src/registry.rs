//! Routing-key based handler registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use eventmon_core::Event;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::handler::{ConstantKey, EventHandler, FnHandler, KeyExtractor, Predicate};

/// Handle for one registration, used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone)]
struct Registration {
    id: RegistrationId,
    handler: Arc<dyn EventHandler>,
}

/// Holds `(routing key, handler)` registrations and fans events out to them.
///
/// Each event first goes through the optional top-level filter. Its routing
/// key is then computed with the configured [`KeyExtractor`], and every
/// handler registered under that key that accepts the event is invoked, in
/// registration order.
///
/// Registration and dispatch may run concurrently. Dispatch takes a snapshot
/// of the matching handlers and releases the lock before calling them, so a
/// handler may itself register or unregister.
pub struct HandlerRegistry {
    routes: RwLock<HashMap<String, Vec<Registration>>>,
    key_extractor: Arc<dyn KeyExtractor>,
    filter: Option<Arc<dyn Predicate>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (keys, handlers) = self
            .routes
            .read()
            .map(|r| (r.len(), r.values().map(Vec::len).sum::<usize>()))
            .unwrap_or_default();
        f.debug_struct("HandlerRegistry")
            .field("key_count", &keys)
            .field("handler_count", &handlers)
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(ConstantKey::default())
    }
}

impl HandlerRegistry {
    /// Create a registry routing with the given key extractor.
    #[must_use]
    pub fn new<K>(key_extractor: K) -> Self
    where
        K: KeyExtractor + 'static,
    {
        Self::from_parts(Arc::new(key_extractor), None)
    }

    pub(crate) fn from_parts(
        key_extractor: Arc<dyn KeyExtractor>,
        filter: Option<Arc<dyn Predicate>>,
    ) -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            key_extractor,
            filter,
        }
    }

    /// Set the top-level filter evaluated before any routing.
    #[must_use]
    pub fn with_filter<P>(mut self, filter: P) -> Self
    where
        P: Predicate + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Register a callback under a routing key, with an optional predicate.
    ///
    /// Duplicate registrations are allowed and each fires independently.
    pub fn register<P, F>(
        &self,
        key: impl Into<String>,
        predicate: Option<P>,
        callback: F,
    ) -> RegistrationId
    where
        P: Predicate + 'static,
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let key = key.into();
        let mut handler = FnHandler::new(format!("callback[{key}]"), callback);
        if let Some(p) = predicate {
            handler = handler.with_predicate(p);
        }
        self.register_handler(key, Arc::new(handler))
    }

    /// Register a handler object under a routing key.
    pub fn register_handler(
        &self,
        key: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> RegistrationId {
        let id = RegistrationId::new();
        let key = key.into();
        let name = handler.name().to_string();

        {
            let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
            routes
                .entry(key.clone())
                .or_default()
                .push(Registration { id, handler });
        }

        debug!(registration_id = %id, routing_key = %key, handler_name = %name, "Handler registered");
        id
    }

    /// Remove a registration.
    ///
    /// Returns `true` if it was found and removed.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        // The removed handler is dropped after the write lock is released,
        // so a handler whose Drop dispatches cannot deadlock.
        let removed = {
            let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
            let mut removed = None;
            routes.retain(|_, regs| {
                if let Some(pos) = regs.iter().position(|r| r.id == id) {
                    removed = Some(regs.remove(pos));
                }
                !regs.is_empty()
            });
            removed
        };

        if removed.is_some() {
            debug!(registration_id = %id, "Handler unregistered");
        }
        removed.is_some()
    }

    /// Deliver one event to every matching handler, catching handler panics.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &Event) -> usize {
        self.dispatch_with(event, true)
    }

    /// Deliver one event, optionally letting handler panics unwind.
    ///
    /// Panic isolation is chosen per call so that monitors sharing one
    /// registry each apply their own setting.
    ///
    /// # Panics
    ///
    /// Panics if a handler panics while `isolate_panics` is `false`.
    pub fn dispatch_with(&self, event: &Event, isolate_panics: bool) -> usize {
        if let Some(filter) = &self.filter
            && !filter.test(event)
        {
            trace!(kind = %event.kind(), action = %event.action(), "Event rejected by filter");
            return 0;
        }

        let key = self.key_extractor.key(event);
        let targets: Vec<Registration> = {
            let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
            match routes.get(&key) {
                Some(regs) => regs.clone(),
                None => {
                    trace!(routing_key = %key, "No handlers for routing key");
                    return 0;
                },
            }
        };

        let mut invoked: usize = 0;
        for reg in &targets {
            if !reg.handler.accepts(event) {
                continue;
            }
            trace!(
                handler_name = %reg.handler.name(),
                routing_key = %key,
                kind = %event.kind(),
                action = %event.action(),
                "Dispatching event"
            );
            invoked = invoked.saturating_add(1);

            if !isolate_panics {
                reg.handler.on_event(event);
                continue;
            }

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                reg.handler.on_event(event);
            }));
            if let Err(e) = result {
                warn!(
                    registration_id = %reg.id,
                    handler_name = %reg.handler.name(),
                    error = ?e,
                    "Handler panicked"
                );
            }
        }
        invoked
    }

    /// Number of registrations across all keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Number of registrations under one routing key.
    #[must_use]
    pub fn handlers_for(&self, key: &str) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, Vec::len)
    }

    /// Remove every registration.
    pub fn clear(&self) {
        let drained = std::mem::take(
            &mut *self.routes.write().unwrap_or_else(PoisonError::into_inner),
        );
        drop(drained);
        debug!("All handlers cleared");
    }
}
