//! Monitor: ties an event source, a decoder and a handler registry together.

use std::sync::Arc;

use eventmon_core::{Event, EventSource, SubscriptionOptions};
use tokio_util::sync::CancellationToken;

use crate::decoder::{EventDecoder, JsonDecoder};
use crate::handler::{ConstantKey, EventHandler, KeyExtractor, Predicate};
use crate::registry::{HandlerRegistry, RegistrationId};
use crate::run::{MonitorRun, RunContext, launch};

/// Default monitor name used in logs.
pub const DEFAULT_MONITOR_NAME: &str = "eventmon";

/// Runtime settings of a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Name attached to every log line of this monitor's runs.
    pub name: String,
    /// Catch handler panics so one failing handler cannot stop the others.
    pub isolate_handler_panics: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MONITOR_NAME.to_string(),
            isolate_handler_panics: true,
        }
    }
}

impl MonitorConfig {
    /// Config with the given name and default settings otherwise.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Subscribes to an event source and fans decoded events out to handlers.
///
/// A monitor can be started several times; each [`start`](Self::start)
/// opens a fresh subscription and yields its own [`MonitorRun`]. All runs
/// share the monitor's handler registry.
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use eventmon_core::{Event, EventSource, SubscriptionOptions};
/// # use eventmon_monitor::{KindIs, Monitor};
/// # use tokio_util::sync::CancellationToken;
/// # async fn example(source: Arc<dyn EventSource>) {
/// let cancel = CancellationToken::new();
/// let run = Monitor::subscribe_all(
///     source,
///     SubscriptionOptions::new().filter("type", "container"),
///     Some(KindIs("container".into())),
///     |event: &Event| println!("{} {}", event.action(), event.actor_id()),
///     cancel.clone(),
/// )
/// .await;
///
/// cancel.cancel();
/// assert!(run.await.is_ok());
/// # }
/// ```
pub struct Monitor {
    source: Arc<dyn EventSource>,
    registry: Arc<HandlerRegistry>,
    decoder: Arc<dyn EventDecoder>,
    config: MonitorConfig,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Monitor with a catch-all routing key, no filter and the JSON decoder.
    #[must_use]
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self::builder(source).build()
    }

    /// Start configuring a monitor.
    #[must_use]
    pub fn builder(source: Arc<dyn EventSource>) -> MonitorBuilder {
        MonitorBuilder::new(source)
    }

    /// Subscribe and deliver every event accepted by `filter` to `callback`.
    ///
    /// Returns once the subscription attempt has completed, with the handle
    /// that yields the run's terminal result.
    pub async fn subscribe_all<P, F>(
        source: Arc<dyn EventSource>,
        options: SubscriptionOptions,
        filter: Option<P>,
        callback: F,
        cancel: CancellationToken,
    ) -> MonitorRun
    where
        P: Predicate + 'static,
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut builder = Self::builder(source).key_extractor(ConstantKey::default());
        if let Some(filter) = filter {
            builder = builder.filter(filter);
        }
        let monitor = builder.build();
        monitor.register(String::new(), None::<fn(&Event) -> bool>, callback);
        monitor.start(options, cancel).await
    }

    /// The registry shared by all runs of this monitor.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Runtime settings.
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Register a callback under a routing key.
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
        self.registry.register(key, predicate, callback)
    }

    /// Register a handler object under a routing key.
    pub fn register_handler(
        &self,
        key: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> RegistrationId {
        self.registry.register_handler(key, handler)
    }

    /// Remove a registration.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        self.registry.unregister(id)
    }

    /// Open a subscription and start delivering events.
    ///
    /// Blocks until the subscription attempt has completed (successfully or
    /// not), without waiting for the first event. The run stops when
    /// `cancel` fires, the feed ends, or an error occurs.
    ///
    /// Handlers run synchronously on a thread of tokio's blocking pool, which
    /// the run holds until it ends, idle or not. Long-lived runs therefore
    /// count against the runtime's `max_blocking_threads`.
    pub async fn start(
        &self,
        options: SubscriptionOptions,
        cancel: CancellationToken,
    ) -> MonitorRun {
        let ctx = RunContext {
            name: self.config.name.clone(),
            source: Arc::clone(&self.source),
            decoder: Arc::clone(&self.decoder),
            registry: Arc::clone(&self.registry),
            isolate_panics: self.config.isolate_handler_panics,
            options,
        };
        launch(ctx, cancel).await
    }
}

/// Builder for [`Monitor`].
pub struct MonitorBuilder {
    source: Arc<dyn EventSource>,
    key_extractor: Arc<dyn KeyExtractor>,
    filter: Option<Arc<dyn Predicate>>,
    decoder: Arc<dyn EventDecoder>,
    registry: Option<Arc<HandlerRegistry>>,
    config: MonitorConfig,
}

impl std::fmt::Debug for MonitorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorBuilder")
            .field("config", &self.config)
            .field("has_filter", &self.filter.is_some())
            .field("shared_registry", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

impl MonitorBuilder {
    fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            key_extractor: Arc::new(ConstantKey::default()),
            filter: None,
            decoder: Arc::new(JsonDecoder),
            registry: None,
            config: MonitorConfig::default(),
        }
    }

    /// Routing-key function for the monitor's registry.
    #[must_use]
    pub fn key_extractor<K>(mut self, key_extractor: K) -> Self
    where
        K: KeyExtractor + 'static,
    {
        self.key_extractor = Arc::new(key_extractor);
        self
    }

    /// Top-level filter applied before routing.
    #[must_use]
    pub fn filter<P>(mut self, filter: P) -> Self
    where
        P: Predicate + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Decoder for raw messages.
    #[must_use]
    pub fn decoder<D>(mut self, decoder: D) -> Self
    where
        D: EventDecoder + 'static,
    {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Use an existing registry. Overrides `key_extractor` and `filter`.
    ///
    /// Panic isolation still follows this monitor's [`MonitorConfig`].
    #[must_use]
    pub fn registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Runtime settings.
    #[must_use]
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the monitor.
    #[must_use]
    pub fn build(self) -> Monitor {
        let registry = self.registry.unwrap_or_else(|| {
            Arc::new(HandlerRegistry::from_parts(self.key_extractor, self.filter))
        });
        Monitor {
            source: self.source,
            registry,
            decoder: self.decoder,
            config: self.config,
        }
    }
}
