//! Typed event values delivered to handlers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The object an event is about (a container, an image, a network...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identifier of the object.
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Free-form attributes such as `name`, `image` or labels.
    #[serde(rename = "Attributes", default)]
    pub attributes: BTreeMap<String, String>,
}

/// One occurrence in the remote system.
///
/// The field names follow the container engine's event message so a raw
/// message from the feed decodes into this type without translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Category, e.g. `container`, `image`, `network`, `volume`, `daemon`.
    #[serde(rename = "Type", default)]
    pub kind: String,
    /// What happened, e.g. `start`, `die`, `pull`.
    #[serde(rename = "Action", default)]
    pub action: String,
    /// Object the event is about.
    #[serde(rename = "Actor", default)]
    pub actor: Actor,
    /// `local` or `swarm`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Unix time in seconds.
    #[serde(default)]
    pub time: i64,
    /// Unix time in nanoseconds.
    #[serde(rename = "timeNano", default)]
    pub time_nano: i64,
    /// Deprecated status field, mirrors `action` on older feeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Deprecated id field, mirrors `actor.id` on older feeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Deprecated origin field (image name for container events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl Event {
    /// Create an event of the given kind and action.
    #[must_use]
    pub fn new(kind: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    /// Set the actor id.
    #[must_use]
    pub fn with_actor_id(mut self, id: impl Into<String>) -> Self {
        self.actor.id = id.into();
        self
    }

    /// Add an actor attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.actor.attributes.insert(key.into(), value.into());
        self
    }

    /// Set the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set both timestamps from a UTC instant.
    #[must_use]
    pub fn with_time(mut self, at: DateTime<Utc>) -> Self {
        self.time = at.timestamp();
        self.time_nano = at.timestamp_nanos_opt().unwrap_or_default();
        self
    }

    /// Event category.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Event action.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Id of the object the event is about.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        &self.actor.id
    }

    /// Look up an actor attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.actor.attributes.get(key).map(String::as_str)
    }

    /// When the event happened.
    ///
    /// Uses the nanosecond timestamp when present and falls back to seconds.
    /// Returns `None` when the feed did not stamp the event.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if self.time_nano != 0 {
            return Some(DateTime::from_timestamp_nanos(self.time_nano));
        }
        if self.time != 0 {
            return DateTime::from_timestamp(self.time, 0);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let event = Event::new("container", "start")
            .with_actor_id("abc")
            .with_attribute("name", "web")
            .with_scope("local");

        assert_eq!(event.kind(), "container");
        assert_eq!(event.action(), "start");
        assert_eq!(event.actor_id(), "abc");
        assert_eq!(event.attribute("name"), Some("web"));
        assert_eq!(event.attribute("image"), None);
        assert_eq!(event.scope.as_deref(), Some("local"));
    }

    #[test]
    fn test_deserialize_engine_message() {
        let value = json!({
            "status": "start",
            "id": "abc",
            "from": "nginx:latest",
            "Type": "container",
            "Action": "start",
            "Actor": {
                "ID": "abc",
                "Attributes": { "image": "nginx:latest", "name": "web" }
            },
            "scope": "local",
            "time": 1_700_000_000,
            "timeNano": 1_700_000_000_123_456_789_i64
        });

        let event: Event = serde_json::from_value(value).unwrap();
        assert_eq!(event.kind, "container");
        assert_eq!(event.action, "start");
        assert_eq!(event.attribute("image"), Some("nginx:latest"));
        assert_eq!(event.from.as_deref(), Some("nginx:latest"));
        assert_eq!(event.time, 1_700_000_000);
    }

    #[test]
    fn test_timestamp_prefers_nanos() {
        let event = Event {
            time: 1_700_000_000,
            time_nano: 1_700_000_000_500_000_000,
            ..Event::default()
        };
        let ts = event.timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_timestamp_falls_back_to_seconds() {
        let event = Event {
            time: 1_700_000_000,
            ..Event::default()
        };
        assert_eq!(event.timestamp().unwrap().timestamp(), 1_700_000_000);
        assert!(Event::default().timestamp().is_none());
    }

    #[test]
    fn test_with_time_sets_both_fields() {
        let at = DateTime::from_timestamp(1_700_000_000, 42).unwrap();
        let event = Event::new("image", "pull").with_time(at);
        assert_eq!(event.time, 1_700_000_000);
        assert_eq!(event.timestamp(), Some(at));
    }

    #[test]
    fn test_serialize_skips_missing_legacy_fields() {
        let json = serde_json::to_value(Event::new("network", "connect")).unwrap();
        assert_eq!(json["Type"], "network");
        assert!(json.get("status").is_none());
        assert!(json.get("scope").is_none());
    }
}
