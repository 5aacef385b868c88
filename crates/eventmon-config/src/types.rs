//! Configuration types.
//!
//! These types carry no dependency on the other eventmon crates; conversion
//! into monitor and telemetry settings happens in those crates. Every struct
//! implements [`Default`] so a bare `[section]` header yields a working
//! configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Monitor runtime settings.
    pub monitor: MonitorSection,
    /// What to subscribe to.
    pub subscription: SubscriptionSection,
    /// Logging level, format and target.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// MonitorSection
// ---------------------------------------------------------------------------

/// Monitor runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// Name attached to the monitor's log lines.
    pub name: String,
    /// Catch handler panics instead of letting them stop the dispatcher.
    pub isolate_handler_panics: bool,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            name: "eventmon".to_owned(),
            isolate_handler_panics: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SubscriptionSection
// ---------------------------------------------------------------------------

/// Time range and server-side filters of the subscription.
///
/// ```toml
/// [subscription]
/// since = "1700000000"
/// filters = { type = ["container"], event = ["start", "die"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionSection {
    /// Start of the time range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    /// End of the time range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    /// Filter name → accepted values.
    pub filters: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`).
    pub level: String,
    /// `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// `"stdout"`, `"stderr"` or `"file"`.
    pub target: String,
    /// Log directory, required when `target = "file"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Per-crate directives, e.g. `["eventmon_monitor=debug"]`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            target: "stderr".to_owned(),
            directory: None,
            directives: Vec::new(),
        }
    }
}
