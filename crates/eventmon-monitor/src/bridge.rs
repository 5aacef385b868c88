//! Conversions from configuration sections into monitor settings.
//!
//! The config crate has no dependency on the monitor; the mapping between
//! the two lives here, at the integration boundary.

use eventmon_config::{Config, MonitorSection, SubscriptionSection};
use eventmon_core::{Filters, SubscriptionOptions};

use crate::monitor::MonitorConfig;

impl From<&MonitorSection> for MonitorConfig {
    fn from(section: &MonitorSection) -> Self {
        Self {
            name: section.name.clone(),
            isolate_handler_panics: section.isolate_handler_panics,
        }
    }
}

/// Build subscription options from the `[subscription]` section.
#[must_use]
pub fn subscription_options(section: &SubscriptionSection) -> SubscriptionOptions {
    let filters: Filters = section
        .filters
        .iter()
        .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
        .collect();

    SubscriptionOptions {
        since: section.since.clone(),
        until: section.until.clone(),
        filters,
    }
}

/// Monitor settings and subscription options from a loaded config.
#[must_use]
pub fn from_config(config: &Config) -> (MonitorConfig, SubscriptionOptions) {
    (
        MonitorConfig::from(&config.monitor),
        subscription_options(&config.subscription),
    )
}
