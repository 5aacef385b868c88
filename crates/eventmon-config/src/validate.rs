//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted values for `logging.level`.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
/// Accepted values for `logging.format`.
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];
/// Accepted values for `logging.target`.
const LOG_TARGETS: &[&str] = &["stdout", "stderr", "file"];

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_monitor(config)?;
    validate_subscription(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_monitor(config: &Config) -> ConfigResult<()> {
    if config.monitor.name.trim().is_empty() {
        return Err(invalid("monitor.name", "must not be empty"));
    }
    Ok(())
}

fn validate_subscription(config: &Config) -> ConfigResult<()> {
    let s = &config.subscription;

    for (name, values) in &s.filters {
        if name.trim().is_empty() {
            return Err(invalid("subscription.filters", "filter names must not be empty"));
        }
        if values.iter().any(|v| v.trim().is_empty()) {
            return Err(invalid(
                format!("subscription.filters.{name}"),
                "filter values must not be empty",
            ));
        }
    }

    // Relative durations ("10m") are left to the event source.
    if let (Some(since), Some(until)) = (&s.since, &s.until)
        && let (Ok(since), Ok(until)) = (since.parse::<i64>(), until.parse::<i64>())
        && since > until
    {
        return Err(invalid(
            "subscription.until",
            format!("until ({until}) is earlier than since ({since})"),
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if !LOG_FORMATS.contains(&l.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }

    if !LOG_TARGETS.contains(&l.target.as_str()) {
        return Err(invalid(
            "logging.target",
            format!(
                "unsupported target '{}'; expected one of: {}",
                l.target,
                LOG_TARGETS.join(", ")
            ),
        ));
    }

    if l.target == "file" && l.directory.as_deref().is_none_or(|d| d.trim().is_empty()) {
        return Err(invalid(
            "logging.directory",
            "a log directory is required when target is 'file'",
        ));
    }

    if l.directives.iter().any(|d| d.trim().is_empty()) {
        return Err(invalid("logging.directives", "directives must not be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_monitor_name() {
        let mut config = Config::default();
        config.monitor.name = "  ".to_owned();
        assert_eq!(field_of(validate(&config)), "monitor.name");
    }

    #[test]
    fn test_empty_filter_value() {
        let mut config = Config::default();
        config
            .subscription
            .filters
            .insert("type".to_owned(), vec![String::new()]);
        assert_eq!(field_of(validate(&config)), "subscription.filters.type");
    }

    #[test]
    fn test_since_after_until() {
        let mut config = Config::default();
        config.subscription.since = Some("1700003600".to_owned());
        config.subscription.until = Some("1700000000".to_owned());
        assert_eq!(field_of(validate(&config)), "subscription.until");
    }

    #[test]
    fn test_relative_range_is_not_compared() {
        let mut config = Config::default();
        config.subscription.since = Some("10m".to_owned());
        config.subscription.until = Some("1700000000".to_owned());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");
    }

    #[test]
    fn test_file_target_requires_directory() {
        let mut config = Config::default();
        config.logging.target = "file".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.directory");

        config.logging.directory = Some("/var/log/eventmon".to_owned());
        assert!(validate(&config).is_ok());
    }
}
