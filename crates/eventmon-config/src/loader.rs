//! Config file discovery and layered loading.
//!
//! `Config::load()` works through these layers, later ones winning:
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge `~/.eventmon/config.toml` (user)
//! 3. Merge the explicitly requested file, if any
//! 4. Apply `EVENTMON_*` environment overrides
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Environment variables that override single config fields.
const ENV_OVERRIDES: &[(&str, &str, &str)] = &[
    ("EVENTMON_LOG_LEVEL", "logging", "level"),
    ("EVENTMON_LOG_FORMAT", "logging", "format"),
    ("EVENTMON_MONITOR_NAME", "monitor", "name"),
];

/// Load the configuration with layered precedence.
///
/// `path` is an explicit config file merged on top of the user file. Unlike
/// the user file it must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is unreadable or malformed,
/// or if the merged configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    let home = home_directory()?;
    load_with_home(path, &home.join(".eventmon"), &collect_env_vars())
}

/// Load with an explicit eventmon home directory and environment.
///
/// `eventmon_home` is the directory holding the user `config.toml`.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_home(
    path: Option<&Path>,
    eventmon_home: &Path,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let user_path = eventmon_home.join("config.toml");
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, &overlay);
        info!(path = %user_path.display(), "loaded user config");
    }

    if let Some(path) = path {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config file");
    }

    let overrides = apply_env_overrides(&mut merged, env_vars);
    if overrides > 0 {
        debug!(count = overrides, "applied environment overrides");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a single file (no layering, no env overrides).
///
/// Sections missing from the file take their defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, too large, malformed or
/// invalid.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;

    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Recursively merge `overlay` into `base`.
///
/// Tables merge per field; scalars and arrays from the overlay replace the
/// base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Snapshot the `EVENTMON_*` variables of the process environment.
fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("EVENTMON_"))
        .collect()
}

/// Write set, non-empty override variables into the merged tree.
///
/// Returns how many fields were overridden.
fn apply_env_overrides(merged: &mut toml::Value, env_vars: &HashMap<String, String>) -> usize {
    let Some(root) = merged.as_table_mut() else {
        return 0;
    };

    let mut applied = 0usize;
    for (var, section, field) in ENV_OVERRIDES {
        let Some(value) = env_vars.get(*var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let table = root
            .entry((*section).to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        if let Some(table) = table.as_table_mut() {
            table.insert((*field).to_owned(), toml::Value::String(value.clone()));
            debug!(var, section, field, "config field overridden from environment");
            applied = applied.saturating_add(1);
        }
    }
    applied
}

/// Read and parse a TOML file, returning `None` if it doesn't exist.
///
/// Reads once and checks the size afterwards, so there is no stat/read race.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len(),
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
