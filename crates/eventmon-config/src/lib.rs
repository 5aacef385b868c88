#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for eventmon.
//!
//! # Usage
//!
//! ```rust,no_run
//! use eventmon_config::Config;
//!
//! // defaults → ~/.eventmon/config.toml → ./monitor.toml → EVENTMON_* env
//! let config = Config::load(Some(std::path::Path::new("monitor.toml"))).unwrap();
//! println!("monitor name: {}", config.monitor.name);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment** (`EVENTMON_LOG_LEVEL`, `EVENTMON_LOG_FORMAT`, `EVENTMON_MONITOR_NAME`)
//! 2. **Explicit file** passed to [`Config::load`]
//! 3. **User** (`~/.eventmon/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other eventmon crates. Conversion into
//! monitor and logging settings lives in `eventmon-monitor` and
//! `eventmon-telemetry`.

/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Load configuration with an explicit eventmon home directory and a
    /// given set of environment variables instead of the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(
        path: Option<&std::path::Path>,
        eventmon_home: &std::path::Path,
        env_vars: &std::collections::HashMap<String, String>,
    ) -> ConfigResult<Self> {
        loader::load_with_home(path, eventmon_home, env_vars)
    }

    /// Load configuration from a single file, without layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
