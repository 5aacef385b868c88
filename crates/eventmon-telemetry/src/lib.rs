//! Logging setup for eventmon.
//!
//! Builds a `tracing-subscriber` stack from a [`LogConfig`]: an `EnvFilter`
//! plus one formatting layer (pretty, compact, JSON or full) writing to
//! stdout, stderr or rolling files.
//!
//! # Example
//!
//! ```rust,no_run
//! use eventmon_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), eventmon_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("eventmon_monitor=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```
//!
//! With the default `config` feature, a loaded `[logging]` section converts
//! directly: `LogConfig::from(&config.logging)`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
