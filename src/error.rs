//! Custom error types for the application.
//!
//! This module defines the primary error type, `ServerError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of failures the server can
//! encounter, from configuration problems to instrument communication faults.
//!
//! ## Error Hierarchy
//!
//! `ServerError` consolidates the main error sources:
//!
//! - **`Config`**: Wraps errors from the `config` crate, typically file
//!   parsing or format issues in the configuration files.
//! - **`Configuration`**: Semantic errors in the configuration, such as
//!   values that parse but are logically invalid.
//! - **`Io`**: Wraps standard `std::io::Error`, covering socket and
//!   transport I/O issues.
//! - **`DeviceUnavailable` / `DeviceTimeout`**: Instrument query failures.
//!   These propagate unmodified through command execution; aggregation
//!   commands must fail as a whole when any device query fails instead of
//!   treating the failure as a negative answer.
//! - **`MalformedCommand`**: A received line that cannot be interpreted
//!   (for example an encoding error). Recovered locally by the dispatcher.
//!
//! By using `#[from]`, `ServerError` can be seamlessly created from the
//! underlying error types, simplifying error handling throughout the
//! application with the `?` operator.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device '{device}' unavailable")]
    DeviceUnavailable { device: String },

    #[error("Device '{device}' timed out after {timeout:?}")]
    DeviceTimeout { device: String, timeout: Duration },

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Device '{0}' already registered")]
    DuplicateDevice(String),

    // Rendered lowercase so the generic `error: {cause}` response line is
    // byte-identical to the dispatcher's malformed-command sentinel.
    #[error("malformed command")]
    MalformedCommand,

    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,
}
