//! Application configuration.
//!
//! Settings are loaded in three layers: built-in defaults, an optional TOML
//! file, and environment variables prefixed with `INSTRUMENT_SERVER__`.
//! Device attachment is configuration-driven: every `[devices.<name>]` table
//! declares one instrument and the transport used to reach it.
//!
//! # Example
//!
//! ```toml
//! [server]
//! listen_addr = "127.0.0.1:9000"
//! query_timeout = "3s"
//!
//! [devices.osc1]
//! type = "tcp"
//! address = "192.168.1.20:5025"
//!
//! [devices.gen1]
//! type = "serial"
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! ```

use crate::error::AppResult;
use crate::error::ServerError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Top-level application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server socket and timeout settings.
    pub server: ServerSettings,
    /// Devices to attach at startup, keyed by device name.
    #[serde(default)]
    pub devices: HashMap<String, DeviceSettings>,
}

/// Listener and query-timeout settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Address the command server listens on.
    pub listen_addr: String,
    /// Per-query bound on instrument reads. An unresponsive device is
    /// reported as a timeout instead of hanging the command.
    #[serde(with = "humantime_serde")]
    pub query_timeout: Duration,
}

/// Transport declaration for one attached device.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceSettings {
    /// SCPI-over-TCP instrument (raw socket, newline-framed responses).
    Tcp {
        /// Instrument address, e.g. `192.168.1.20:5025`.
        address: String,
    },
    /// RS-232 instrument. Requires the `instrument_serial` feature.
    Serial {
        /// Serial port path, e.g. `/dev/ttyUSB0` or `COM3`.
        port: String,
        /// Communication speed, e.g. 9600 or 115200.
        baud_rate: u32,
    },
    /// Simulated instrument answering `*IDN?` with a fixed string.
    Mock {
        /// Identification string returned to `*IDN?`.
        identity: String,
    },
}

impl Settings {
    /// Load settings from defaults, an optional TOML file, and the
    /// environment (`INSTRUMENT_SERVER__SERVER__LISTEN_ADDR=...`).
    pub fn new(path: Option<&Path>) -> AppResult<Self> {
        let mut builder = Config::builder()
            .set_default("server.listen_addr", "127.0.0.1:9000")?
            .set_default("server.query_timeout", "3s")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("INSTRUMENT_SERVER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate values that parse but may still be logically invalid.
    fn validate(&self) -> AppResult<()> {
        self.server
            .listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| {
                ServerError::Configuration(format!(
                    "invalid listen_addr '{}': {}",
                    self.server.listen_addr, e
                ))
            })?;

        if self.server.query_timeout.is_zero() {
            return Err(ServerError::Configuration(
                "query_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
