//! Device introspection commands: `idn? <name>` and `devices?`.

use crate::command::CommandPlugin;
use crate::device::DeviceRegistry;
use crate::error::{AppResult, ServerError};
use async_trait::async_trait;
use bytes::Bytes;

/// Returns one device's identification string: `idn? <name>`.
pub struct Identify;

#[async_trait]
impl CommandPlugin for Identify {
    fn name(&self) -> &str {
        "idn"
    }

    fn is_match(&self, raw_command: &[u8]) -> bool {
        raw_command.trim_ascii().starts_with(b"idn? ")
    }

    async fn execute(&self, raw_command: &[u8], devices: &DeviceRegistry) -> AppResult<Bytes> {
        let line = std::str::from_utf8(raw_command.trim_ascii())
            .map_err(|_| ServerError::MalformedCommand)?;
        let device_name = line
            .split_whitespace()
            .nth(1)
            .ok_or(ServerError::MalformedCommand)?;

        let device = devices
            .get(device_name)
            .ok_or_else(|| ServerError::UnknownDevice(device_name.to_string()))?;

        let response = device.query(b"*IDN?\n").await?;
        Ok(Bytes::copy_from_slice(response.trim_ascii()))
    }
}

/// Lists the registered device names: `devices?`.
///
/// Reads the registry only; no device is queried.
pub struct ListDevices;

#[async_trait]
impl CommandPlugin for ListDevices {
    fn name(&self) -> &str {
        "devices"
    }

    fn is_match(&self, raw_command: &[u8]) -> bool {
        raw_command.trim_ascii() == b"devices?"
    }

    async fn execute(&self, _raw: &[u8], devices: &DeviceRegistry) -> AppResult<Bytes> {
        Ok(Bytes::from(devices.names().join(",")))
    }
}
