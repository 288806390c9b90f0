//! Device abstraction and registry.
//!
//! A [`Device`] is a handle to one attached instrument, reachable through a
//! request/response `query` call. The transport behind the handle (TCP
//! socket, RS-232, a mock) is invisible to command plugins: they see only
//! bytes in, bytes out.
//!
//! Devices are attached once at startup from configuration and the registry
//! membership is fixed for the server's lifetime. All connections share the
//! registry read-only while commands execute.

use crate::config::{DeviceSettings, Settings};
use crate::error::{AppResult, ServerError};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod mock;
#[cfg(feature = "instrument_serial")]
pub mod serial;
pub mod tcp;

pub use mock::{MockDevice, MockFailure};
#[cfg(feature = "instrument_serial")]
pub use serial::SerialDevice;
pub use tcp::TcpDevice;

/// Handle to one attached instrument.
///
/// `query` is the only operation the command core needs: write a framed
/// request (the caller supplies the terminator the instrument protocol
/// requires, e.g. `*IDN?\n`), read one response. Implementations must
/// serialize access internally so that at most one query is outstanding per
/// device, even when commands on different connections reach the same
/// instrument.
#[async_trait]
pub trait Device: Send + Sync {
    /// Stable device name, unique within the registry.
    fn name(&self) -> &str;

    /// Issue one request and wait for the response.
    ///
    /// Fails with [`ServerError::DeviceUnavailable`] when the transport is
    /// disconnected and [`ServerError::DeviceTimeout`] when no response
    /// arrives within the configured per-query timeout.
    async fn query(&self, request: &[u8]) -> AppResult<Bytes>;
}

/// Named mapping of attached devices.
///
/// Backed by a `BTreeMap` so iteration is always ascending by device name.
/// Commands that scan the registry and exit early rely on this order being
/// deterministic.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, Arc<dyn Device>>,
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.names())
            .finish()
    }
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device under its own name.
    ///
    /// Fails if a device with the same name is already registered.
    pub fn insert(&mut self, device: Arc<dyn Device>) -> AppResult<()> {
        let name = device.name().to_string();
        if self.devices.contains_key(&name) {
            return Err(ServerError::DuplicateDevice(name));
        }
        self.devices.insert(name, device);
        Ok(())
    }

    /// Look up a device by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Device>> {
        self.devices.get(name)
    }

    /// Iterate over devices in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Device>)> {
        self.devices.iter().map(|(name, dev)| (name.as_str(), dev))
    }

    /// Registered device names, ascending.
    pub fn names(&self) -> Vec<&str> {
        self.devices.keys().map(String::as_str).collect()
    }

    /// Number of attached devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the registry has no devices.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Attach every device declared in the configuration.
///
/// TCP devices are connected eagerly so a misconfigured address fails at
/// startup rather than on the first command.
pub async fn build_registry(settings: &Settings) -> AppResult<DeviceRegistry> {
    let timeout = settings.server.query_timeout;
    let mut registry = DeviceRegistry::new();

    for (name, spec) in &settings.devices {
        let device: Arc<dyn Device> = match spec {
            DeviceSettings::Tcp { address } => {
                Arc::new(TcpDevice::connect(name.clone(), address, timeout).await?)
            }
            DeviceSettings::Serial { port, baud_rate } => {
                #[cfg(feature = "instrument_serial")]
                {
                    Arc::new(SerialDevice::open(name.clone(), port, *baud_rate, timeout)?)
                }
                #[cfg(not(feature = "instrument_serial"))]
                {
                    let _ = (port, baud_rate);
                    return Err(ServerError::SerialFeatureDisabled);
                }
            }
            DeviceSettings::Mock { identity } => {
                Arc::new(MockDevice::new(name.clone(), identity.clone()))
            }
        };
        registry.insert(device)?;
    }

    Ok(registry)
}
