//! The `is_rs_devices?` command.

use crate::command::CommandPlugin;
use crate::device::DeviceRegistry;
use crate::error::AppResult;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;

/// Substring identifying a Rohde & Schwarz instrument in an uppercased
/// `*IDN?` response.
const VENDOR_MARKER: &str = "ROHDE";

/// Answers whether every attached device is a Rohde & Schwarz instrument.
///
/// Devices are identified with `*IDN?` in ascending name order. The scan
/// stops at the first device whose identification string lacks the vendor
/// marker; devices after it are never queried. An empty registry answers
/// `true` (vacuous truth; the original server behaved the same way).
///
/// A device query failure aborts the whole command: the universal claim
/// cannot be made when any device could not be asked.
pub struct IsRsDevices;

#[async_trait]
impl CommandPlugin for IsRsDevices {
    fn name(&self) -> &str {
        "is_rs_devices"
    }

    fn is_match(&self, raw_command: &[u8]) -> bool {
        raw_command.trim_ascii() == b"is_rs_devices?"
    }

    async fn execute(&self, _raw: &[u8], devices: &DeviceRegistry) -> AppResult<Bytes> {
        for (name, device) in devices.iter() {
            let response = device.query(b"*IDN?\n").await?;
            let id_string = String::from_utf8_lossy(&response)
                .trim()
                .to_ascii_uppercase();
            if !id_string.contains(VENDOR_MARKER) {
                debug!("Device '{}' is not an R&S instrument: {}", name, id_string);
                return Ok(Bytes::from_static(b"false"));
            }
        }
        Ok(Bytes::from_static(b"true"))
    }
}
