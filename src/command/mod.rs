//! Command plugins and their registry.
//!
//! Every supported command is one [`CommandPlugin`]: a predicate deciding
//! whether a received line belongs to it, and an executor that may query
//! attached devices and returns the single-line answer. Plugins are
//! registered explicitly at startup; the dispatcher picks the first
//! registered plugin whose predicate matches.

use crate::device::DeviceRegistry;
use crate::error::AppResult;
use async_trait::async_trait;
use bytes::Bytes;

pub mod idn;
pub mod is_rs_devices;
pub mod registry;

pub use idn::{Identify, ListDevices};
pub use is_rs_devices::IsRsDevices;
pub use registry::PluginRegistry;

/// One supported command.
///
/// Plugins are stateless across invocations. `is_match` is a pure
/// predicate: it is called speculatively against every registered plugin
/// for every incoming line and must not have side effects. `execute` may
/// query devices but never mutates the registry, and must propagate device
/// failures instead of folding them into a negative answer.
#[async_trait]
pub trait CommandPlugin: Send + Sync {
    /// Short plugin name, used in log output.
    fn name(&self) -> &str;

    /// Whether this plugin handles `raw_command` (already trimmed).
    fn is_match(&self, raw_command: &[u8]) -> bool;

    /// Run the command against the attached devices.
    async fn execute(&self, raw_command: &[u8], devices: &DeviceRegistry) -> AppResult<Bytes>;
}
