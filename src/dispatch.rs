//! Command dispatcher.
//!
//! One dispatcher is shared by all client connections. For each received
//! line it selects the first matching plugin and runs it against the shared
//! device registry. Each connection handles at most one command at a time
//! (the server's per-connection loop awaits `handle` before reading the
//! next line), while commands on different connections run concurrently.
//!
//! Command-level failures never tear a session down: they are converted to
//! a defined single-line error response and the connection stays usable.

use crate::command::PluginRegistry;
use crate::device::DeviceRegistry;
use bytes::Bytes;
use log::{debug, warn};
use std::sync::Arc;

/// Response for a line no registered plugin matched.
pub const UNKNOWN_COMMAND_RESPONSE: &[u8] = b"error: unknown command";

/// Response for a line that could not be interpreted (e.g. invalid UTF-8).
pub const MALFORMED_COMMAND_RESPONSE: &[u8] = b"error: malformed command";

/// Matches incoming command lines to plugins and executes them.
pub struct Dispatcher {
    plugins: PluginRegistry,
    devices: Arc<DeviceRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over the given plugins and devices.
    pub fn new(plugins: PluginRegistry, devices: Arc<DeviceRegistry>) -> Self {
        Self { plugins, devices }
    }

    /// The shared device registry.
    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    /// Handle one received command line and produce the response line.
    ///
    /// The line is trimmed before matching; matching is case-sensitive on
    /// the trimmed bytes. Device errors raised during execution are logged
    /// and reported as an `error: ...` line, never as a command result.
    pub async fn handle(&self, raw_command: &[u8]) -> Bytes {
        let line = raw_command.trim_ascii();

        if std::str::from_utf8(line).is_err() {
            warn!("Received a non-UTF-8 command line ({} bytes)", line.len());
            return Bytes::from_static(MALFORMED_COMMAND_RESPONSE);
        }

        let Some(plugin) = self.plugins.find(line) else {
            debug!(
                "No plugin matched command {:?}",
                String::from_utf8_lossy(line)
            );
            return Bytes::from_static(UNKNOWN_COMMAND_RESPONSE);
        };

        match plugin.execute(line, &self.devices).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Command '{}' failed: {}", plugin.name(), e);
                Bytes::from(format!("error: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;

    #[test]
    fn test_malformed_sentinel_matches_error_rendering() {
        // A plugin raising MalformedCommand goes through the generic
        // `error: {cause}` path; clients must see the same line as for a
        // non-decodable input.
        let rendered = format!("error: {}", ServerError::MalformedCommand);
        assert_eq!(rendered.as_bytes(), MALFORMED_COMMAND_RESPONSE);
    }
}
