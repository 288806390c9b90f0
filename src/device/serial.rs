//! RS-232 device transport.
//!
//! Wraps the `serialport` crate and runs the blocking reads on Tokio's
//! blocking executor. The caller frames the request (terminator included);
//! responses are read byte-wise until `\n` under the query deadline.

use crate::device::Device;
use crate::error::{AppResult, ServerError};
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Device handle over a serial port.
pub struct SerialDevice {
    name: String,
    timeout: Duration,
    port: Arc<Mutex<Box<dyn SerialPort>>>,
}

impl SerialDevice {
    /// Open `port_name` at `baud_rate`.
    pub fn open(
        name: String,
        port_name: &str,
        baud_rate: u32,
        query_timeout: Duration,
    ) -> AppResult<Self> {
        let port = serialport::new(port_name, baud_rate)
            // Short internal timeout; the overall deadline is enforced in query().
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| {
                ServerError::Configuration(format!(
                    "failed to open serial port '{}' at {} baud: {}",
                    port_name, baud_rate, e
                ))
            })?;

        debug!("Device '{}' opened {} at {} baud", name, port_name, baud_rate);
        Ok(Self {
            name,
            timeout: query_timeout,
            port: Arc::new(Mutex::new(port)),
        })
    }
}

#[async_trait]
impl Device for SerialDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, request: &[u8]) -> AppResult<Bytes> {
        let port = self.port.clone();
        let request = request.to_vec();
        let name = self.name.clone();
        let deadline = self.timeout;

        // Serial I/O is blocking; run the whole exchange on a blocking thread.
        tokio::task::spawn_blocking(move || -> AppResult<Bytes> {
            let mut port = port.blocking_lock();

            port.write_all(&request)
                .and_then(|()| port.flush())
                .map_err(|_| ServerError::DeviceUnavailable {
                    device: name.clone(),
                })?;

            let mut response = Vec::new();
            let mut buffer = [0u8; 1];
            let start = Instant::now();

            loop {
                if start.elapsed() > deadline {
                    return Err(ServerError::DeviceTimeout {
                        device: name,
                        timeout: deadline,
                    });
                }

                match port.read(&mut buffer) {
                    Ok(1) => {
                        response.push(buffer[0]);
                        if buffer[0] == b'\n' {
                            break;
                        }
                    }
                    Ok(_) => {
                        return Err(ServerError::DeviceUnavailable { device: name });
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        // Port-level timeout is shorter than the deadline.
                        continue;
                    }
                    Err(_) => {
                        return Err(ServerError::DeviceUnavailable { device: name });
                    }
                }
            }

            Ok(Bytes::from(response))
        })
        .await
        .map_err(|e| ServerError::Io(std::io::Error::other(e)))?
    }
}
