//! SCPI-over-TCP device transport.
//!
//! Many bench instruments expose a raw socket (conventionally port 5025)
//! that speaks newline-framed SCPI. This transport writes the framed
//! request as-is and reads one `\n`-terminated response line.

use crate::device::Device;
use crate::error::{AppResult, ServerError};
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Device handle over a raw TCP socket.
///
/// The stream sits behind a mutex so at most one query is outstanding at a
/// time; a second connection querying the same device waits for the first
/// exchange to finish.
pub struct TcpDevice {
    name: String,
    address: String,
    timeout: Duration,
    stream: Mutex<Option<BufReader<TcpStream>>>,
}

impl TcpDevice {
    /// Connect to the instrument at `address`.
    ///
    /// The connection attempt itself is bounded by the query timeout.
    pub async fn connect(name: String, address: &str, query_timeout: Duration) -> AppResult<Self> {
        let stream = timeout(query_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| ServerError::DeviceTimeout {
                device: name.clone(),
                timeout: query_timeout,
            })??;

        debug!("Device '{}' connected to {}", name, address);
        Ok(Self {
            name,
            address: address.to_string(),
            timeout: query_timeout,
            stream: Mutex::new(Some(BufReader::new(stream))),
        })
    }

    /// Instrument address this device was attached with.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Device for TcpDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, request: &[u8]) -> AppResult<Bytes> {
        let mut guard = self.stream.lock().await;
        let stream = guard
            .as_mut()
            .ok_or_else(|| ServerError::DeviceUnavailable {
                device: self.name.clone(),
            })?;

        let exchange = async {
            stream.get_mut().write_all(request).await?;
            let mut line = Vec::new();
            let n = stream.read_until(b'\n', &mut line).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by instrument",
                ));
            }
            Ok::<_, io::Error>(line)
        };

        match timeout(self.timeout, exchange).await {
            Ok(Ok(line)) => Ok(Bytes::from(line)),
            Ok(Err(e)) => {
                warn!("Device '{}' transport error: {}", self.name, e);
                *guard = None;
                Err(ServerError::DeviceUnavailable {
                    device: self.name.clone(),
                })
            }
            Err(_) => {
                // A reply arriving after the deadline would desynchronize
                // framing, so the connection is dropped as well.
                warn!(
                    "Device '{}' did not answer within {:?}",
                    self.name, self.timeout
                );
                *guard = None;
                Err(ServerError::DeviceTimeout {
                    device: self.name.clone(),
                    timeout: self.timeout,
                })
            }
        }
    }
}
