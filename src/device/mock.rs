//! A mock device with a scripted identification response.
//!
//! Used by tests and by `type = "mock"` configuration entries to run the
//! server without physical hardware. The mock counts the queries it
//! receives, which lets tests assert that registry scans really stop at the
//! first mismatching device.

use crate::device::Device;
use crate::error::{AppResult, ServerError};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Failure injected into every query of a [`MockDevice`].
#[derive(Clone, Copy, Debug)]
pub enum MockFailure {
    /// Report a query timeout after the given duration.
    Timeout(Duration),
    /// Report a disconnected transport.
    Unavailable,
}

/// Simulated instrument answering `*IDN?` with a fixed string.
pub struct MockDevice {
    name: String,
    identity: String,
    query_count: AtomicUsize,
    failure: Option<MockFailure>,
}

impl MockDevice {
    /// Create a mock that identifies itself with `identity`.
    pub fn new(name: String, identity: String) -> Self {
        Self {
            name,
            identity,
            query_count: AtomicUsize::new(0),
            failure: None,
        }
    }

    /// Create a mock whose every query fails with the given failure.
    pub fn failing(name: String, failure: MockFailure) -> Self {
        Self {
            name,
            identity: String::new(),
            query_count: AtomicUsize::new(0),
            failure: Some(failure),
        }
    }

    /// Number of queries this device has received, failed ones included.
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Device for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, request: &[u8]) -> AppResult<Bytes> {
        self.query_count.fetch_add(1, Ordering::SeqCst);

        match self.failure {
            Some(MockFailure::Timeout(timeout)) => {
                return Err(ServerError::DeviceTimeout {
                    device: self.name.clone(),
                    timeout,
                })
            }
            Some(MockFailure::Unavailable) => {
                return Err(ServerError::DeviceUnavailable {
                    device: self.name.clone(),
                })
            }
            None => {}
        }

        if request.trim_ascii() == b"*IDN?" {
            Ok(Bytes::from(format!("{}\n", self.identity)))
        } else {
            // Real instruments push unknown queries onto an error queue;
            // a flat error line is close enough for a simulator.
            Ok(Bytes::from_static(b"ERROR\n"))
        }
    }
}
