//! Byte transports to the device.
//!
//! Everything above this layer sees a device as a duplex byte stream: read a
//! chunk, write bytes, close. SSH and telnet both sit behind [`Transport`], and
//! [`ScriptedTransport`] stands in for a device in tests.

pub mod config;
pub mod probe;
pub mod scripted;
mod ssh;
mod telnet;

pub use config::{Protocol, SessionConfig};
pub use scripted::{ScriptHandle, ScriptStep, ScriptedTransport};
pub use ssh::SshTransport;
pub use telnet::TelnetTransport;

use std::future::Future;

use bytes::Bytes;

use crate::error::TransportError;

/// A duplex byte stream to a device.
pub trait Transport: Send {
    /// Wait for the next chunk of output.
    ///
    /// Returns `Ok(None)` on a clean end-of-stream. Implementations must be
    /// cancel safe: dropping the future loses no bytes that were not yet
    /// returned.
    fn read(&mut self) -> impl Future<Output = Result<Option<Bytes>, TransportError>> + Send;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the stream. Reads and writes afterwards fail.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Transport opened by [`Session::connect`](crate::Session::connect).
pub enum DeviceTransport {
    Ssh(SshTransport),
    Telnet(TelnetTransport),
}

impl DeviceTransport {
    /// Open the transport for `protocol`.
    pub async fn open(
        config: &SessionConfig,
        protocol: Protocol,
    ) -> Result<Self, TransportError> {
        match protocol {
            Protocol::Ssh => Ok(DeviceTransport::Ssh(SshTransport::connect(config).await?)),
            Protocol::Telnet => Ok(DeviceTransport::Telnet(
                TelnetTransport::connect(&config.host, config.port, config.timeout).await?,
            )),
        }
    }
}

impl Transport for DeviceTransport {
    async fn read(&mut self) -> Result<Option<Bytes>, TransportError> {
        match self {
            DeviceTransport::Ssh(t) => t.read().await,
            DeviceTransport::Telnet(t) => t.read().await,
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        match self {
            DeviceTransport::Ssh(t) => t.write(data).await,
            DeviceTransport::Telnet(t) => t.write(data).await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self {
            DeviceTransport::Ssh(t) => t.close().await,
            DeviceTransport::Telnet(t) => t.close().await,
        }
    }
}
