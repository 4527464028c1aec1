//! Port autodetection.

use std::time::Duration;

use log::debug;
use tokio::net::TcpStream;

use super::config::{SSH_PORT, TELNET_PORT};
use crate::error::ConfigError;

/// How long each candidate port gets to accept a connection.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(200);

/// Find the management port of `host`: SSH first, then telnet.
pub async fn detect_port(host: &str) -> Result<u16, ConfigError> {
    probe_ports(host, &[SSH_PORT, TELNET_PORT], PROBE_TIMEOUT)
        .await
        .ok_or_else(|| ConfigError::NoAvailablePort {
            host: host.to_string(),
        })
}

/// Return the first of `ports` that accepts a TCP connection within
/// `timeout`. The probe connection is dropped immediately.
pub async fn probe_ports(host: &str, ports: &[u16], timeout: Duration) -> Option<u16> {
    for &port in ports {
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => {
                debug!("{}:{} accepted probe connection", host, port);
                return Some(port);
            }
            Ok(Err(e)) => debug!("{}:{} probe failed: {}", host, port, e),
            Err(_) => debug!("{}:{} probe timed out", host, port),
        }
    }
    None
}
