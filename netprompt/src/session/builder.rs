//! Builder for opening device sessions.

use std::time::Duration;

use secrecy::SecretString;

use super::Session;
use crate::channel::EchoMatch;
use crate::error::Result;
use crate::transport::{Protocol, SessionConfig};

/// Builder for a [`Session`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use netprompt::SessionBuilder;
///
/// # async fn example() -> Result<(), netprompt::Error> {
/// let session = SessionBuilder::new("192.0.2.1")
///     .port(23)
///     .username("admin")
///     .password("secret")
///     .command_timeout(Duration::from_secs(10))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Start a builder for `host` with port detection and default timeouts.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: SessionConfig::new(host, String::new(), String::new()),
        }
    }

    /// Set the port (default: probe 22 then 23).
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the login user.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = SecretString::from(password.into());
        self
    }

    /// Force a protocol, needed for non-standard ports.
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol = Some(protocol);
        self
    }

    /// Set the connection and handshake timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the per-command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = Some(timeout);
        self
    }

    /// Choose how command echoes are located.
    pub fn echo_match(mut self, echo_match: EchoMatch) -> Self {
        self.config.echo_match = echo_match;
        self
    }

    /// Set SSH terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.config.terminal_width = width;
        self.config.terminal_height = height;
        self
    }

    /// The config built so far.
    pub fn into_config(self) -> SessionConfig {
        self.config
    }

    /// Connect and run the handshake.
    pub async fn connect(self) -> Result<Session> {
        Session::connect(self.config).await
    }
}
