//! Session connection configuration.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::channel::EchoMatch;
use crate::error::ConfigError;

/// Handshake timeout used when none (or zero) is configured.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Well-known SSH port.
pub const SSH_PORT: u16 = 22;

/// Well-known telnet port.
pub const TELNET_PORT: u16 = 23;

/// Wire protocol used to reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// SSH; authentication happens in the transport.
    Ssh,

    /// Plaintext telnet; authentication happens in-band at the login prompt.
    Telnet,
}

impl Protocol {
    /// Pick the protocol for a well-known port.
    pub fn from_port(port: u16) -> Option<Self> {
        match port {
            SSH_PORT => Some(Protocol::Ssh),
            TELNET_PORT => Some(Protocol::Telnet),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Ssh => write!(f, "ssh"),
            Protocol::Telnet => write!(f, "telnet"),
        }
    }
}

/// Connection and timing options for a device session.
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Port; 0 probes 22 then 23.
    #[serde(default)]
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: SecretString,

    /// Force a protocol instead of deriving it from the port.
    #[serde(default)]
    pub protocol: Option<Protocol>,

    /// Bound on connection setup and the login/banner handshake.
    #[serde(default = "default_handshake_timeout")]
    pub timeout: Duration,

    /// Bound on each command. Required.
    #[serde(default)]
    pub command_timeout: Option<Duration>,

    /// How the command echo is located in the output.
    #[serde(default)]
    pub echo_match: EchoMatch,

    /// Terminal width requested for the SSH PTY.
    #[serde(default = "default_terminal_size")]
    pub terminal_width: u32,

    /// Terminal height requested for the SSH PTY.
    #[serde(default = "default_terminal_size")]
    pub terminal_height: u32,
}

fn default_handshake_timeout() -> Duration {
    DEFAULT_HANDSHAKE_TIMEOUT
}

fn default_terminal_size() -> u32 {
    255
}

impl SessionConfig {
    /// Create a config with default port detection and timeouts.
    ///
    /// The command timeout still has to be set before connecting.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 0,
            username: username.into(),
            password: SecretString::from(password.into()),
            protocol: None,
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            command_timeout: None,
            echo_match: EchoMatch::default(),
            terminal_width: default_terminal_size(),
            terminal_height: default_terminal_size(),
        }
    }

    /// Check required fields and fill in defaults.
    ///
    /// Returns the command timeout, which has no default.
    pub fn validate(&mut self) -> Result<Duration, ConfigError> {
        if self.username.is_empty() {
            return Err(ConfigError::invalid("username is not defined"));
        }
        if self.password.expose_secret().is_empty() {
            return Err(ConfigError::invalid("password is not defined"));
        }
        if self.host.is_empty() {
            return Err(ConfigError::invalid("host is not defined"));
        }
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_HANDSHAKE_TIMEOUT;
        }
        match self.command_timeout {
            Some(timeout) if !timeout.is_zero() => Ok(timeout),
            _ => Err(ConfigError::invalid("command timeout is not defined")),
        }
    }

    /// Decide which protocol to speak on the (resolved) port.
    pub fn resolve_protocol(&self, port: u16) -> Result<Protocol, ConfigError> {
        self.protocol
            .or_else(|| Protocol::from_port(port))
            .ok_or_else(|| {
                ConfigError::invalid(format!(
                    "port {port} is neither ssh ({SSH_PORT}) nor telnet ({TELNET_PORT})"
                ))
            })
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        let mut config = SessionConfig::new("10.0.0.1", "admin", "secret");
        config.command_timeout = Some(Duration::from_secs(10));
        config
    }

    #[test]
    fn test_validate_ok() {
        let mut config = config();
        assert_eq!(config.validate().unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_validate_missing_fields() {
        let mut missing_user = config();
        missing_user.username.clear();
        let err = missing_user.validate().unwrap_err();
        assert!(err.to_string().contains("username"));

        let mut missing_password = SessionConfig::new("10.0.0.1", "admin", "");
        missing_password.command_timeout = Some(Duration::from_secs(1));
        let err = missing_password.validate().unwrap_err();
        assert!(err.to_string().contains("password"));

        let mut missing_host = config();
        missing_host.host.clear();
        let err = missing_host.validate().unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn test_validate_requires_command_timeout() {
        let mut config = SessionConfig::new("10.0.0.1", "admin", "secret");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("command timeout"));

        config.command_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_defaults_handshake_timeout() {
        let mut config = config();
        config.timeout = Duration::ZERO;
        config.validate().unwrap();
        assert_eq!(config.timeout, DEFAULT_HANDSHAKE_TIMEOUT);
    }

    #[test]
    fn test_resolve_protocol() {
        let config = config();
        assert_eq!(config.resolve_protocol(22).unwrap(), Protocol::Ssh);
        assert_eq!(config.resolve_protocol(23).unwrap(), Protocol::Telnet);
        assert!(config.resolve_protocol(2222).is_err());

        let mut forced = self::config();
        forced.protocol = Some(Protocol::Ssh);
        assert_eq!(forced.resolve_protocol(2222).unwrap(), Protocol::Ssh);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"host": "core1", "username": "admin", "password": "secret"}"#,
        )
        .unwrap();

        assert_eq!(config.port, 0);
        assert_eq!(config.timeout, DEFAULT_HANDSHAKE_TIMEOUT);
        assert!(config.command_timeout.is_none());
        assert_eq!(config.echo_match, EchoMatch::Regex);
        assert_eq!(config.terminal_width, 255);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = config();
        assert!(!format!("{:?}", config).contains("secret\""));
    }
}
