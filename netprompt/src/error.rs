//! Error types for netprompt.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netprompt operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors (TCP, SSH, telnet)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session errors (handshake, command execution)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Pattern compilation errors
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Bytes read before the failing command gave up, if any.
    ///
    /// Timeouts and mid-command transport failures keep whatever the device
    /// had already sent so callers can inspect it.
    pub fn partial_output(&self) -> Option<&[u8]> {
        match self {
            Error::Session(SessionError::CommandTimeout { partial, .. })
            | Error::Session(SessionError::Command { partial, .. }) => Some(partial),
            _ => None,
        }
    }

    /// Whether this error is a command timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Session(SessionError::CommandTimeout { .. })
                | Error::Session(SessionError::HandshakeTimeout(_))
        )
    }
}

/// Transport layer errors (connection setup, byte I/O).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// SSH password authentication was rejected
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Failed to open the interactive shell channel
    #[error("Failed to open shell channel: {0}")]
    ChannelOpen(russh::Error),

    /// The transport was already closed
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session layer errors (handshake, command execution).
#[derive(Error, Debug)]
pub enum SessionError {
    /// No prompt was seen before the handshake timeout
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// The device rejected the telnet login
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// The device closed the stream before showing a prompt
    #[error("Connection closed before a prompt was received")]
    UnexpectedEof,

    /// The expected pattern did not show up in time
    #[error("Command '{command}' timed out after {timeout:?}")]
    CommandTimeout {
        command: String,
        timeout: Duration,
        partial: Vec<u8>,
    },

    /// The transport failed while a command was running
    #[error("Command '{command}' failed: {source}")]
    Command {
        command: String,
        #[source]
        source: TransportError,
        partial: Vec<u8>,
    },

    /// Another command is already in flight on this session
    #[error("Session busy - another command is in flight")]
    Busy,

    /// The session has been closed
    #[error("Session closed")]
    Closed,
}

/// Pattern compilation errors.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    Invalid(#[from] regex::Error),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing or unusable option
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Neither port 22 nor 23 accepted a connection
    #[error("No available ports to connect to on {host}")]
    NoAvailablePort { host: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ConfigError::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Result type alias using netprompt's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_output_on_timeout() {
        let err: Error = SessionError::CommandTimeout {
            command: "show version".to_string(),
            timeout: Duration::from_millis(50),
            partial: b"show version\r\n".to_vec(),
        }
        .into();

        assert!(err.is_timeout());
        assert_eq!(err.partial_output(), Some(&b"show version\r\n"[..]));
    }

    #[test]
    fn test_partial_output_absent() {
        let err: Error = SessionError::Busy.into();
        assert!(err.partial_output().is_none());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_error_display() {
        let err: Error = ConfigError::invalid("username is not defined").into();
        assert_eq!(
            err.to_string(),
            "Config error: Invalid configuration: username is not defined"
        );
    }
}
