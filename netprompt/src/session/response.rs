//! Response type for command execution results.

use std::borrow::Cow;
use std::time::Duration;

use crate::channel::Completion;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Everything read while the command ran: echo, output and the
    /// terminator.
    pub data: Vec<u8>,

    /// Whether the terminator matched or the device closed the stream.
    pub completion: Completion,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Create a new response.
    pub fn new(
        command: impl Into<String>,
        data: Vec<u8>,
        completion: Completion,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            data,
            completion,
            elapsed,
        }
    }

    /// Get the output as a string (lossy UTF-8).
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Take the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// True when the device closed the stream instead of printing the
    /// terminator.
    pub fn is_end_of_stream(&self) -> bool {
        self.completion == Completion::EndOfStream
    }

    /// Check if the output contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.as_str_lossy().contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}
