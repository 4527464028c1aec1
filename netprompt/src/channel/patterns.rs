//! Pattern matching utilities for prompt, echo and login detection.

use std::sync::LazyLock;

use memchr::memmem;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// A line that ends with `>` or `#`, i.e. a device prompt.
///
/// Group 1 is the prompt text without leading carriage returns or trailing
/// whitespace.
pub static PROMPT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\r*([^\r\n]*[>#])[ \t]*\r?$").unwrap());

/// Username prompt vocabulary.
pub static LOGIN_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)username|login").unwrap());

/// Password prompt vocabulary.
pub static PASSWORD_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)password").unwrap());

/// Words a device uses to reject a login.
pub static AUTH_FAILURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)error|fail|incorrect").unwrap());

/// Trait for prompt matching - regex by default, extensible for custom parsers.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where match ends, or None if no match.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

/// Regex-based prompt matcher (the default implementation).
impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find(data).map(|m| m.end())
    }
}

/// A compiled expect pattern.
///
/// Compiled once and reused for every chunk of a response.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compile a regular expression.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Build a pattern that matches `text` verbatim.
    ///
    /// Prompts such as `router(config)#` carry regex metacharacters, so a
    /// captured banner goes through here before it is used as a terminator.
    pub fn literal(text: &str) -> Result<Self, PatternError> {
        Self::new(&regex::escape(text))
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Get a reference to the underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PromptMatcher for Pattern {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.regex.find_match(data)
    }
}

/// How a command's echo is located in the device output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EchoMatch {
    /// Treat the command text as a regular expression.
    ///
    /// Metacharacters in the command (`|`, `.`, `*`, ...) are interpreted,
    /// so `show run | include x` matches more loosely than it reads.
    #[default]
    Regex,

    /// Search for the command bytes verbatim.
    Literal,
}

/// Detects the echoed command in accumulated output.
#[derive(Debug, Clone)]
pub enum EchoMatcher {
    /// Command compiled as a regex.
    Regex(Regex),

    /// Command searched as a byte substring.
    Literal(memmem::Finder<'static>),
}

impl EchoMatcher {
    /// Build the echo matcher for `command`.
    ///
    /// A command that does not compile as a regex is matched literally.
    pub fn new(command: &str, mode: EchoMatch) -> Self {
        match mode {
            EchoMatch::Literal => Self::literal(command),
            EchoMatch::Regex => match Regex::new(command) {
                Ok(regex) => EchoMatcher::Regex(regex),
                Err(e) => {
                    log::warn!(
                        "command {:?} is not a valid regex ({}), matching its echo literally",
                        command,
                        e
                    );
                    Self::literal(command)
                }
            },
        }
    }

    fn literal(command: &str) -> Self {
        EchoMatcher::Literal(memmem::Finder::new(command.as_bytes()).into_owned())
    }
}

impl PromptMatcher for EchoMatcher {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        match self {
            EchoMatcher::Regex(regex) => regex.find_match(data),
            EchoMatcher::Literal(finder) => finder
                .find(data)
                .map(|start| start + finder.needle().len()),
        }
    }
}

/// Find the last prompt line in `data`.
pub fn last_prompt_line(data: &[u8]) -> Option<String> {
    PROMPT_LINE
        .captures_iter(data)
        .filter_map(|caps| caps.get(1))
        .last()
        .map(|m| String::from_utf8_lossy(m.as_bytes()).trim_start().to_string())
        .filter(|prompt| !prompt.is_empty())
}
