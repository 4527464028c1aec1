//! Channel layer: accumulating device output and deciding when to stop.
//!
//! This module holds the pattern matchers, the output buffer and the
//! deadline-bounded read loop shared by every exchange with a device.

mod buffer;
pub mod expect;
mod patterns;

pub use buffer::PatternBuffer;
pub use expect::{Completion, ExpectError, Step, read_until};
pub use patterns::{
    AUTH_FAILURE, EchoMatch, EchoMatcher, LOGIN_PROMPT, PASSWORD_PROMPT, PROMPT_LINE, Pattern,
    PromptMatcher, last_prompt_line,
};
