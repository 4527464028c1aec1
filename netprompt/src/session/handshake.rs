//! One-time session handshakes: SSH banner capture and telnet login.
//!
//! Both read the device until a prompt line shows up and return that prompt,
//! which becomes the session's default terminator.

use std::time::Duration;

use log::debug;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use crate::channel::{
    AUTH_FAILURE, Completion, ExpectError, LOGIN_PROMPT, PASSWORD_PROMPT, PROMPT_LINE,
    PatternBuffer, Step, last_prompt_line, read_until,
};
use crate::error::{Error, Result, SessionError};
use crate::transport::Transport;

/// Read the first prompt after an SSH shell opens.
///
/// Stops at the first chunk containing a prompt line and returns the last
/// prompt line of everything read so far.
pub(crate) async fn capture_banner<T: Transport>(
    transport: &mut T,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut buffer = PatternBuffer::new();
    let mut banner = None;

    let result = read_until(transport, &mut buffer, b"", timeout, cancel, |buffer, _| {
        if !buffer.chunk_contains(&*PROMPT_LINE) {
            return Step::Continue;
        }
        banner = last_prompt_line(buffer.as_slice());
        if banner.is_some() {
            Step::Done
        } else {
            Step::Continue
        }
    })
    .await;

    finish(result, banner, timeout)
}

/// Where the telnet login stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoginState {
    /// Waiting for a username prompt.
    AwaitingLogin,

    /// Username sent, waiting for a password prompt.
    AwaitingPassword,

    /// Password sent, waiting for the device prompt.
    AwaitingPrompt,
}

/// Telnet login state machine.
///
/// Each credential is written at most once, even if the device repeats the
/// prompt text (for example a `Last login:` line after authentication).
pub(crate) struct Login<'a> {
    username: &'a str,
    password: &'a SecretString,
    state: LoginState,
    sent_username: bool,
    sent_password: bool,
    banner: Option<String>,
}

impl<'a> Login<'a> {
    pub(crate) fn new(username: &'a str, password: &'a SecretString) -> Self {
        Self {
            username,
            password,
            state: LoginState::AwaitingLogin,
            sent_username: false,
            sent_password: false,
            banner: None,
        }
    }

    pub(crate) fn state(&self) -> LoginState {
        self.state
    }

    /// Look at one chunk, queue any credential into `reply`.
    ///
    /// A failure message ends the login even when the same chunk also holds a
    /// prompt. A prompt in the chunk that triggered a credential is not taken
    /// as the banner.
    pub(crate) fn on_chunk(&mut self, chunk: &[u8], reply: &mut Vec<u8>) -> Step {
        if AUTH_FAILURE.is_match(chunk) {
            debug!("login rejected in state {:?}", self.state);
            return Step::Fail(SessionError::AuthenticationFailed {
                user: self.username.to_string(),
            });
        }

        let mut answered = false;
        if !self.sent_username && !self.sent_password && LOGIN_PROMPT.is_match(chunk) {
            debug!("sending username");
            reply.extend_from_slice(self.username.as_bytes());
            reply.push(b'\n');
            self.sent_username = true;
            self.state = LoginState::AwaitingPassword;
            answered = true;
        }
        if !self.sent_password && PASSWORD_PROMPT.is_match(chunk) {
            debug!("sending password");
            reply.extend_from_slice(self.password.expose_secret().as_bytes());
            reply.push(b'\n');
            self.sent_password = true;
            self.state = LoginState::AwaitingPrompt;
            answered = true;
        }
        if answered {
            return Step::Continue;
        }

        match last_prompt_line(chunk) {
            Some(prompt) => {
                self.banner = Some(prompt);
                Step::Done
            }
            None => Step::Continue,
        }
    }
}

/// Drive the telnet login until the device prompt appears.
pub(crate) async fn authenticate<T: Transport>(
    transport: &mut T,
    username: &str,
    password: &SecretString,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut login = Login::new(username, password);
    let mut buffer = PatternBuffer::new();

    let result = read_until(transport, &mut buffer, b"", timeout, cancel, |buffer, reply| {
        login.on_chunk(buffer.last_chunk(), reply)
    })
    .await;
    debug!("telnet login finished in state {:?}", login.state());

    finish(result, login.banner, timeout)
}

fn finish(
    result: std::result::Result<Completion, ExpectError>,
    banner: Option<String>,
    timeout: Duration,
) -> Result<String> {
    match result {
        Ok(Completion::Matched) => {
            let banner = banner.ok_or(SessionError::UnexpectedEof)?;
            debug!("device prompt: {:?}", banner);
            Ok(banner)
        }
        Ok(Completion::EndOfStream) => Err(SessionError::UnexpectedEof.into()),
        Err(ExpectError::Timeout) => Err(SessionError::HandshakeTimeout(timeout).into()),
        Err(ExpectError::Cancelled) => Err(SessionError::Closed.into()),
        Err(ExpectError::Transport(e)) => Err(Error::Transport(e)),
        Err(ExpectError::Rejected(e)) => Err(e.into()),
    }
}
