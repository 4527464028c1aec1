//! Command execution: send a line, read until echo and terminator.

use std::time::{Duration, Instant};

use log::{debug, trace};
use tokio_util::sync::CancellationToken;

use super::response::Response;
use crate::channel::{
    EchoMatch, EchoMatcher, ExpectError, PatternBuffer, PromptMatcher, Step, read_until,
};
use crate::error::{Result, SessionError};
use crate::transport::Transport;

/// State of one in-flight command.
///
/// The terminator only counts once the echo of the command has been seen,
/// so a terminator that also appears in the command text itself cannot end
/// the response early.
struct PendingResponse<'a, M> {
    echo: EchoMatcher,
    terminator: &'a M,
    echoed: bool,
}

impl<'a, M: PromptMatcher> PendingResponse<'a, M> {
    fn new(command: &str, echo_match: EchoMatch, terminator: &'a M) -> Self {
        Self {
            echo: EchoMatcher::new(command, echo_match),
            terminator,
            echoed: false,
        }
    }

    fn on_chunk(&mut self, buffer: &PatternBuffer) -> Step {
        if !self.echoed && buffer.contains(&self.echo) {
            trace!("command echo seen after {} bytes", buffer.len());
            self.echoed = true;
        }
        if self.echoed && buffer.chunk_contains(self.terminator) {
            Step::Done
        } else {
            Step::Continue
        }
    }
}

/// Send `command` and read until `terminator` shows up after its echo.
///
/// A clean end-of-stream counts as a finished response. Timeouts and
/// transport failures keep the bytes read so far in the error.
pub(crate) async fn execute<T, M>(
    transport: &mut T,
    command: &str,
    terminator: &M,
    echo_match: EchoMatch,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Response>
where
    T: Transport,
    M: PromptMatcher,
{
    let start = Instant::now();
    let line = format!("{command}\n");
    let mut pending = PendingResponse::new(command, echo_match, terminator);
    let mut buffer = PatternBuffer::new();

    let result = read_until(
        transport,
        &mut buffer,
        line.as_bytes(),
        timeout,
        cancel,
        |buffer, _| pending.on_chunk(buffer),
    )
    .await;
    let elapsed = start.elapsed();

    match result {
        Ok(completion) => {
            debug!(
                "{:?} completed in {:?} ({:?}, {} bytes)",
                command,
                elapsed,
                completion,
                buffer.len()
            );
            Ok(Response::new(command, buffer.take(), completion, elapsed))
        }
        Err(ExpectError::Timeout) => {
            debug!("{:?} timed out after {:?}", command, timeout);
            Err(SessionError::CommandTimeout {
                command: command.to_string(),
                timeout,
                partial: buffer.take(),
            }
            .into())
        }
        Err(ExpectError::Cancelled) => Err(SessionError::Closed.into()),
        Err(ExpectError::Transport(source)) => Err(SessionError::Command {
            command: command.to_string(),
            source,
            partial: buffer.take(),
        }
        .into()),
        Err(ExpectError::Rejected(e)) => Err(e.into()),
    }
}
