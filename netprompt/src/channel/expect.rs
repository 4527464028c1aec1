//! Read-until-predicate, bounded by a deadline.
//!
//! The one read loop every exchange with the device goes through: banner
//! capture, telnet login and command execution differ only in the predicate
//! they hand to [`read_until`].
//!
//! The loop is a plain future raced against the deadline and a cancellation
//! token. Whichever loses is dropped, so a fired timeout also stops the
//! reader and the transport is free for the next call.

use std::time::Duration;

use log::trace;
use tokio_util::sync::CancellationToken;

use super::buffer::PatternBuffer;
use crate::error::{SessionError, TransportError};
use crate::transport::Transport;

/// What the predicate wants after looking at a chunk.
#[derive(Debug)]
pub enum Step {
    /// Keep reading.
    Continue,

    /// The exchange is complete.
    Done,

    /// The exchange failed.
    Fail(SessionError),
}

/// How a successful read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The predicate reported [`Step::Done`].
    Matched,

    /// The transport reached a clean end-of-stream first.
    EndOfStream,
}

/// Why a read loop did not complete.
#[derive(Debug)]
pub enum ExpectError {
    /// The deadline expired.
    Timeout,

    /// The cancellation token fired.
    Cancelled,

    /// Reading or writing failed.
    Transport(TransportError),

    /// The predicate failed the exchange.
    Rejected(SessionError),
}

/// Write `prelude` (if any), then read chunks into `buffer` until
/// `on_chunk` says stop, the stream ends, `timeout` elapses or `cancel`
/// fires.
///
/// `on_chunk` sees each new chunk (also available as
/// [`PatternBuffer::last_chunk`]) along with the whole buffer, and may append
/// bytes to `reply`; they are written before the next read.
///
/// On error the bytes read so far stay in `buffer`.
pub async fn read_until<T, F>(
    transport: &mut T,
    buffer: &mut PatternBuffer,
    prelude: &[u8],
    timeout: Duration,
    cancel: &CancellationToken,
    mut on_chunk: F,
) -> Result<Completion, ExpectError>
where
    T: Transport,
    F: FnMut(&PatternBuffer, &mut Vec<u8>) -> Step,
{
    let exchange = async {
        if !prelude.is_empty() {
            transport
                .write(prelude)
                .await
                .map_err(ExpectError::Transport)?;
        }

        let mut reply = Vec::new();
        loop {
            let chunk = match transport.read().await.map_err(ExpectError::Transport)? {
                Some(chunk) => chunk,
                None => return Ok(Completion::EndOfStream),
            };
            trace!("read {} bytes: {:?}", chunk.len(), String::from_utf8_lossy(&chunk));
            buffer.extend(&chunk);

            let step = on_chunk(buffer, &mut reply);
            if !reply.is_empty() && !matches!(step, Step::Fail(_)) {
                transport
                    .write(&reply)
                    .await
                    .map_err(ExpectError::Transport)?;
                reply.clear();
            }

            match step {
                Step::Continue => {}
                Step::Done => return Ok(Completion::Matched),
                Step::Fail(e) => return Err(ExpectError::Rejected(e)),
            }
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExpectError::Cancelled),
        result = tokio::time::timeout(timeout, exchange) => {
            result.unwrap_or(Err(ExpectError::Timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use regex::bytes::Regex;

    use super::*;
    use crate::transport::{ScriptStep, ScriptedTransport};

    fn until(pattern: &str) -> impl FnMut(&PatternBuffer, &mut Vec<u8>) -> Step {
        let regex = Regex::new(pattern).unwrap();
        move |buffer, _| {
            if buffer.chunk_contains(&regex) {
                Step::Done
            } else {
                Step::Continue
            }
        }
    }

    #[tokio::test]
    async fn test_matches_across_chunks() {
        let (mut transport, _) = ScriptedTransport::builder()
            .read("line one\r\n")
            .read("router#")
            .build();
        let mut buffer = PatternBuffer::new();

        let done = read_until(
            &mut transport,
            &mut buffer,
            b"",
            Duration::from_secs(1),
            &CancellationToken::new(),
            until("#"),
        )
        .await
        .unwrap();

        assert_eq!(done, Completion::Matched);
        assert_eq!(buffer.as_slice(), b"line one\r\nrouter#");
    }

    #[tokio::test]
    async fn test_end_of_stream() {
        let (mut transport, _) = ScriptedTransport::builder().read("partial").eof().build();
        let mut buffer = PatternBuffer::new();

        let done = read_until(
            &mut transport,
            &mut buffer,
            b"",
            Duration::from_secs(1),
            &CancellationToken::new(),
            until("#"),
        )
        .await
        .unwrap();

        assert_eq!(done, Completion::EndOfStream);
        assert_eq!(buffer.as_slice(), b"partial");
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_data() {
        let (mut transport, _) = ScriptedTransport::builder().read("no prompt").build();
        let mut buffer = PatternBuffer::new();

        let err = read_until(
            &mut transport,
            &mut buffer,
            b"",
            Duration::from_millis(50),
            &CancellationToken::new(),
            until("#"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExpectError::Timeout));
        assert_eq!(buffer.as_slice(), b"no prompt");
    }

    #[tokio::test]
    async fn test_cancelled() {
        let (mut transport, _) = ScriptedTransport::builder().build();
        let mut buffer = PatternBuffer::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = read_until(
            &mut transport,
            &mut buffer,
            b"",
            Duration::from_secs(5),
            &cancel,
            until("#"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExpectError::Cancelled));
    }

    #[tokio::test]
    async fn test_prelude_and_reply_are_written() {
        let (mut transport, handle) = ScriptedTransport::builder()
            .respond("hello\n", [ScriptStep::data("name? ")])
            .respond("bob\n", [ScriptStep::data("hi bob\r\n>")])
            .build();
        let mut buffer = PatternBuffer::new();
        let name = Regex::new(r"name\?").unwrap();

        read_until(
            &mut transport,
            &mut buffer,
            b"hello\n",
            Duration::from_secs(1),
            &CancellationToken::new(),
            |buffer, reply| {
                if buffer.chunk_contains(&name) {
                    reply.extend_from_slice(b"bob\n");
                    Step::Continue
                } else {
                    Step::Done
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(handle.writes(), vec![b"hello\n".to_vec(), b"bob\n".to_vec()]);
        assert_eq!(buffer.as_slice(), b"name? hi bob\r\n>");
    }

    #[tokio::test]
    async fn test_transport_error() {
        let (mut transport, _) = ScriptedTransport::builder()
            .read("some")
            .error(std::io::ErrorKind::ConnectionReset)
            .build();
        let mut buffer = PatternBuffer::new();

        let err = read_until(
            &mut transport,
            &mut buffer,
            b"",
            Duration::from_secs(1),
            &CancellationToken::new(),
            until("#"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExpectError::Transport(TransportError::Io(_))));
        assert_eq!(buffer.as_slice(), b"some");
    }
}
