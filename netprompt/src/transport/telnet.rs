//! Telnet transport over TCP.
//!
//! Option negotiation (RFC 854/855) is answered here and stripped from the
//! data stream: the server may echo and suppress go-ahead, everything else is
//! refused. Subnegotiations are skipped.

use std::collections::HashSet;
use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::Transport;
use crate::error::TransportError;

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SUPPRESS_GO_AHEAD: u8 = 3;

const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    /// Saw a CR; a following NUL is dropped.
    Cr,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Incremental telnet decoder.
///
/// Feeds raw socket bytes, yields payload bytes and the negotiation replies
/// to send back. State is kept across calls, so a command split over two
/// reads is still recognised.
#[derive(Debug)]
pub(crate) struct TelnetCodec {
    state: State,
    /// (verb, option) pairs already answered, so the peer cannot make us loop.
    answered: HashSet<(u8, u8)>,
}

impl TelnetCodec {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Data,
            answered: HashSet::new(),
        }
    }

    pub(crate) fn decode(&mut self, input: &[u8], data: &mut BytesMut, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match self.state {
                State::Data | State::Cr => match byte {
                    IAC => State::Iac,
                    0 if self.state == State::Cr => State::Data,
                    b'\r' => {
                        data.extend_from_slice(b"\r");
                        State::Cr
                    }
                    _ => {
                        data.extend_from_slice(&[byte]);
                        State::Data
                    }
                },
                State::Iac => match byte {
                    IAC => {
                        data.extend_from_slice(&[IAC]);
                        State::Data
                    }
                    WILL | WONT | DO | DONT => State::Negotiate(byte),
                    SB => State::Sub,
                    // NOP, GA, AYT and friends carry no payload.
                    _ => State::Data,
                },
                State::Negotiate(verb) => {
                    self.answer(verb, byte, replies);
                    State::Data
                }
                State::Sub => match byte {
                    IAC => State::SubIac,
                    _ => State::Sub,
                },
                State::SubIac => match byte {
                    SE => State::Data,
                    _ => State::Sub,
                },
            };
        }
    }

    fn answer(&mut self, verb: u8, option: u8, replies: &mut Vec<u8>) {
        let reply = match verb {
            WILL if matches!(option, OPT_ECHO | OPT_SUPPRESS_GO_AHEAD) => DO,
            WILL => DONT,
            DO => WONT,
            // WONT/DONT need no acknowledgement from a side that never
            // enabled anything.
            _ => return,
        };
        if !self.answered.insert((verb, option)) {
            return;
        }
        trace!("telnet negotiation: {} {} -> {}", verb, option, reply);
        replies.extend_from_slice(&[IAC, reply, option]);
    }

    /// Escape IAC bytes in outgoing data.
    pub(crate) fn encode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        for &byte in data {
            if byte == IAC {
                out.push(IAC);
            }
            out.push(byte);
        }
        out
    }
}

/// Telnet transport.
///
/// Generic over the underlying stream so it can run over anything that
/// reads and writes bytes; [`TelnetTransport::connect`] uses TCP.
///
/// Decoded payload and negotiation replies live on the struct, so a `read`
/// dropped mid-await loses neither. Queued replies go out at the start of the
/// next `read` or `write`.
pub struct TelnetTransport<S = TcpStream> {
    stream: Option<S>,
    codec: TelnetCodec,
    read_buf: Box<[u8]>,
    /// Decoded payload not yet returned.
    pending: BytesMut,
    /// Negotiation replies not yet written.
    replies: Vec<u8>,
}

impl TelnetTransport<TcpStream> {
    /// Open a TCP connection, bounded by `timeout`.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
            .map_err(|source| TransportError::ConnectionFailed {
                host: host.to_string(),
                port,
                source,
            })?;
        stream.set_nodelay(true)?;
        debug!("{}:{} telnet connection established", host, port);
        Ok(Self::new(stream))
    }
}

impl<S> TelnetTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            codec: TelnetCodec::new(),
            read_buf: vec![0; READ_CHUNK].into_boxed_slice(),
            pending: BytesMut::new(),
            replies: Vec::new(),
        }
    }
}

impl<S> Transport for TelnetTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read(&mut self) -> Result<Option<Bytes>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Disconnected)?;
        loop {
            if !self.pending.is_empty() {
                return Ok(Some(self.pending.split().freeze()));
            }
            send_replies(stream, &mut self.replies).await?;

            let n = stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Ok(None);
            }
            self.codec
                .decode(&self.read_buf[..n], &mut self.pending, &mut self.replies);
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Disconnected)?;
        send_replies(stream, &mut self.replies).await?;
        stream.write_all(&TelnetCodec::encode(data)).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.pending.clear();
        self.replies.clear();
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}

/// Write queued negotiation replies, draining only what the stream accepted.
async fn send_replies<S>(stream: &mut S, replies: &mut Vec<u8>) -> Result<(), TransportError>
where
    S: AsyncWrite + Unpin,
{
    if replies.is_empty() {
        return Ok(());
    }
    while !replies.is_empty() {
        let n = stream.write(replies).await?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
        replies.drain(..n);
    }
    stream.flush().await?;
    Ok(())
}
