//! In-memory transport that plays back a scripted device.
//!
//! Useful for testing automation against canned device output without a
//! network. Output is queued up front or in response to exact writes; once
//! the queue is empty, reads wait forever, like a device that has nothing
//! more to say.
//!
//! ```rust
//! use netprompt::transport::{ScriptStep, ScriptedTransport};
//!
//! let (transport, handle) = ScriptedTransport::builder()
//!     .read("router#")
//!     .respond("show clock\n", [ScriptStep::data("show clock\r\n12:00:00\r\nrouter#")])
//!     .build();
//! # let _ = (transport, handle);
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use log::trace;

use super::Transport;
use crate::error::TransportError;

/// One step of scripted device behaviour.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Deliver a chunk of output.
    Data(Bytes),

    /// Stall before the next step.
    Wait(Duration),

    /// Clean end-of-stream.
    Eof,

    /// Fail the read with an I/O error.
    Error(io::ErrorKind),
}

impl ScriptStep {
    /// A chunk of output.
    pub fn data(data: impl AsRef<[u8]>) -> Self {
        ScriptStep::Data(Bytes::copy_from_slice(data.as_ref()))
    }
}

/// Builder for [`ScriptedTransport`].
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    steps: VecDeque<ScriptStep>,
    responses: Vec<(Vec<u8>, Vec<ScriptStep>)>,
}

impl ScriptBuilder {
    /// Queue a chunk of output.
    pub fn read(mut self, data: impl AsRef<[u8]>) -> Self {
        self.steps.push_back(ScriptStep::data(data));
        self
    }

    /// Queue a stall.
    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push_back(ScriptStep::Wait(duration));
        self
    }

    /// Queue an end-of-stream.
    pub fn eof(mut self) -> Self {
        self.steps.push_back(ScriptStep::Eof);
        self
    }

    /// Queue a read error.
    pub fn error(mut self, kind: io::ErrorKind) -> Self {
        self.steps.push_back(ScriptStep::Error(kind));
        self
    }

    /// Every time exactly `trigger` is written, queue `steps`.
    pub fn respond(
        mut self,
        trigger: impl AsRef<[u8]>,
        steps: impl IntoIterator<Item = ScriptStep>,
    ) -> Self {
        self.responses
            .push((trigger.as_ref().to_vec(), steps.into_iter().collect()));
        self
    }

    /// Build the transport and a handle for inspecting it afterwards.
    pub fn build(self) -> (ScriptedTransport, ScriptHandle) {
        let handle = ScriptHandle::default();
        let transport = ScriptedTransport {
            steps: self.steps,
            responses: self.responses,
            handle: handle.clone(),
        };
        (transport, handle)
    }
}

/// Shared view of what a [`ScriptedTransport`] has seen.
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
}

impl ScriptHandle {
    /// Everything written so far, one entry per write call.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many writes equalled `data`.
    pub fn write_count(&self, data: impl AsRef<[u8]>) -> usize {
        let data = data.as_ref();
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|w| w.as_slice() == data)
            .count()
    }

    /// Whether the transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, data: &[u8]) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data.to_vec());
    }
}

/// A [`Transport`] driven by a script.
#[derive(Debug)]
pub struct ScriptedTransport {
    steps: VecDeque<ScriptStep>,
    responses: Vec<(Vec<u8>, Vec<ScriptStep>)>,
    handle: ScriptHandle,
}

impl ScriptedTransport {
    /// Start a script.
    pub fn builder() -> ScriptBuilder {
        ScriptBuilder::default()
    }
}

impl Transport for ScriptedTransport {
    async fn read(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            if self.handle.is_closed() {
                return Err(TransportError::Disconnected);
            }
            match self.steps.pop_front() {
                Some(ScriptStep::Data(data)) => {
                    trace!("scripted read: {:?}", String::from_utf8_lossy(&data));
                    return Ok(Some(data));
                }
                Some(ScriptStep::Wait(duration)) => tokio::time::sleep(duration).await,
                Some(ScriptStep::Eof) => return Ok(None),
                Some(ScriptStep::Error(kind)) => {
                    return Err(io::Error::new(kind, "scripted read error").into());
                }
                None => return std::future::pending().await,
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.handle.is_closed() {
            return Err(TransportError::Disconnected);
        }
        self.handle.record(data);
        for (trigger, steps) in &self.responses {
            if trigger.as_slice() == data {
                self.steps.extend(steps.iter().cloned());
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.handle.closed.store(true, Ordering::SeqCst);
        self.steps.clear();
        Ok(())
    }
}
