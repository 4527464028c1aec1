//! Device sessions.
//!
//! A [`Session`] owns one transport, performs the login or banner handshake
//! once, and then runs commands one at a time:
//!
//! - [`Session::enter_command`] - run a command until a given pattern, discard output
//! - [`Session::get_data`] - run a command until the device prompt, return output
//! - [`Session::banner`] - the prompt captured during the handshake
//! - [`Session::close`] - release the transport

mod builder;
mod executor;
mod handshake;
mod response;

pub use builder::SessionBuilder;
pub use response::Response;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::channel::{EchoMatch, Pattern, PromptMatcher};
use crate::error::{Result, SessionError, TransportError};
use crate::transport::probe::detect_port;
use crate::transport::{DeviceTransport, Protocol, SessionConfig, Transport};

/// One command of a scripted sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStep {
    /// The command line to send.
    pub command: String,

    /// Pattern that ends the response; the device prompt when absent.
    #[serde(default)]
    pub expect: Option<String>,
}

impl CommandStep {
    /// A step that waits for `expect`.
    pub fn new(command: impl Into<String>, expect: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            expect: Some(expect.into()),
        }
    }

    /// A step that waits for the device prompt.
    pub fn prompt(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            expect: None,
        }
    }
}

/// An interactive CLI session with a network device.
///
/// Commands run one at a time; a call made while another is in flight fails
/// with [`SessionError::Busy`] instead of interleaving on the wire.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use netprompt::SessionBuilder;
///
/// # async fn example() -> Result<(), netprompt::Error> {
/// let session = SessionBuilder::new("192.0.2.1")
///     .username("admin")
///     .password("secret")
///     .command_timeout(Duration::from_secs(30))
///     .connect()
///     .await?;
///
/// session.enter_command("terminal length 0", "[>#]").await?;
/// let version = session.get_data("show version").await?;
/// println!("{}", version);
///
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session<T = DeviceTransport> {
    host: String,
    port: u16,
    username: String,
    protocol: Protocol,

    /// The transport; `None` once closed.
    transport: Mutex<Option<T>>,

    /// Prompt captured by the handshake.
    banner: String,

    /// The banner compiled as a literal terminator.
    terminator: Pattern,

    authenticated: AtomicBool,
    timeout: Duration,
    command_timeout: Duration,
    echo_match: EchoMatch,

    /// Fired by `close()` to stop an in-flight read.
    cancel: CancellationToken,
}

impl Session<DeviceTransport> {
    /// Validate `config`, open the transport and run the handshake.
    ///
    /// Port 0 probes 22 then 23. Port 22 speaks SSH, port 23 telnet; other
    /// ports need [`SessionConfig::protocol`].
    pub async fn connect(mut config: SessionConfig) -> Result<Self> {
        let command_timeout = config.validate()?;
        if config.port == 0 {
            config.port = detect_port(&config.host).await?;
        }
        let protocol = config.resolve_protocol(config.port)?;

        debug!("connecting to {} over {}", config.socket_addr(), protocol);
        let transport = DeviceTransport::open(&config, protocol)
            .await
            .map_err(setup_error)?;
        Self::establish(transport, protocol, config, command_timeout).await
    }
}

/// SSH authenticates and can time out while the transport is opened; report
/// those the same way as a telnet login.
fn setup_error(err: TransportError) -> crate::Error {
    match err {
        TransportError::AuthenticationFailed { user } => {
            SessionError::AuthenticationFailed { user }.into()
        }
        TransportError::Timeout(timeout) => SessionError::HandshakeTimeout(timeout).into(),
        other => other.into(),
    }
}

impl<T: Transport> Session<T> {
    /// Run the handshake over an already open transport.
    ///
    /// `protocol` picks the handshake: telnet logs in with the configured
    /// credentials, SSH only captures the prompt.
    pub async fn with_transport(
        transport: T,
        protocol: Protocol,
        mut config: SessionConfig,
    ) -> Result<Self> {
        let command_timeout = config.validate()?;
        Self::establish(transport, protocol, config, command_timeout).await
    }

    async fn establish(
        mut transport: T,
        protocol: Protocol,
        config: SessionConfig,
        command_timeout: Duration,
    ) -> Result<Self> {
        let cancel = CancellationToken::new();

        let outcome = async {
            let banner = match protocol {
                Protocol::Telnet => {
                    handshake::authenticate(
                        &mut transport,
                        &config.username,
                        &config.password,
                        config.timeout,
                        &cancel,
                    )
                    .await?
                }
                Protocol::Ssh => {
                    handshake::capture_banner(&mut transport, config.timeout, &cancel).await?
                }
            };
            let terminator = Pattern::literal(&banner)?;
            Ok::<_, crate::Error>((banner, terminator))
        }
        .await;

        let (banner, terminator) = match outcome {
            Ok(ready) => ready,
            Err(e) => {
                debug!("{} handshake failed: {}", config.socket_addr(), e);
                if let Err(close_err) = transport.close().await {
                    debug!("failed to close transport: {}", close_err);
                }
                return Err(e);
            }
        };

        Ok(Self {
            host: config.host,
            port: config.port,
            username: config.username,
            protocol,
            transport: Mutex::new(Some(transport)),
            banner,
            terminator,
            authenticated: AtomicBool::new(true),
            timeout: config.timeout,
            command_timeout,
            echo_match: config.echo_match,
            cancel,
        })
    }

    /// Send `command` and wait until `expect` (a regex) appears after its
    /// echo. The output is discarded.
    pub async fn enter_command(&self, command: &str, expect: &str) -> Result<()> {
        self.execute(command, expect).await.map(|_| ())
    }

    /// Send `command` and wait for the device prompt.
    pub async fn get_data(&self, command: &str) -> Result<Response> {
        self.run(command, &self.terminator).await
    }

    /// Send `command` and wait until `expect` (a regex) appears after its
    /// echo.
    pub async fn execute(&self, command: &str, expect: &str) -> Result<Response> {
        let terminator = Pattern::new(expect)?;
        self.run(command, &terminator).await
    }

    /// Run `steps` in order, stopping at the first failure.
    pub async fn send_sequence(&self, steps: &[CommandStep]) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(steps.len());
        for step in steps {
            let response = match &step.expect {
                Some(expect) => self.execute(&step.command, expect).await?,
                None => self.get_data(&step.command).await?,
            };
            responses.push(response);
        }
        Ok(responses)
    }

    async fn run<M: PromptMatcher>(&self, command: &str, terminator: &M) -> Result<Response> {
        let mut guard = self
            .transport
            .try_lock()
            .map_err(|_| SessionError::Busy)?;
        let transport = guard.as_mut().ok_or(SessionError::Closed)?;

        executor::execute(
            transport,
            command,
            terminator,
            self.echo_match,
            self.command_timeout,
            &self.cancel,
        )
        .await
    }

    /// The prompt captured during the handshake.
    pub fn banner(&self) -> &str {
        &self.banner
    }

    /// Whether the handshake succeeded and the session is still open.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// Close the transport.
    ///
    /// An in-flight command is cancelled and fails with
    /// [`SessionError::Closed`]. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        self.cancel.cancel();
        self.authenticated.store(false, Ordering::SeqCst);

        let transport = self.transport.lock().await.take();
        if let Some(mut transport) = transport {
            debug!("closing session to {}:{}", self.host, self.port);
            transport.close().await?;
        }
        Ok(())
    }

    /// The device host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The device port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The login user.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The protocol in use.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The handshake timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The per-command timeout.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Change the per-command timeout.
    pub fn set_command_timeout(&mut self, timeout: Duration) {
        self.command_timeout = timeout;
    }
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("banner", &self.banner)
            .field("authenticated", &self.authenticated.load(Ordering::SeqCst))
            .finish()
    }
}
