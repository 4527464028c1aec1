//! SSH transport implementation using russh.

use std::borrow::Cow;
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, trace};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg, Disconnect, Pty, Preferred, cipher, kex};
use secrecy::ExposeSecret;

use super::Transport;
use super::config::SessionConfig;
use crate::error::TransportError;

/// Key exchange order: modern first, then the SHA-1 groups older network
/// gear still insists on.
const KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_GEX_SHA256,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
    kex::DH_G14_SHA1,
    kex::DH_GEX_SHA1,
    kex::DH_G1_SHA1,
    kex::EXTENSION_SUPPORT_AS_CLIENT,
    kex::EXTENSION_OPENSSH_STRICT_KEX_AS_CLIENT,
];

/// Cipher order, with CBC modes (3DES last) for legacy devices.
const CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
    cipher::AES_256_CBC,
    cipher::AES_192_CBC,
    cipher::AES_128_CBC,
    cipher::TRIPLE_DES_CBC,
];

/// Terminal modes for the PTY: no local echo, 14.4 kbaud.
const TERMINAL_MODES: &[(Pty, u32)] = &[
    (Pty::ECHO, 0),
    (Pty::TTY_OP_ISPEED, 14400),
    (Pty::TTY_OP_OSPEED, 14400),
];

/// SSH transport: an authenticated connection with one interactive shell.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The shell channel.
    channel: Channel<Msg>,

    closed: bool,
}

impl SshTransport {
    /// Connect, authenticate with the configured password and start a shell.
    ///
    /// The whole setup is bounded by the handshake timeout.
    pub async fn connect(config: &SessionConfig) -> Result<Self, TransportError> {
        tokio::time::timeout(config.timeout, Self::establish(config))
            .await
            .map_err(|_| TransportError::Timeout(config.timeout))?
    }

    async fn establish(config: &SessionConfig) -> Result<Self, TransportError> {
        let ssh_config = Arc::new(client::Config {
            preferred: Preferred {
                kex: Cow::Borrowed(KEX_ORDER),
                cipher: Cow::Borrowed(CIPHERS),
                ..Default::default()
            },
            ..Default::default()
        });

        let handler = SshHandler {
            host: config.host.clone(),
        };

        let mut session =
            client::connect(ssh_config, (config.host.as_str(), config.port), handler).await?;
        debug!("{} SSH connection established", config.socket_addr());

        let success = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await?
            .success();
        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            });
        }

        let channel = Self::open_shell(&session, config)
            .await
            .map_err(TransportError::ChannelOpen)?;
        debug!("{} shell request successful", config.socket_addr());

        Ok(Self {
            session,
            channel,
            closed: false,
        })
    }

    /// Open a session channel with a PTY and a shell on it.
    async fn open_shell(
        session: &Handle<SshHandler>,
        config: &SessionConfig,
    ) -> Result<Channel<Msg>, russh::Error> {
        let channel = session.channel_open_session().await?;

        channel
            .request_pty(
                true,
                "xterm",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                TERMINAL_MODES,
            )
            .await?;

        channel.request_shell(true).await?;

        Ok(channel)
    }
}

impl Transport for SshTransport {
    async fn read(&mut self) -> Result<Option<Bytes>, TransportError> {
        if self.closed {
            return Err(TransportError::Disconnected);
        }
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    debug!("SSH channel reached end of stream");
                    return Ok(None);
                }
                Some(msg) => trace!("ignoring channel message: {:?}", msg),
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Disconnected);
        }
        self.channel.data(data).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.channel.eof().await {
            debug!("failed to send channel EOF: {}", e);
        }
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        // Host keys are not verified.
        debug!("accepting host key for {}", self.host);
        Ok(true)
    }
}
