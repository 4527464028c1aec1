//! # netprompt
//!
//! Async CLI automation for network devices over SSH and telnet.
//!
//! netprompt opens an interactive session to a router or switch, logs in,
//! remembers the device prompt, and then runs commands by writing a line and
//! reading until a terminating pattern shows up after the command's echo.
//!
//! ## Features
//!
//! - SSH via russh, including legacy key exchange and CBC ciphers
//! - Telnet with option negotiation and in-band login
//! - Port detection (22, then 23) when no port is given
//! - Per-command deadlines that keep the output read so far
//! - A scripted in-memory transport for testing automation offline
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use netprompt::SessionBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netprompt::Error> {
//!     let session = SessionBuilder::new("192.0.2.1")
//!         .username("admin")
//!         .password("secret")
//!         .command_timeout(Duration::from_secs(30))
//!         .connect()
//!         .await?;
//!
//!     println!("prompt: {}", session.banner());
//!     session.enter_command("terminal length 0", "[>#]").await?;
//!
//!     let response = session.get_data("show version").await?;
//!     println!("{}", response);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use channel::{EchoMatch, Pattern, PromptMatcher};
pub use error::{Error, Result};
pub use session::{CommandStep, Response, Session, SessionBuilder};
pub use transport::{Protocol, SessionConfig, Transport};
