//! # relaysend-smtp
//!
//! SMTP submission client for sending one plain-text message through an
//! authenticated relay (RFC 5321, RFC 3207, RFC 4954).
//!
//! ## Features
//!
//! - **Opportunistic STARTTLS** with verified certificates by default
//! - **AUTH LOGIN** with exact `Username:` / `Password:` prompt matching
//! - **Guaranteed release**: the transport is closed exactly once, whichever
//!   step fails
//! - **Deterministic output**: `From`, `To`, `Subject` in a fixed order
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaysend_smtp::{Credentials, Message, SessionConfig, send};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), relaysend_smtp::SendError> {
//!     let config = SessionConfig::new("smtp.example.com", 587);
//!     let credentials = Credentials::new("me@example.com", "secret");
//!     let message = Message::new("me@example.com", "you@example.com", "Hi", "Hello!");
//!     send(&config, &credentials, &message).await
//! }
//! ```
//!
//! ## Session states
//!
//! ```text
//! Idle → Connected → HelloSent → [TlsUpgraded] → Authenticated
//!      → SenderSet → RecipientSet → DataOpen → DataSent → Closed
//! ```
//!
//! Any failure goes straight to `Closed`.
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transport, TLS and the session client
//! - [`parser`]: Response parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod connection;
pub mod data;
mod error;
mod message;
pub mod parser;
mod session;
pub mod types;

pub use auth::Credentials;
pub use connection::{
    Client, ServerInfo, SessionState, SmtpStream, TlsVerification, Transport, connect,
};
pub use error::{Error, Result, SendError};
pub use message::Message;
pub use session::{
    DEFAULT_CLIENT_ID, DEFAULT_PORT, SessionConfig, send, send_email, send_over,
};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
