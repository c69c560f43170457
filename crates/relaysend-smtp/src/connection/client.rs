//! SMTP client driving a single session.
//!
//! Methods take `&mut self` so the transport stays reachable on every error
//! path and [`Client::close`] can always release it.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, warn};

use super::tls::TlsVerification;
use super::transport::Transport;
use super::{ServerInfo, SessionState};
use crate::auth::{Credentials, LoginAuth};
use crate::command::Command;
use crate::data::DotStuffer;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};

/// LOGIN has exactly two prompts.
const MAX_LOGIN_CHALLENGES: usize = 2;

/// Longest reply line accepted, CRLF included.
const MAX_REPLY_LINE: usize = 1000;

/// Most lines accepted in one multi-line reply.
const MAX_REPLY_LINES: usize = 100;

/// SMTP client over a transport `S`.
#[derive(Debug)]
pub struct Client<S> {
    stream: Option<BufReader<S>>,
    server_info: ServerInfo,
    state: SessionState,
    client_id: String,
    io_timeout: Option<Duration>,
    data: Option<DotStuffer>,
    /// Set once the stream can no longer carry a clean QUIT.
    broken: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Client<S> {
    /// Wraps a freshly connected transport. The greeting is not read yet.
    #[must_use]
    pub fn new(stream: S, io_timeout: Option<Duration>) -> Self {
        Self {
            stream: Some(BufReader::new(stream)),
            server_info: ServerInfo::default(),
            state: SessionState::Idle,
            client_id: String::new(),
            io_timeout,
            data: None,
            broken: false,
        }
    }

    /// Returns the server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns where the session is in the send sequence.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Reads the `220` greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the server refuses service.
    pub async fn read_greeting(&mut self) -> Result<()> {
        self.require(&[SessionState::Idle], "greeting")?;

        let greeting = self.receive().await?.expect(ReplyCode::SERVICE_READY)?;

        // Extract hostname from greeting (first word after code)
        self.server_info.hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %self.server_info.hostname, "greeting received");

        self.state = SessionState::Connected;
        Ok(())
    }

    /// Sends EHLO, falling back to HELO if the server rejects it.
    ///
    /// # Errors
    ///
    /// Returns an error if both greetings are rejected or I/O fails.
    pub async fn hello(&mut self, client_id: &str) -> Result<()> {
        self.require(&[SessionState::Connected], "EHLO")?;
        validate_line(client_id)?;
        self.client_id = client_id.to_string();

        match self.ehlo().await {
            Ok(()) => {}
            Err(Error::SmtpError { code, message }) => {
                debug!(code, %message, "EHLO rejected, trying HELO");
                let cmd = Command::Helo {
                    hostname: self.client_id.clone(),
                };
                self.send_command(cmd).await?.expect_success()?;
                self.server_info.extensions = HashSet::new();
            }
            Err(e) => return Err(e),
        }

        self.state = SessionState::HelloSent;
        Ok(())
    }

    async fn ehlo(&mut self) -> Result<()> {
        let cmd = Command::Ehlo {
            hostname: self.client_id.clone(),
        };
        let reply = self.send_command(cmd).await?.expect_success()?;

        // Skip first line which is the greeting
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        debug!(extensions = ?self.server_info.extensions, "EHLO accepted");
        Ok(())
    }

    /// Authenticates with the LOGIN mechanism.
    ///
    /// An unknown challenge cancels the exchange with `*` before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedChallenge`] for an unknown prompt, or the
    /// server's rejection.
    pub async fn auth_login(&mut self, credentials: &Credentials) -> Result<()> {
        self.require(
            &[SessionState::HelloSent, SessionState::TlsUpgraded],
            "AUTH",
        )?;
        if !self.server_info.supports_auth(AuthMechanism::Login) {
            debug!("server does not list AUTH LOGIN, trying anyway");
        }

        let auth = LoginAuth::new(credentials);
        let mut reply = self
            .send_command(Command::Auth(AuthMechanism::Login))
            .await?;
        let mut challenges = 0;

        loop {
            match reply.code {
                ReplyCode::AUTH_SUCCESS => break,
                ReplyCode::AUTH_CONTINUE => {
                    challenges += 1;
                    let response = if challenges > MAX_LOGIN_CHALLENGES {
                        Err(Error::Protocol("too many LOGIN challenges".into()))
                    } else {
                        auth.respond_encoded(&reply.message_text())
                    };
                    match response {
                        Ok(encoded) => {
                            reply = self.send_command(Command::AuthResponse(encoded)).await?;
                        }
                        Err(e) => {
                            self.cancel_auth().await;
                            return Err(e);
                        }
                    }
                }
                _ => return Err(reply.into_error()),
            }
        }

        debug!(user = credentials.username(), "authenticated");
        self.state = SessionState::Authenticated;
        Ok(())
    }

    async fn cancel_auth(&mut self) {
        match self.send_command(Command::AuthCancel).await {
            Ok(reply) => debug!(code = reply.code.as_u16(), "AUTH cancelled"),
            Err(e) => debug!(error = %e, "AUTH cancel failed"),
        }
    }

    /// Declares the envelope sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the sender.
    pub async fn mail_from(&mut self, from: &Address) -> Result<()> {
        self.require(&[SessionState::Authenticated], "MAIL FROM")?;
        let cmd = Command::MailFrom { from: from.clone() };
        self.send_command(cmd).await?.expect_success()?;
        self.state = SessionState::SenderSet;
        Ok(())
    }

    /// Declares the envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt_to(&mut self, to: &Address) -> Result<()> {
        self.require(&[SessionState::SenderSet], "RCPT TO")?;
        let cmd = Command::RcptTo { to: to.clone() };
        self.send_command(cmd).await?.expect_success()?;
        self.state = SessionState::RecipientSet;
        Ok(())
    }

    /// Opens the DATA phase.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers `354`.
    pub async fn data(&mut self) -> Result<()> {
        self.require(&[SessionState::RecipientSet], "DATA")?;
        self.send_command(Command::Data)
            .await?
            .expect(ReplyCode::START_DATA)?;
        self.data = Some(DotStuffer::new());
        self.state = SessionState::DataOpen;
        Ok(())
    }

    /// Writes message bytes with CRLF normalisation and dot-stuffing.
    ///
    /// May be called several times while the DATA phase is open.
    ///
    /// # Errors
    ///
    /// Returns an error if DATA is not open or the write fails.
    pub async fn write_data(&mut self, message: &[u8]) -> Result<()> {
        let Some(stuffer) = self.data.as_mut() else {
            return Err(Error::InvalidState("DATA is not open".into()));
        };
        let encoded = stuffer.encode(message);
        self.write_raw(&encoded).await
    }

    /// Ends the DATA phase and waits for the server to accept the message.
    ///
    /// # Errors
    ///
    /// Returns an error if DATA is not open, I/O fails, or the message is
    /// rejected.
    pub async fn finish_data(&mut self) -> Result<()> {
        let Some(stuffer) = self.data.take() else {
            return Err(Error::InvalidState("DATA is not open".into()));
        };
        let reply = self.round_trip(stuffer.finish()).await?.expect_success()?;
        debug!(reply = %reply.message_text(), "message accepted");
        self.state = SessionState::DataSent;
        Ok(())
    }

    /// Sends QUIT when the stream is still usable, then shuts the transport
    /// down. Calling it again after the session is closed does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if QUIT fails. Shutdown problems are only logged.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }

        let quit = if self.broken || self.data.is_some() || self.stream.is_none() {
            Ok(())
        } else {
            self.quit().await
        };

        if let Some(mut stream) = self.stream.take() {
            let shutdown = stream.get_mut().shutdown();
            let result = match self.io_timeout {
                Some(limit) => tokio::time::timeout(limit, shutdown)
                    .await
                    .unwrap_or_else(|_| Err(std::io::ErrorKind::TimedOut.into())),
                None => shutdown.await,
            };
            if let Err(e) = result {
                debug!(error = %e, "transport shutdown failed");
            }
        }

        self.data = None;
        self.state = SessionState::Closed;
        quit
    }

    async fn quit(&mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.into_error());
        }
        Ok(())
    }

    fn require(&self, allowed: &[SessionState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "{operation} not allowed in state {}",
                self.state
            )))
        }
    }

    fn stream_mut(&mut self) -> Result<&mut BufReader<S>> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::InvalidState("connection is closed".into()))
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        debug!(command = cmd.verb(), "sending");
        self.round_trip(&cmd.serialize()).await
    }

    /// Writes `data` and reads the reply under one `io_timeout`.
    async fn round_trip(&mut self, data: &[u8]) -> Result<Reply> {
        let limit = self.io_timeout;
        let stream = self.stream_mut()?;
        let result = with_timeout(limit, async {
            stream.get_mut().write_all(data).await?;
            stream.get_mut().flush().await?;
            read_reply(&mut *stream).await
        })
        .await;
        self.track(result)
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let limit = self.io_timeout;
        let stream = self.stream_mut()?;
        let result = with_timeout(limit, async {
            stream.get_mut().write_all(data).await?;
            stream.get_mut().flush().await?;
            Ok::<(), Error>(())
        })
        .await;
        self.track(result)
    }

    async fn receive(&mut self) -> Result<Reply> {
        let limit = self.io_timeout;
        let stream = self.stream_mut()?;
        let result = with_timeout(limit, read_reply(stream)).await;
        self.track(result)
    }

    /// Marks the session broken after transport-level failures.
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if matches!(
            result,
            Err(Error::Io(_) | Error::Timeout | Error::Protocol(_) | Error::Tls(_))
        ) {
            self.broken = true;
        }
        result
    }
}

impl<S: Transport> Client<S> {
    /// Upgrades the connection with STARTTLS and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if STARTTLS was not advertised, or an
    /// error if it is refused or the handshake fails.
    pub async fn starttls(&mut self, hostname: &str, verification: &TlsVerification) -> Result<()> {
        self.require(&[SessionState::HelloSent], "STARTTLS")?;
        if !self.server_info.supports_starttls() {
            return Err(Error::InvalidState(
                "STARTTLS not advertised by server".into(),
            ));
        }

        self.send_command(Command::StartTls)
            .await?
            .expect(ReplyCode::SERVICE_READY)?;

        let reader = self.stream.take().ok_or_else(|| {
            Error::InvalidState("connection is closed".into())
        })?;
        if !reader.buffer().is_empty() {
            // Plaintext pipelined after the 220 could be injected by a
            // man in the middle; it must not survive into the TLS session.
            self.broken = true;
            self.stream = Some(reader);
            return Err(Error::Protocol(
                "unexpected data after STARTTLS reply".into(),
            ));
        }

        let upgraded = with_timeout(
            self.io_timeout,
            reader.into_inner().upgrade_to_tls(hostname, verification),
        )
        .await;
        let upgraded = match upgraded {
            Ok(stream) => stream,
            Err(e) => {
                // The socket went down with the failed handshake.
                self.broken = true;
                return Err(e);
            }
        };
        debug!(tls = upgraded.is_tls(), "TLS established");
        self.stream = Some(BufReader::new(upgraded));

        // Capabilities may differ once encrypted
        self.ehlo().await?;
        self.state = SessionState::TlsUpgraded;
        Ok(())
    }
}

/// Reads one complete (possibly multi-line) reply.
///
/// Lines longer than [`MAX_REPLY_LINE`] and replies with more than
/// [`MAX_REPLY_LINES`] lines are protocol errors.
async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Reply> {
    let mut lines = Vec::new();
    // Blank lines count too.
    for _ in 0..MAX_REPLY_LINES {
        let mut line = String::new();
        let n = (&mut *reader)
            .take(MAX_REPLY_LINE as u64)
            .read_line(&mut line)
            .await?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }
        if n == MAX_REPLY_LINE && !line.ends_with('\n') {
            return Err(Error::Protocol(format!(
                "reply line exceeds {MAX_REPLY_LINE} bytes"
            )));
        }

        let line = line.trim_end().to_string();
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);
        if is_last {
            return parse_reply(&lines);
        }
    }

    Err(Error::Protocol(format!(
        "reply exceeds {MAX_REPLY_LINES} lines"
    )))
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout)?,
        None => fut.await,
    }
}

fn validate_line(value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        warn!(?value, "refusing line break in command argument");
        return Err(Error::InvalidLine(value.to_string()));
    }
    Ok(())
}
