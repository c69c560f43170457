//! One-shot send: connect, hello, optional STARTTLS, AUTH LOGIN, envelope,
//! DATA, close.
//!
//! The transport is closed exactly once on every path. When a step fails,
//! that failure is returned and any error from closing is dropped.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::auth::Credentials;
use crate::connection::{Client, TlsVerification, Transport, connect};
use crate::error::SendError;
use crate::message::Message;
use crate::types::Address;

/// Identity sent with EHLO unless configured otherwise.
pub const DEFAULT_CLIENT_ID: &str = "localhost";

/// Submission port used when none is given.
pub const DEFAULT_PORT: u16 = 587;

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Relay hostname; also the name checked against the TLS certificate.
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// EHLO/HELO identity.
    pub client_id: String,
    /// Certificate verification for STARTTLS.
    pub tls: TlsVerification,
    /// Bound on establishing the TCP connection. `None` waits forever.
    pub connect_timeout: Option<Duration>,
    /// Bound on reading the greeting, on each command together with its
    /// reply, and on each body write. `None` waits forever.
    pub io_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Creates a configuration with verified TLS and no timeouts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            tls: TlsVerification::default(),
            connect_timeout: None,
            io_timeout: None,
        }
    }

    /// Sets the EHLO identity.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Sets the certificate verification policy.
    #[must_use]
    pub fn tls(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }

    /// Applies the same limit to connecting and to every round trip.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self.io_timeout = Some(timeout);
        self
    }
}

/// Sends `message` through the relay described by `config`.
///
/// # Errors
///
/// Returns the first failing step; see [`SendError`].
pub async fn send(
    config: &SessionConfig,
    credentials: &Credentials,
    message: &Message,
) -> Result<(), SendError> {
    let stream = connect(&config.host, config.port, config.connect_timeout)
        .await
        .map_err(SendError::Connect)?;
    send_over(stream, config, credentials, message).await
}

/// Runs the send sequence over an already connected transport.
///
/// `config.host` and `config.port` are only used for TLS and logging.
///
/// # Errors
///
/// Returns the first failing step; see [`SendError`].
pub async fn send_over<S: Transport>(
    stream: S,
    config: &SessionConfig,
    credentials: &Credentials,
    message: &Message,
) -> Result<(), SendError> {
    let mut client = Client::new(stream, config.io_timeout);

    let outcome = run(&mut client, config, credentials, message).await;
    let closed = client.close().await;

    match (outcome, closed) {
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                debug!(error = %close_err, "close failed after earlier error");
            }
            warn!(host = %config.host, state = %client.state(), error = %e, "send failed");
            Err(e)
        }
        (Ok(()), Err(e)) => Err(SendError::Close(e)),
        (Ok(()), Ok(())) => {
            info!(host = %config.host, port = config.port, to = message.to(), "message sent");
            Ok(())
        }
    }
}

/// Convenience wrapper taking the flat parameter list: the sender doubles as
/// the LOGIN username, with default TLS verification and no timeouts.
///
/// # Errors
///
/// Returns the first failing step; see [`SendError`].
pub async fn send_email(
    to: &str,
    subject: &str,
    body: &str,
    from: &str,
    password: &str,
    host: &str,
    port: u16,
) -> Result<(), SendError> {
    let message = Message::new(from, to, subject, body);
    let credentials = Credentials::new(from, password);
    send(&SessionConfig::new(host, port), &credentials, &message).await
}

async fn run<S: Transport>(
    client: &mut Client<S>,
    config: &SessionConfig,
    credentials: &Credentials,
    message: &Message,
) -> Result<(), SendError> {
    client.read_greeting().await.map_err(SendError::Connect)?;
    client
        .hello(&config.client_id)
        .await
        .map_err(SendError::Hello)?;

    if client.server_info().supports_starttls() {
        client
            .starttls(&config.host, &config.tls)
            .await
            .map_err(SendError::StartTls)?;
    } else {
        warn!(host = %config.host, "STARTTLS not offered, continuing in cleartext");
    }

    client
        .auth_login(credentials)
        .await
        .map_err(SendError::Auth)?;

    let from = Address::new(message.from()).map_err(SendError::Sender)?;
    client.mail_from(&from).await.map_err(SendError::Sender)?;

    let to = Address::new(message.to()).map_err(SendError::Recipient)?;
    client.rcpt_to(&to).await.map_err(SendError::Recipient)?;

    client.data().await.map_err(SendError::DataOpen)?;
    client
        .write_data(message.compose().as_bytes())
        .await
        .map_err(SendError::DataWrite)?;
    client.finish_data().await.map_err(SendError::DataClose)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = SessionConfig::new("mail.example.com", DEFAULT_PORT);
        assert_eq!(config.client_id, "localhost");
        assert!(matches!(config.tls, TlsVerification::WebPki));
        assert!(config.connect_timeout.is_none());
        assert!(config.io_timeout.is_none());
    }

    #[test]
    fn config_builders() {
        let config = SessionConfig::new("mail.example.com", 2525)
            .client_id("relay.example.org")
            .tls(TlsVerification::AcceptInvalidCerts)
            .timeout(Duration::from_secs(10));
        assert_eq!(config.client_id, "relay.example.org");
        assert!(matches!(config.tls, TlsVerification::AcceptInvalidCerts));
        assert_eq!(config.io_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
    }
}
