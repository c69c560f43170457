//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP protocol error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected or malformed response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// A command argument would break the command line.
    #[error("A line must not contain CR or LF: {0:?}")]
    InvalidLine(String),

    /// The server sent a LOGIN challenge we do not know how to answer.
    #[error("unexpected server challenge: {0}")]
    UnexpectedChallenge(String),

    /// Hostname cannot be used as a TLS server name.
    #[error("Invalid TLS server name: {0}")]
    InvalidTlsName(String),

    /// Trust anchors could not be loaded.
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    /// Operation did not complete within the configured timeout.
    #[error("Operation timed out")]
    Timeout,
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 400 && *code < 500)
    }
}

/// Failure of a single send attempt, tagged with the step that failed.
///
/// Every variant carries the protocol-level [`Error`] as its source.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The transport could not be established or the greeting was refused.
    #[error("failed to connect to SMTP server: {0}")]
    Connect(#[source] Error),

    /// EHLO (and the HELO fallback) was rejected.
    #[error("failed to send EHLO command: {0}")]
    Hello(#[source] Error),

    /// STARTTLS was advertised but the upgrade failed.
    #[error("failed to start TLS: {0}")]
    StartTls(#[source] Error),

    /// Credentials rejected or an unknown challenge was received.
    #[error("authentication failed: {0}")]
    Auth(#[source] Error),

    /// MAIL FROM was refused.
    #[error("failed to set sender: {0}")]
    Sender(#[source] Error),

    /// RCPT TO was refused.
    #[error("failed to set recipient: {0}")]
    Recipient(#[source] Error),

    /// DATA was refused.
    #[error("failed to open data connection: {0}")]
    DataOpen(#[source] Error),

    /// Writing the message body failed.
    #[error("failed to write message: {0}")]
    DataWrite(#[source] Error),

    /// The end-of-data marker was not accepted.
    #[error("failed to close data connection: {0}")]
    DataClose(#[source] Error),

    /// Session teardown failed after an otherwise successful send.
    #[error("failed to close SMTP session: {0}")]
    Close(#[source] Error),
}

impl SendError {
    /// Returns the underlying protocol error.
    #[must_use]
    pub const fn inner(&self) -> &Error {
        match self {
            Self::Connect(e)
            | Self::Hello(e)
            | Self::StartTls(e)
            | Self::Auth(e)
            | Self::Sender(e)
            | Self::Recipient(e)
            | Self::DataOpen(e)
            | Self::DataWrite(e)
            | Self::DataClose(e)
            | Self::Close(e) => e,
        }
    }
}
