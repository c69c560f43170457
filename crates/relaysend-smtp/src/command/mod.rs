//! SMTP command builder.

use crate::types::{Address, AuthMechanism};

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication, without an initial response
    Auth(AuthMechanism),
    /// Base64 response line inside an AUTH exchange
    AuthResponse(String),
    /// `*` - Abort an AUTH exchange (RFC 4954)
    AuthCancel,
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Helo { hostname } => {
                buf.extend_from_slice(b"HELO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::Ehlo { hostname } => {
                buf.extend_from_slice(b"EHLO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::StartTls => {
                buf.extend_from_slice(b"STARTTLS");
            }
            Self::Auth(mechanism) => {
                buf.extend_from_slice(b"AUTH ");
                buf.extend_from_slice(mechanism.as_str().as_bytes());
            }
            Self::AuthResponse(resp) => {
                buf.extend_from_slice(resp.as_bytes());
            }
            Self::AuthCancel => {
                buf.push(b'*');
            }
            Self::MailFrom { from } => {
                buf.extend_from_slice(b"MAIL FROM:<");
                buf.extend_from_slice(from.as_str().as_bytes());
                buf.push(b'>');
            }
            Self::RcptTo { to } => {
                buf.extend_from_slice(b"RCPT TO:<");
                buf.extend_from_slice(to.as_str().as_bytes());
                buf.push(b'>');
            }
            Self::Data => {
                buf.extend_from_slice(b"DATA");
            }
            Self::Quit => {
                buf.extend_from_slice(b"QUIT");
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command verb, safe to log (never includes credentials).
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Helo { .. } => "HELO",
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth(_) => "AUTH",
            Self::AuthResponse(_) => "AUTH-RESPONSE",
            Self::AuthCancel => "AUTH-CANCEL",
            Self::MailFrom { .. } => "MAIL",
            Self::RcptTo { .. } => "RCPT",
            Self::Data => "DATA",
            Self::Quit => "QUIT",
        }
    }
}
