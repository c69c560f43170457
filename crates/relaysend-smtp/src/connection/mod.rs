//! SMTP connection management.

mod client;
mod tls;
mod transport;

pub use client::Client;
pub use tls::{TlsVerification, build_connector, load_pem_roots};
pub use transport::{SmtpStream, Transport, connect};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from the greeting and EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Checks whether the AUTH extension lists a mechanism.
    #[must_use]
    pub fn supports_auth(&self, mechanism: AuthMechanism) -> bool {
        self.extensions.iter().any(|ext| match ext {
            Extension::Auth(mechanisms) => mechanisms.contains(&mechanism),
            _ => false,
        })
    }
}

/// Position of a session in the fixed send sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    /// Transport exists, greeting not read yet.
    Idle,
    /// Greeting accepted.
    Connected,
    /// EHLO (or HELO) accepted.
    HelloSent,
    /// STARTTLS completed and EHLO repeated.
    TlsUpgraded,
    /// AUTH completed.
    Authenticated,
    /// MAIL FROM accepted.
    SenderSet,
    /// RCPT TO accepted.
    RecipientSet,
    /// DATA accepted, body being written.
    DataOpen,
    /// Message accepted by the server.
    DataSent,
    /// Transport released.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "mx.example.com".into(),
            extensions: lines.iter().map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn capability_queries() {
        let info = info(&["STARTTLS", "AUTH PLAIN LOGIN", "SIZE 1000"]);
        assert!(info.supports_starttls());
        assert!(info.supports_auth(AuthMechanism::Login));
        assert!(!info.supports_auth(AuthMechanism::CramMd5));
        assert!(info.supports(&Extension::Other("SIZE".into())));
    }

    #[test]
    fn empty_capabilities() {
        let info = info(&[]);
        assert!(!info.supports_starttls());
        assert!(!info.supports_auth(AuthMechanism::Login));
    }

    #[test]
    fn states_follow_send_order() {
        assert!(SessionState::Idle < SessionState::Connected);
        assert!(SessionState::HelloSent < SessionState::TlsUpgraded);
        assert!(SessionState::RecipientSet < SessionState::DataOpen);
        assert!(SessionState::DataSent < SessionState::Closed);
    }
}
