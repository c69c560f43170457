//! Envelope address type.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope.
///
/// No syntax checks are applied: a malformed mailbox is the server's to
/// reject. Only CR and LF are refused, since they would split the command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address contains CR or LF.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        if addr.contains(['\r', '\n']) {
            return Err(Error::InvalidAddress(format!(
                "{addr:?} contains a line break"
            )));
        }
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
