//! The single plain-text message being sent.

use std::fmt::Write;

/// A message with exactly one sender and one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    from: String,
    to: String,
    subject: String,
    body: String,
}

impl Message {
    /// Creates a message.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Sender mailbox.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Recipient mailbox.
    #[must_use]
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Header fields in wire order.
    #[must_use]
    pub fn headers(&self) -> [(&'static str, &str); 3] {
        [
            ("From", self.from.as_str()),
            ("To", self.to.as_str()),
            ("Subject", self.subject.as_str()),
        ]
    }

    /// Renders headers, a blank line and the body.
    ///
    /// No MIME structure or encoding is applied.
    #[must_use]
    pub fn compose(&self) -> String {
        let mut message = String::with_capacity(self.body.len() + 128);
        for (name, value) in self.headers() {
            let _ = write!(message, "{name}: {value}\r\n");
        }
        message.push_str("\r\n");
        message.push_str(&self.body);
        message
    }
}
