//! DATA phase encoding (RFC 5321 section 4.5.2).
//!
//! Line endings are normalised to CRLF and any line starting with `.` gets
//! an extra leading dot. The encoder keeps state between chunks so a message
//! can be written in pieces.

/// Incremental encoder for the DATA body.
#[derive(Debug, Clone)]
pub struct DotStuffer {
    at_line_start: bool,
    after_cr: bool,
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DotStuffer {
    /// Creates an encoder positioned at the start of a line.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            at_line_start: true,
            after_cr: false,
        }
    }

    /// Encodes a chunk of message bytes.
    #[must_use]
    pub fn encode(&mut self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len() + input.len() / 32 + 2);
        for &b in input {
            match b {
                b'\n' => {
                    if !self.after_cr {
                        out.push(b'\r');
                    }
                    out.push(b'\n');
                    self.at_line_start = true;
                    self.after_cr = false;
                }
                b'\r' => {
                    out.push(b'\r');
                    self.at_line_start = false;
                    self.after_cr = true;
                }
                _ => {
                    if self.at_line_start && b == b'.' {
                        out.push(b'.');
                    }
                    out.push(b);
                    self.at_line_start = false;
                    self.after_cr = false;
                }
            }
        }
        out
    }

    /// Returns the bytes that end the DATA phase: a line break if the body
    /// did not end with one, then `.` CRLF.
    #[must_use]
    pub fn finish(self) -> &'static [u8] {
        if self.at_line_start {
            b".\r\n"
        } else if self.after_cr {
            b"\n.\r\n"
        } else {
            b"\r\n.\r\n"
        }
    }
}
