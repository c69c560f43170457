//! SMTP response parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from response lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// # Errors
///
/// Returns an error if the reply is malformed or the lines disagree on the code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Protocol("Empty reply".into()));
    };

    if first.len() < 3 || !first.is_char_boundary(3) {
        return Err(Error::Protocol(format!("Reply too short: {first}")));
    }

    let code_str = &first[0..3];
    let code = code_str
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {code_str}")))?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        if !line.starts_with(code_str) {
            return Err(Error::Protocol(format!(
                "Reply code changed mid-reply: {line}"
            )));
        }
        if line.len() >= 4 && line.is_char_boundary(4) {
            // Skip code and separator (e.g., "250-" or "250 ")
            message.push(line[4..].to_string());
        } else if line.len() == 3 {
            message.push(String::new());
        } else {
            return Err(Error::Protocol(format!("Malformed reply line: {line}")));
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Multi-line replies use `-` separator for continuation and ` ` for the last line.
/// A bare three-digit code is also a final line.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    match bytes.len() {
        3 => bytes.iter().all(u8::is_ascii_digit),
        n if n >= 4 => bytes[3] == b' ',
        _ => false,
    }
}
