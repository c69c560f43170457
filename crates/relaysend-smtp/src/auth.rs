//! LOGIN SASL mechanism.
//!
//! The server prompts with two base64 challenges that decode to the literal
//! strings `Username:` and `Password:`; the client answers each with the
//! base64 of the matching credential. Anything else is refused.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Username/password pair used for AUTH LOGIN.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Prompt that must be answered with the username.
pub const USERNAME_PROMPT: &[u8] = b"Username:";
/// Prompt that must be answered with the password.
pub const PASSWORD_PROMPT: &[u8] = b"Password:";

/// Challenge/response state for the LOGIN mechanism.
#[derive(Debug, Clone, Copy)]
pub struct LoginAuth<'a> {
    credentials: &'a Credentials,
}

impl<'a> LoginAuth<'a> {
    /// Creates the mechanism for a credential pair.
    #[must_use]
    pub const fn new(credentials: &'a Credentials) -> Self {
        Self { credentials }
    }

    /// Answers a decoded server challenge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedChallenge`] with the challenge text if it is
    /// neither prompt.
    pub fn respond(&self, challenge: &[u8]) -> Result<&'a str> {
        match challenge {
            USERNAME_PROMPT => Ok(self.credentials.username()),
            PASSWORD_PROMPT => Ok(self.credentials.password()),
            other => Err(Error::UnexpectedChallenge(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Decodes and answers a base64 challenge, returning the base64 response.
    ///
    /// # Errors
    ///
    /// Returns an error if the challenge is not valid base64 or is not a
    /// known prompt.
    pub fn respond_encoded(&self, challenge: &str) -> Result<String> {
        let decoded = STANDARD.decode(challenge.trim()).map_err(|e| {
            Error::Protocol(format!("invalid base64 challenge {challenge:?}: {e}"))
        })?;
        let answer = self.respond(&decoded)?;
        Ok(STANDARD.encode(answer.as_bytes()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("c@d.com", "hunter2")
    }

    #[test]
    fn answers_both_prompts_in_any_order() {
        let creds = creds();
        let auth = LoginAuth::new(&creds);
        assert_eq!(auth.respond(b"Password:").unwrap(), "hunter2");
        assert_eq!(auth.respond(b"Username:").unwrap(), "c@d.com");
    }

    #[test]
    fn prompts_are_case_sensitive() {
        let creds = creds();
        let auth = LoginAuth::new(&creds);
        let err = auth.respond(b"username:").unwrap_err();
        assert!(matches!(err, Error::UnexpectedChallenge(ref text) if text == "username:"));
    }

    #[test]
    fn encoded_round() {
        let creds = creds();
        let auth = LoginAuth::new(&creds);
        // "VXNlcm5hbWU6" = "Username:"
        assert_eq!(auth.respond_encoded("VXNlcm5hbWU6").unwrap(), "Y0BkLmNvbQ==");
        // "UGFzc3dvcmQ6" = "Password:"
        assert_eq!(auth.respond_encoded("UGFzc3dvcmQ6").unwrap(), "aHVudGVyMg==");
    }

    #[test]
    fn rejects_bad_base64() {
        let creds = creds();
        let auth = LoginAuth::new(&creds);
        assert!(matches!(
            auth.respond_encoded("not base64!"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let shown = format!("{:?}", creds());
        assert!(shown.contains("c@d.com"));
        assert!(!shown.contains("hunter2"));
    }
}
