//! SMTP extension types.

/// SMTP extensions discovered from EHLO response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication
    Auth(Vec<AuthMechanism>),
    /// Any other extension, keyed by its upper-cased keyword
    Other(String),
}

impl Extension {
    /// Parses an extension line from EHLO response.
    ///
    /// Keywords are matched case-insensitively.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Self::Other(String::new());
        };

        let keyword = keyword.to_ascii_uppercase();
        match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(parts.filter_map(AuthMechanism::parse).collect()),
            _ => Self::Other(keyword),
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - legacy plaintext, two challenge/response turns
    Login,
    /// CRAM-MD5 - challenge-response
    CramMd5,
    /// `XOAUTH2` - `OAuth2` (Google/Microsoft)
    XOAuth2,
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" => Some(Self::CramMd5),
            "XOAUTH2" => Some(Self::XOAuth2),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
            Self::XOAuth2 => "XOAUTH2",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod extension_parse_tests {
        use super::*;

        #[test]
        fn parse_starttls() {
            assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
            assert_eq!(Extension::parse("starttls"), Extension::StartTls);
        }

        #[test]
        fn parse_auth_mechanisms() {
            let Extension::Auth(mechs) = Extension::parse("AUTH PLAIN LOGIN GSSAPI") else {
                panic!("Expected Auth variant");
            };
            assert_eq!(mechs, vec![AuthMechanism::Plain, AuthMechanism::Login]);
        }

        #[test]
        fn parameters_of_other_keywords_are_dropped() {
            assert_eq!(
                Extension::parse("SIZE 52428800"),
                Extension::Other("SIZE".into())
            );
        }

        #[test]
        fn parse_other() {
            assert_eq!(
                Extension::parse("8bitmime"),
                Extension::Other("8BITMIME".into())
            );
            assert_eq!(Extension::parse(""), Extension::Other(String::new()));
        }
    }

    mod auth_mechanism_tests {
        use super::*;

        #[test]
        fn parse_known() {
            assert_eq!(AuthMechanism::parse("login"), Some(AuthMechanism::Login));
            assert_eq!(
                AuthMechanism::parse("CRAM-MD5"),
                Some(AuthMechanism::CramMd5)
            );
            assert_eq!(AuthMechanism::parse("NTLM"), None);
        }

        #[test]
        fn as_str_round_trips() {
            for mech in [
                AuthMechanism::Plain,
                AuthMechanism::Login,
                AuthMechanism::CramMd5,
                AuthMechanism::XOAuth2,
            ] {
                assert_eq!(AuthMechanism::parse(mech.as_str()), Some(mech));
            }
        }
    }
}
