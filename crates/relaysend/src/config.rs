//! Settings read from `RELAYSEND_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use relaysend_smtp::connection::load_pem_roots;
use relaysend_smtp::{
    Credentials, DEFAULT_CLIENT_ID, DEFAULT_PORT, Message, SessionConfig, TlsVerification,
};
use thiserror::Error;

const DEFAULT_SUBJECT: &str = "Subject of the Email";
const DEFAULT_BODY: &str = "This is the body of the email.";

/// Errors while reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable has a value that cannot be used.
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The CA file could not be loaded.
    #[error("cannot load CA file {path:?}: {source}")]
    CaFile {
        /// Path from `RELAYSEND_CA_FILE`.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: relaysend_smtp::Error,
    },
}

/// Everything needed for one send.
#[derive(Debug, Clone)]
pub struct Config {
    /// Relay connection settings.
    pub session: SessionConfig,
    /// LOGIN credentials.
    pub credentials: Credentials,
    /// The message to send.
    pub message: Message,
}

impl Config {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is
    /// invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty counts as unset.
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let host = require("RELAYSEND_HOST")?;
        let port = match get("RELAYSEND_PORT") {
            Some(value) => match value.trim().parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "RELAYSEND_PORT",
                        value,
                        reason: "expected a port number between 1 and 65535",
                    });
                }
            },
            None => DEFAULT_PORT,
        };

        let from = require("RELAYSEND_FROM")?;
        let username = get("RELAYSEND_USERNAME").unwrap_or_else(|| from.clone());
        let password = require("RELAYSEND_PASSWORD")?;
        let to = require("RELAYSEND_TO")?;
        let subject = get("RELAYSEND_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        let body = get("RELAYSEND_BODY").unwrap_or_else(|| DEFAULT_BODY.to_string());

        let tls = tls_policy(get("RELAYSEND_TLS"), get("RELAYSEND_CA_FILE"))?;

        let mut session = SessionConfig::new(host, port)
            .client_id(get("RELAYSEND_CLIENT_ID").unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()))
            .tls(tls);
        if let Some(value) = get("RELAYSEND_TIMEOUT_SECS") {
            match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => session = session.timeout(Duration::from_secs(secs)),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "RELAYSEND_TIMEOUT_SECS",
                        value,
                        reason: "expected a positive number of seconds",
                    });
                }
            }
        }

        Ok(Self {
            session,
            credentials: Credentials::new(username, password),
            message: Message::new(from, to, subject, body),
        })
    }
}

fn tls_policy(
    mode: Option<String>,
    ca_file: Option<String>,
) -> Result<TlsVerification, ConfigError> {
    let insecure = match mode.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("verify") => false,
        Some("insecure") => true,
        Some(_) => {
            return Err(ConfigError::Invalid {
                var: "RELAYSEND_TLS",
                value: mode.unwrap_or_default(),
                reason: "expected `verify` or `insecure`",
            });
        }
    };

    match (insecure, ca_file) {
        (true, Some(_)) => Err(ConfigError::Invalid {
            var: "RELAYSEND_TLS",
            value: "insecure".to_string(),
            reason: "cannot be combined with RELAYSEND_CA_FILE",
        }),
        (true, None) => Ok(TlsVerification::AcceptInvalidCerts),
        (false, Some(path)) => {
            let path = PathBuf::from(path);
            let roots = load_pem_roots(&path).map_err(|source| ConfigError::CaFile {
                path: path.clone(),
                source,
            })?;
            Ok(TlsVerification::CustomRoots(roots))
        }
        (false, None) => Ok(TlsVerification::WebPki),
    }
}
