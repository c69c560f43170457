//! TLS connector construction and certificate verification policy.

use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;

use crate::error::{Error, Result};

/// How the server certificate is checked during STARTTLS.
#[derive(Debug, Clone, Default)]
pub enum TlsVerification {
    /// Verify against the bundled Mozilla root store.
    #[default]
    WebPki,
    /// Verify against an explicit set of trust anchors.
    CustomRoots(Vec<CertificateDer<'static>>),
    /// Accept any certificate. **Insecure**; must be chosen explicitly.
    AcceptInvalidCerts,
}

/// Loads PEM-encoded trust anchors from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no certificates.
pub fn load_pem_roots(path: impl AsRef<Path>) -> Result<Vec<CertificateDer<'static>>> {
    let path = path.as_ref();
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| Error::Certificate(format!("{}: {e:?}", path.display())))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Certificate(format!("{}: {e:?}", path.display())))?;

    if certs.is_empty() {
        return Err(Error::Certificate(format!(
            "{}: no certificates found",
            path.display()
        )));
    }
    Ok(certs)
}

/// Builds a TLS connector for the given verification policy.
///
/// # Errors
///
/// Returns an error if a custom root certificate is rejected.
pub fn build_connector(verification: &TlsVerification) -> Result<TlsConnector> {
    let config = match verification {
        TlsVerification::WebPki => {
            let root_store = RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
            };
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
        TlsVerification::CustomRoots(certs) => {
            let mut root_store = RootCertStore::empty();
            for cert in certs {
                root_store.add(cert.clone())?;
            }
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
        TlsVerification::AcceptInvalidCerts => {
            tracing::warn!("TLS certificate verification is disabled");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
                .with_no_client_auth()
        }
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Parses a hostname into a TLS server name.
pub(crate) fn server_name(hostname: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::InvalidTlsName(hostname.to_string()))
}

#[derive(Debug)]
struct AcceptAnyCert;

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builds_every_policy() {
        assert!(build_connector(&TlsVerification::WebPki).is_ok());
        assert!(build_connector(&TlsVerification::AcceptInvalidCerts).is_ok());
        assert!(build_connector(&TlsVerification::CustomRoots(Vec::new())).is_ok());
    }

    #[test]
    fn default_policy_verifies() {
        assert!(matches!(TlsVerification::default(), TlsVerification::WebPki));
    }

    #[test]
    fn rejects_garbage_root() {
        let bogus = CertificateDer::from(vec![0u8, 1, 2, 3]);
        let result = build_connector(&TlsVerification::CustomRoots(vec![bogus]));
        assert!(result.is_err());
    }

    #[test]
    fn missing_pem_file_is_an_error() {
        let err = load_pem_roots("/nonexistent/relaysend-roots.pem").unwrap_err();
        assert!(matches!(err, Error::Certificate(_)));
    }

    #[test]
    fn server_name_validation() {
        assert!(server_name("mail.example.com").is_ok());
        assert!(server_name("192.0.2.1").is_ok());
        assert!(matches!(server_name("bad host"), Err(Error::InvalidTlsName(_))));
    }
}
