//! Byte transports an SMTP session can run over.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use super::tls::{TlsVerification, build_connector, server_name};
use crate::error::{Error, Result};

/// A duplex byte stream that can be upgraded to TLS in place.
///
/// Closing is done through [`tokio::io::AsyncWriteExt::shutdown`].
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + Sized {
    /// Performs the TLS handshake over this stream.
    ///
    /// `hostname` is the name the certificate is checked against.
    fn upgrade_to_tls(
        self,
        hostname: &str,
        verification: &TlsVerification,
    ) -> impl Future<Output = Result<Self>> + Send;

    /// Returns true if the stream is TLS-encrypted.
    fn is_tls(&self) -> bool;
}

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(TcpStream),
    /// TLS-encrypted connection (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl Transport for SmtpStream {
    async fn upgrade_to_tls(self, hostname: &str, verification: &TlsVerification) -> Result<Self> {
        let tcp = match self {
            Self::Tcp(tcp) => tcp,
            Self::Tls(_) => return Err(Error::InvalidState("Already using TLS".into())),
        };

        let connector = build_connector(verification)?;
        let name = server_name(hostname)?;
        let tls = connector.connect(name, tcp).await.map_err(unwrap_tls_error)?;
        Ok(Self::Tls(Box::new(tls)))
    }

    fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

/// Surfaces the rustls error hidden inside the handshake's `io::Error`.
fn unwrap_tls_error(err: io::Error) -> Error {
    let kind = err.kind();
    match err.into_inner() {
        Some(inner) => match inner.downcast::<rustls::Error>() {
            Ok(tls) => Error::Tls(*tls),
            Err(other) => Error::Io(io::Error::new(kind, other)),
        },
        None => Error::Io(io::Error::from(kind)),
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails or `timeout` elapses first.
pub async fn connect(hostname: &str, port: u16, timeout: Option<Duration>) -> Result<SmtpStream> {
    let addr = format!("{hostname}:{port}");
    tracing::debug!(%addr, "connecting");

    let connecting = TcpStream::connect(&addr);
    let stream = match timeout {
        Some(limit) => tokio::time::timeout(limit, connecting)
            .await
            .map_err(|_| Error::Timeout)??,
        None => connecting.await?,
    };
    Ok(SmtpStream::Tcp(stream))
}
