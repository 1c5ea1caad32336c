//! TLS transport implementation.
//!
//! The gateway terminates TLS with a self-signed certificate on its private
//! address, so certificate and hostname verification are disabled — the
//! trust anchor here is physical proximity to the device network, exactly as
//! the reference implementations treat it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{self, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio_rustls::TlsConnector;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Default gateway address on its private network.
pub const DEFAULT_HOST: &str = "192.168.91.1";

/// Default gateway TLS port.
pub const DEFAULT_PORT: u16 = 443;

/// How long one `recv` poll waits for bytes before returning empty.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read buffer used per poll.
const READ_CHUNK: usize = 2048;

/// Configuration for TLS transport.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Gateway host name or address.
    pub host: String,
    /// Gateway port.
    pub port: u16,
}

impl TlsConfig {
    /// Creates a configuration for the given host with the default port.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

/// Accepts any certificate the gateway presents.
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
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

/// TLS transport for TEDAPI communication.
pub struct TlsTransport {
    config: TlsConfig,
    stream: Option<TlsStream<TcpStream>>,
}

impl TlsTransport {
    /// Creates a new TLS transport with the given configuration.
    #[must_use]
    pub const fn new(config: TlsConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// Creates a new TLS transport for the given host with default settings.
    #[must_use]
    pub fn with_host(host: impl Into<String>) -> Self {
        Self::new(TlsConfig::new(host))
    }

    fn connector() -> TlsConnector {
        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
            .with_no_client_auth();
        TlsConnector::from(Arc::new(config))
    }
}

impl Transport for TlsTransport {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.stream.is_some() {
                return Ok(());
            }

            tracing::info!(
                "connecting to gateway {}:{}",
                self.config.host,
                self.config.port
            );

            let tcp = TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;
            let server_name = ServerName::try_from(self.config.host.clone()).map_err(|_| {
                Error::InvalidHost {
                    host: self.config.host.clone(),
                }
            })?;

            let stream = Self::connector().connect(server_name, tcp).await?;
            self.stream = Some(stream);

            tracing::info!("TLS session established");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if let Some(mut stream) = self.stream.take() {
                tracing::debug!("closing gateway connection");
                // Best effort: the gateway often closes first
                let _ = stream.shutdown().await;
            }
            Ok(())
        })
    }

    fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
            tracing::trace!("sending {} bytes", data.len());
            stream.write_all(&data).await?;
            stream.flush().await?;
            Ok(())
        })
    }

    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + '_>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
            let mut buf = [0u8; READ_CHUNK];
            match tokio::time::timeout(POLL_INTERVAL, stream.read(&mut buf)).await {
                Ok(Ok(0)) => {
                    tracing::debug!("gateway closed the connection");
                    self.stream = None;
                    Ok(Bytes::new())
                }
                Ok(Ok(n)) => {
                    tracing::trace!("received {n} bytes");
                    Ok(Bytes::copy_from_slice(&buf[..n]))
                }
                Ok(Err(e)) => {
                    self.stream = None;
                    Err(Error::Io(e))
                }
                Err(_) => Ok(Bytes::new()), // nothing available this poll
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_config_defaults() {
        let config = TlsConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_tls_config_builder() {
        let config = TlsConfig::new("10.0.0.2").port(8443);
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, 8443);
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let mut transport = TlsTransport::new(TlsConfig::default());
        assert!(!transport.is_connected());
        let err = transport.send(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }
}
