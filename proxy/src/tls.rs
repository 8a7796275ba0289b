use async_trait::async_trait;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::Acceptor;
use rustls::ServerConfig;
use rustls_pemfile::{certs, private_key};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tokio_rustls::LazyConfigAcceptor;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),

    #[error("client did not send a server name")]
    MissingServerName,

    #[error("no certificate available for {name}: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("failed to parse PEM data: {0}")]
    Pem(#[source] std::io::Error),

    #[error("no certificates found in PEM data")]
    NoCertificate,

    #[error("no private key found in PEM data")]
    NoPrivateKey,

    #[error("invalid TLS configuration: {0}")]
    Config(#[from] rustls::Error),
}

/// Certificate chain and matching key for one server name.
#[derive(Debug)]
pub struct CertificatePair {
    pub chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

/// Source of certificates, consulted once per TLS handshake.
#[async_trait]
pub trait CertificateProvider: Send + Sync {
    async fn certificate(&self, server_name: &str) -> Result<CertificatePair, TlsError>;
}

/// Parse a PEM bundle holding a private key and a certificate chain, in
/// either order.
pub fn parse_pem_pair(pem: &[u8]) -> Result<CertificatePair, TlsError> {
    let chain: Vec<_> = certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(TlsError::Pem)?;

    if chain.is_empty() {
        return Err(TlsError::NoCertificate);
    }

    let key = private_key(&mut &pem[..])
        .map_err(TlsError::Pem)?
        .ok_or(TlsError::NoPrivateKey)?;

    Ok(CertificatePair { chain, key })
}

/// Build the rustls server configuration for a single handshake.
pub fn server_config(pair: CertificatePair) -> Result<Arc<ServerConfig>, TlsError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(pair.chain, pair.key)?;

    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

/// Complete a TLS handshake, choosing the certificate from the ClientHello's
/// server name.
pub async fn accept(
    stream: TcpStream,
    provider: &dyn CertificateProvider,
) -> Result<TlsStream<TcpStream>, TlsError> {
    let start = LazyConfigAcceptor::new(Acceptor::default(), stream)
        .await
        .map_err(TlsError::Handshake)?;

    let server_name = start
        .client_hello()
        .server_name()
        .map(str::to_string)
        .ok_or(TlsError::MissingServerName)?;
    debug!("TLS handshake for {}", server_name);

    let pair = provider.certificate(&server_name).await?;
    let config = server_config(pair)?;

    start.into_stream(config).await.map_err(TlsError::Handshake)
}
