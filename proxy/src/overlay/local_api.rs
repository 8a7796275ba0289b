use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use std::path::PathBuf;
use tokio::net::UnixStream;
use tracing::debug;

use super::types::{StartOptions, Status};
use super::{OverlayControl, OverlayError};
use crate::tls::{parse_pem_pair, CertificatePair, CertificateProvider, TlsError};

const LOCAL_API_HOST: &str = "local-tailscaled.sock";

/// Client for the daemon's local HTTP API, spoken over its Unix socket.
pub struct LocalApiClient {
    socket: PathBuf,
}

impl LocalApiClient {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    async fn request(&self, method: Method, path: &str, body: Bytes) -> Result<Bytes, OverlayError> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|source| OverlayError::Connect {
                socket: self.socket.clone(),
                source,
            })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("Local API connection closed: {}", e);
            }
        });

        debug!("Local API {} {}", method, path);
        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header(HOST, LOCAL_API_HOST);
        if !body.is_empty() {
            req = req.header(CONTENT_TYPE, "application/json");
        }
        let req = req.body(Full::new(body))?;

        let resp = sender.send_request(req).await?;
        let status = resp.status();
        let body = resp.into_body().collect().await?.to_bytes();

        if !status.is_success() {
            return Err(OverlayError::Api {
                status,
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        Ok(body)
    }

    async fn get(&self, path: &str) -> Result<Bytes, OverlayError> {
        self.request(Method::GET, path, Bytes::new()).await
    }

    /// Apply prefs and start the backend. Returns once the daemon has taken
    /// the request, not once the node is running.
    pub async fn start(&self, options: &StartOptions) -> Result<(), OverlayError> {
        let body = serde_json::to_vec(options)?;
        self.request(Method::POST, "/localapi/v0/start", Bytes::from(body))
            .await?;
        Ok(())
    }

    /// Ask the backend for an interactive login URL. It shows up as
    /// `AuthURL` in later status answers.
    pub async fn login_interactive(&self) -> Result<(), OverlayError> {
        self.request(Method::POST, "/localapi/v0/login-interactive", Bytes::new())
            .await?;
        Ok(())
    }

    /// Fetch the PEM key and certificate chain for a certificate domain.
    pub async fn cert_pair(&self, domain: &str) -> Result<Bytes, OverlayError> {
        self.get(&format!("/localapi/v0/cert/{}?type=pair", domain))
            .await
    }
}

#[async_trait]
impl OverlayControl for LocalApiClient {
    async fn status(&self) -> Result<Status, OverlayError> {
        let body = self.get("/localapi/v0/status").await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn expand_sni_name(&self, name: &str) -> Option<String> {
        match self.status().await {
            Ok(status) => status.expand_sni_name(name),
            Err(e) => {
                debug!("Status unavailable while expanding {}: {}", name, e);
                None
            }
        }
    }
}

#[async_trait]
impl CertificateProvider for LocalApiClient {
    async fn certificate(&self, server_name: &str) -> Result<CertificatePair, TlsError> {
        if server_name.is_empty() {
            return Err(TlsError::MissingServerName);
        }

        let domain = if server_name.contains('.') {
            server_name.to_string()
        } else {
            self.expand_sni_name(server_name)
                .await
                .ok_or_else(|| TlsError::Unavailable {
                    name: server_name.to_string(),
                    reason: "not a certificate domain of this node".to_string(),
                })?
        };

        let pem = self
            .cert_pair(&domain)
            .await
            .map_err(|e| TlsError::Unavailable {
                name: domain.clone(),
                reason: e.to_string(),
            })?;

        parse_pem_pair(&pem)
    }
}
