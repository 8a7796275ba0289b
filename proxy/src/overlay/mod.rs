mod daemon;
mod local_api;
pub mod types;

pub use daemon::TailscaleNode;
pub use local_api::LocalApiClient;
pub use types::Status;

use async_trait::async_trait;
use hyper::StatusCode;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::tls::CertificateProvider;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("failed to connect to local API at {socket:?}: {source}")]
    Connect {
        socket: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("local API request failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid local API request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("local API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("failed to decode local API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to prepare state directory {dir:?}: {source}")]
    StateDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tailnet daemon exited during startup ({0})")]
    DaemonExited(std::process::ExitStatus),

    #[error("local API did not come up within {0:?}")]
    DaemonTimeout(std::time::Duration),

    #[error("failed to join the tailnet: {0}")]
    Join(#[source] Box<OverlayError>),

    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Control-plane view of the joined node.
#[async_trait]
pub trait OverlayControl: Send + Sync {
    async fn status(&self) -> Result<Status, OverlayError>;

    /// Full certificate domain for a bare node name, if the node has one.
    async fn expand_sni_name(&self, name: &str) -> Option<String>;
}

/// A joined tailnet identity: its control client, its certificate source,
/// and the ability to accept tailnet connections on a port.
#[async_trait]
pub trait OverlayNode: Send + Sync {
    fn control(&self) -> Arc<dyn OverlayControl>;

    fn certificates(&self) -> Arc<dyn CertificateProvider>;

    async fn listen(&self, port: u16) -> Result<TcpListener, OverlayError>;
}
