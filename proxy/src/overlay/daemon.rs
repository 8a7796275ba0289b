use async_trait::async_trait;
use std::fs::File;
use std::net::{IpAddr, SocketAddr};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::types::{Prefs, StartOptions};
use super::{LocalApiClient, OverlayControl, OverlayError, OverlayNode};
use crate::config::NodeConfig;
use crate::tls::CertificateProvider;

const DAEMON_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const DAEMON_STARTUP_POLL: Duration = Duration::from_millis(200);

/// Tailnet node backed by a `tailscaled` child process in userspace
/// networking mode. The daemon is killed when the node is dropped.
pub struct TailscaleNode {
    // Held for its kill-on-drop.
    _daemon: Mutex<Child>,
    client: Arc<LocalApiClient>,
    listen_addr: IpAddr,
}

impl TailscaleNode {
    /// Start the daemon with state under `config.state_dir` and join the
    /// tailnet as `config.name`.
    pub async fn start(config: &NodeConfig) -> Result<Self, OverlayError> {
        tokio::fs::create_dir_all(&config.state_dir)
            .await
            .map_err(|source| OverlayError::StateDir {
                dir: config.state_dir.clone(),
                source,
            })?;

        let socket = config.local_api_socket();
        // A stale socket from a previous run would make the daemon refuse to start.
        let _ = tokio::fs::remove_file(&socket).await;

        let mut daemon = spawn_daemon(config)?;
        let client = Arc::new(LocalApiClient::new(&socket));

        wait_for_local_api(&client, &mut daemon).await?;
        info!("tailscaled is up (socket {:?})", socket);

        join(&client, config)
            .await
            .map_err(|e| OverlayError::Join(Box::new(e)))?;
        info!("Requested to join tailnet as {}", config.name);

        Ok(Self {
            _daemon: Mutex::new(daemon),
            client,
            listen_addr: config.listen_addr,
        })
    }
}

#[async_trait]
impl OverlayNode for TailscaleNode {
    fn control(&self) -> Arc<dyn OverlayControl> {
        self.client.clone()
    }

    fn certificates(&self) -> Arc<dyn CertificateProvider> {
        self.client.clone()
    }

    async fn listen(&self, port: u16) -> Result<TcpListener, OverlayError> {
        let addr = SocketAddr::new(self.listen_addr, port);
        TcpListener::bind(addr)
            .await
            .map_err(|source| OverlayError::Listen { addr, source })
    }
}

fn spawn_daemon(config: &NodeConfig) -> Result<Child, OverlayError> {
    let log_path = config.state_dir.join("tailscaled.log");
    let log = File::create(&log_path).map_err(|source| OverlayError::StateDir {
        dir: config.state_dir.clone(),
        source,
    })?;
    let log_err = log.try_clone().map_err(|source| OverlayError::StateDir {
        dir: config.state_dir.clone(),
        source,
    })?;

    info!(
        "Starting {:?} (state in {:?}, log at {:?})",
        config.tailscaled_bin, config.state_dir, log_path
    );

    Command::new(&config.tailscaled_bin)
        .arg(format!("--statedir={}", config.state_dir.display()))
        .arg(format!("--socket={}", config.local_api_socket().display()))
        .arg("--tun=userspace-networking")
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| OverlayError::Spawn {
            program: config.tailscaled_bin.clone(),
            source,
        })
}

async fn wait_for_local_api(
    client: &LocalApiClient,
    daemon: &mut Child,
) -> Result<(), OverlayError> {
    let deadline = tokio::time::Instant::now() + DAEMON_STARTUP_TIMEOUT;

    loop {
        if let Ok(Some(exit)) = daemon.try_wait() {
            return Err(OverlayError::DaemonExited(exit));
        }

        match client.status().await {
            Ok(status) => {
                debug!("Local API answered, backend state {}", status.backend_state);
                return Ok(());
            }
            Err(e) if tokio::time::Instant::now() >= deadline => {
                debug!("Local API still unavailable: {}", e);
                return Err(OverlayError::DaemonTimeout(DAEMON_STARTUP_TIMEOUT));
            }
            Err(_) => tokio::time::sleep(DAEMON_STARTUP_POLL).await,
        }
    }
}

/// Apply prefs and start the backend once. Readiness is left to the caller;
/// the node may still need a login or control-plane round trip after this
/// returns.
async fn join(client: &LocalApiClient, config: &NodeConfig) -> Result<(), OverlayError> {
    let options = StartOptions {
        update_prefs: Prefs {
            hostname: config.name.clone(),
            want_running: true,
        },
        auth_key: config.auth_key.clone(),
    };
    client.start(&options).await?;

    if config.auth_key.is_none() {
        info!("No auth key set; the login URL is logged once the node asks for it");
        client.login_interactive().await?;
    }
    Ok(())
}
