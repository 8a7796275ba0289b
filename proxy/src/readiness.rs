use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::overlay::OverlayControl;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("tailnet not running after {attempts} status checks (last state: {last})")]
    TimedOut { attempts: u32, last: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Ready,
    TimedOut,
}

/// Waits for the node's backend to report `Running`.
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    attempts: u32,
    interval: Duration,
}

impl ReadinessPoller {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Poll until `Running` or the attempt bound is reached. Status query
    /// failures count as attempts and are retried.
    pub async fn wait_until_running(
        &self,
        control: &dyn OverlayControl,
    ) -> Result<(), ReadinessError> {
        let mut state = PollState::Polling;
        let mut last = String::from("unknown");
        let mut attempt = 0;
        let mut auth_url: Option<String> = None;

        while state == PollState::Polling {
            attempt += 1;
            match control.status().await {
                Ok(status) => {
                    info!("tailnet status: {}", status.backend_state);
                    if status.backend_state.is_running() {
                        if let Some(node) = &status.self_node {
                            info!(
                                "tailnet running as {} ({})",
                                node.dns_name.trim_end_matches('.'),
                                node.tailscale_ips.as_deref().unwrap_or_default().join(", ")
                            );
                        }
                        state = PollState::Ready;
                        continue;
                    }
                    last = status.backend_state.to_string();
                    if let Some(url) = status.auth_url.filter(|u| !u.is_empty()) {
                        if auth_url.as_ref() != Some(&url) {
                            info!("To authenticate, visit: {}", url);
                            auth_url = Some(url);
                        }
                    }
                }
                Err(e) => {
                    warn!("Error retrieving tailnet status; retrying: {}", e);
                    last = format!("error: {}", e);
                }
            }

            if attempt >= self.attempts {
                state = PollState::TimedOut;
            } else {
                tokio::time::sleep(self.interval).await;
            }
        }

        match state {
            PollState::Ready => Ok(()),
            _ => Err(ReadinessError::TimedOut {
                attempts: attempt,
                last,
            }),
        }
    }

    /// Run the poll and report the outcome once on `ready`.
    pub async fn signal(
        self,
        control: &dyn OverlayControl,
        ready: oneshot::Sender<Result<(), ReadinessError>>,
    ) {
        let outcome = self.wait_until_running(control).await;
        // The receiver only disappears if the process is already shutting down.
        let _ = ready.send(outcome);
    }
}
