use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Backend State
// ============================================================================

/// Daemon readiness as reported by `/localapi/v0/status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum BackendState {
    NoState,
    NeedsLogin,
    NeedsMachineAuth,
    Stopped,
    Starting,
    Running,
    Unknown(String),
}

impl BackendState {
    pub fn is_running(&self) -> bool {
        *self == BackendState::Running
    }
}

impl From<String> for BackendState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "NoState" => BackendState::NoState,
            "NeedsLogin" => BackendState::NeedsLogin,
            "NeedsMachineAuth" => BackendState::NeedsMachineAuth,
            "Stopped" => BackendState::Stopped,
            "Starting" => BackendState::Starting,
            "Running" => BackendState::Running,
            _ => BackendState::Unknown(value),
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendState::NoState => f.write_str("NoState"),
            BackendState::NeedsLogin => f.write_str("NeedsLogin"),
            BackendState::NeedsMachineAuth => f.write_str("NeedsMachineAuth"),
            BackendState::Stopped => f.write_str("Stopped"),
            BackendState::Starting => f.write_str("Starting"),
            BackendState::Running => f.write_str("Running"),
            BackendState::Unknown(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    pub backend_state: BackendState,
    #[serde(rename = "Self", default)]
    pub self_node: Option<PeerStatus>,
    #[serde(default)]
    pub cert_domains: Option<Vec<String>>,
    /// Interactive login URL while the node waits for approval.
    #[serde(rename = "AuthURL", default)]
    pub auth_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeerStatus {
    #[serde(rename = "DNSName", default)]
    pub dns_name: String,
    #[serde(rename = "TailscaleIPs", default)]
    pub tailscale_ips: Option<Vec<String>>,
}

impl Status {
    /// Expand a bare node name into the certificate domain it is served
    /// under, e.g. `files` -> `files.tail1234.ts.net`.
    pub fn expand_sni_name(&self, name: &str) -> Option<String> {
        let prefix = format!("{}.", name);
        self.cert_domains
            .iter()
            .flatten()
            .find(|domain| domain.starts_with(&prefix))
            .cloned()
    }
}

// ============================================================================
// Start Request
// ============================================================================

/// Body of `POST /localapi/v0/start`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartOptions {
    pub update_prefs: Prefs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Prefs {
    pub hostname: String,
    pub want_running: bool,
}
