use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_HTTPS_PORT: u16 = 443;
pub const DEFAULT_READINESS_ATTEMPTS: u32 = 60;
pub const DEFAULT_READINESS_INTERVAL_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "tailnet-s3-proxy")]
#[command(about = "Serve an S3 bucket as a file server on your tailnet", long_about = None)]
pub struct Args {
    /// Tailnet hostname to serve on (single DNS label, no dots)
    #[arg(long)]
    pub hostname: String,

    /// Bucket to serve from; see --key-prefix to serve part of it
    #[arg(long)]
    pub bucket: String,

    /// Prefix for the keys in the bucket to serve
    #[arg(long, default_value = "")]
    pub key_prefix: String,

    /// Directory holding the tailnet node state
    #[arg(long, default_value = "./")]
    pub state_dir: PathBuf,

    /// Serve over HTTPS with the node's tailnet certificate
    #[arg(long)]
    pub use_https: bool,

    /// Log every HTTP request as it comes in
    #[arg(long)]
    pub debug: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Plaintext HTTP port
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// TLS port (HTTPS mode only)
    #[arg(long, default_value_t = DEFAULT_HTTPS_PORT)]
    pub https_port: u16,

    /// Local address the userspace netstack forwards tailnet connections to
    #[arg(long, default_value = "127.0.0.1")]
    pub listen_addr: IpAddr,

    /// Status polls before giving up on the tailnet becoming ready
    #[arg(long, default_value_t = DEFAULT_READINESS_ATTEMPTS)]
    pub readiness_attempts: u32,

    /// Delay between status polls, in milliseconds
    #[arg(long, default_value_t = DEFAULT_READINESS_INTERVAL_MS)]
    pub readiness_interval_ms: u64,

    /// tailscaled binary
    #[arg(long, env = "TAILSCALED_BIN", default_value = "tailscaled")]
    pub tailscaled_bin: PathBuf,

    /// Auth key used to join the tailnet without interactive login
    #[arg(long, env = "TS_AUTHKEY", hide_env_values = true)]
    pub auth_key: Option<String>,

    /// Storage region
    #[arg(long, env = "AWS_REGION", default_value = "us-west-2")]
    pub region: String,

    /// Custom endpoint for S3-compatible storage
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long)]
    pub path_style: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing or invalid --hostname {0:?}: must be a single DNS label")]
    InvalidHostname(String),

    #[error("missing --bucket")]
    MissingBucket,

    #[error("--readiness-attempts must be at least 1")]
    NoReadinessAttempts,
}

/// Tailnet node settings.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub name: String,
    pub state_dir: PathBuf,
    pub listen_addr: IpAddr,
    pub tailscaled_bin: PathBuf,
    pub auth_key: Option<String>,
}

/// Object storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub key_prefix: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub path_style: bool,
}

/// Immutable process configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub use_https: bool,
    pub debug: bool,
    pub http_port: u16,
    pub https_port: u16,
    pub readiness_attempts: u32,
    pub readiness_interval: Duration,
}

impl ServerConfig {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let config = Self {
            node: NodeConfig {
                name: args.hostname,
                state_dir: args.state_dir,
                listen_addr: args.listen_addr,
                tailscaled_bin: args.tailscaled_bin,
                auth_key: args.auth_key.filter(|k| !k.is_empty()),
            },
            storage: StorageConfig {
                bucket: args.bucket,
                key_prefix: args.key_prefix,
                region: args.region,
                endpoint: args.s3_endpoint.filter(|e| !e.is_empty()),
                path_style: args.path_style,
            },
            use_https: args.use_https,
            debug: args.debug,
            http_port: args.http_port,
            https_port: args.https_port,
            readiness_attempts: args.readiness_attempts,
            readiness_interval: Duration::from_millis(args.readiness_interval_ms),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.name.is_empty() || self.node.name.contains('.') {
            return Err(ConfigError::InvalidHostname(self.node.name.clone()));
        }
        if self.storage.bucket.is_empty() {
            return Err(ConfigError::MissingBucket);
        }
        if self.readiness_attempts == 0 {
            return Err(ConfigError::NoReadinessAttempts);
        }
        Ok(())
    }
}

impl NodeConfig {
    /// Socket path of the supervised daemon's local API.
    pub fn local_api_socket(&self) -> PathBuf {
        self.state_dir.join("tailscaled.sock")
    }
}
