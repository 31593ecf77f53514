//! Probe configuration and construction.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::dns_client::{DnsClient, SystemDnsClient};

/// Probe errors.
///
/// Most check outcomes are reported as `ProbeResult` values; these
/// variants cover the cases where the probe itself cannot run or has
/// left operator-visible state behind.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to append temporary hosts file entries: {0}")]
    HostsPatch(std::io::Error),

    #[error("Failed to remove temporary hosts file entries, manual cleanup required: {0}")]
    HostsCleanup(std::io::Error),

    #[error("Invalid hostname for TLS check: {0}")]
    InvalidHostname(String),
}

/// Network probe configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Prefer the remote proxy validation API before checking locally
    pub enable_proxy_api: bool,

    /// Base URI of the proxy validation API
    pub proxy_api_base: String,

    /// Timeout applied to each HTTP check
    pub http_timeout: Duration,

    /// Timeout applied to TCP service connection checks
    pub tcp_timeout: Duration,

    /// Local name-resolution override file patched during SNI checks
    pub hosts_file: PathBuf,

    /// Pause after patching the hosts file, before issuing the TLS
    /// request, so the change can take effect
    pub sni_settle_delay: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enable_proxy_api: true,
            proxy_api_base: "https://api.certmate.dev/api/v1/".to_string(),
            http_timeout: Duration::from_secs(5),
            tcp_timeout: Duration::from_secs(5),
            hosts_file: default_hosts_file(),
            sni_settle_delay: Duration::from_millis(250),
        }
    }
}

fn default_hosts_file() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
    } else {
        PathBuf::from("/etc/hosts")
    }
}

/// Network readiness prober.
///
/// All checks are independent and safe to run concurrently per domain;
/// only the SNI check serializes (it mutates a machine-wide file).
pub struct NetworkProbe {
    pub(crate) config: ProbeConfig,
    pub(crate) http: reqwest::Client,
    pub(crate) dns: Arc<dyn DnsClient>,
}

impl NetworkProbe {
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        Self::with_dns_client(config, Arc::new(SystemDnsClient::new()))
    }

    /// Construct with a specific DNS client; tests script lookups
    /// through this seam.
    pub fn with_dns_client(
        config: ProbeConfig,
        dns: Arc<dyn DnsClient>,
    ) -> Result<Self, ProbeError> {
        let http = reqwest::Client::builder()
            // reachability checks accept any certificate; trust is
            // evaluated separately by the SNI check
            .danger_accept_invalid_certs(true)
            .timeout(config.http_timeout)
            .user_agent(concat!("certmate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, http, dns })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }
}
