//! URL reachability and TCP service connection checks.

use certmate_models::{ProbeResult, ProbeSource};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::probe::NetworkProbe;

/// Response shape of the proxy validation API's URL check endpoint
#[derive(Debug, Deserialize)]
struct UrlCheckResult {
    #[serde(default)]
    is_accessible: Option<bool>,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

impl NetworkProbe {
    /// Check that a URL is reachable. This is about reachability, not
    /// trust: local checks accept all certificate errors.
    ///
    /// When the proxy validation API is enabled (and not explicitly
    /// opted out via `use_proxy`), the check is first attempted through
    /// the remote API so that reachability is confirmed from outside
    /// this network; any proxy failure falls back to one local attempt.
    pub async fn check_url_accessible(&self, url: &str, use_proxy: Option<bool>) -> bool {
        let use_proxy = use_proxy.unwrap_or(self.config.enable_proxy_api);

        info!(url = %url, proxy = use_proxy, "checking URL is accessible");

        if use_proxy {
            match self.check_url_via_proxy(url).await {
                Some(true) => {
                    info!(url = %url, "URL is accessible via proxy API, check passed");
                    return true;
                }
                Some(false) => {
                    debug!(url = %url, "proxy API reports URL not accessible, retrying locally");
                }
                None => {
                    warn!(url = %url, "proxy API check failed, retrying locally");
                }
            }
        }

        self.check_url_local(url).await
    }

    /// Ask the proxy validation API whether it can reach the URL.
    /// `None` means the proxy itself could not be consulted.
    async fn check_url_via_proxy(&self, url: &str) -> Option<bool> {
        let request_url = format!("{}configcheck/testurl?url={}", self.config.proxy_api_base, url);

        let response = self.http.get(&request_url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }

        let result: UrlCheckResult = response.json().await.ok()?;

        if result.is_accessible != Some(true) {
            debug!(
                url = %url,
                status = ?result.status_code,
                message = ?result.message,
                "proxy API URL check did not pass"
            );
        }

        Some(result.is_accessible == Some(true))
    }

    async fn check_url_local(&self, url: &str) -> bool {
        match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                info!(url = %url, status = %response.status(), "URL is accessible, check passed");
                true
            }
            Ok(response) => {
                warn!(url = %url, status = %response.status(), "URL is not accessible, check failed");
                false
            }
            Err(e) => {
                warn!(url = %url, error = %e, "failed to confirm URL is accessible");
                false
            }
        }
    }

    /// Best-effort TCP connect with a short timeout. Connection failure
    /// is reported, never raised.
    pub async fn check_service_connection(&self, host: &str, port: u16) -> ProbeResult {
        let connect = tokio::net::TcpStream::connect((host, port));

        match tokio::time::timeout(self.config.tcp_timeout, connect).await {
            Ok(Ok(_)) => ProbeResult::success(
                format!("'{}' responded OK on port {}", host, port),
                ProbeSource::Local,
            ),
            Ok(Err(e)) => ProbeResult::failure(
                format!("failed to connect to '{}' on port {}: {}", host, port, e),
                ProbeSource::Local,
            ),
            Err(_) => ProbeResult::failure(
                format!(
                    "failed to connect to '{}' on port {}: timed out after {:?}",
                    host, port, self.config.tcp_timeout
                ),
                ProbeSource::Local,
            ),
        }
    }
}
