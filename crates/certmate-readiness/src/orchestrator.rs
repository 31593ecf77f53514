//! Pre-request readiness evaluation across a certificate's domains.

use async_trait::async_trait;
use certmate_challenge::resolver;
use certmate_models::{
    ManagedCertificate, ProbeResult, ProbeSource, CHALLENGE_TYPE_DNS, CHALLENGE_TYPE_HTTP,
};
use certmate_probe::NetworkProbe;
use tracing::{debug, info};

/// The probe operations readiness evaluation depends on. Implemented by
/// `NetworkProbe`; test doubles record which checks ran.
#[async_trait]
pub trait DomainProber: Send + Sync {
    async fn check_dns(&self, domain: &str) -> ProbeResult;

    /// Full DNS probe set (resolution, CAA, DNSSEC)
    async fn check_domain(&self, domain: &str, target_ca_identifier: &str) -> Vec<ProbeResult>;

    async fn check_url_accessible(&self, url: &str) -> bool;
}

#[async_trait]
impl DomainProber for NetworkProbe {
    async fn check_dns(&self, domain: &str) -> ProbeResult {
        NetworkProbe::check_dns(self, domain).await
    }

    async fn check_domain(&self, domain: &str, target_ca_identifier: &str) -> Vec<ProbeResult> {
        NetworkProbe::check_domain(self, domain, target_ca_identifier).await
    }

    async fn check_url_accessible(&self, url: &str) -> bool {
        NetworkProbe::check_url_accessible(self, url, None).await
    }
}

/// Evaluates whether each selected domain of a managed certificate is
/// ready for its resolved validation method, without short-circuiting:
/// certificates commonly carry dozens of hostnames and partial fixes
/// are the norm, so one failing domain must not suppress the report for
/// the others.
pub struct ReadinessOrchestrator<P: DomainProber = NetworkProbe> {
    probe: P,
    ca_identifier: String,
}

impl<P: DomainProber> ReadinessOrchestrator<P> {
    pub fn new(probe: P, ca_identifier: impl Into<String>) -> Self {
        Self {
            probe,
            ca_identifier: ca_identifier.into(),
        }
    }

    pub async fn evaluate_readiness(&self, managed: &ManagedCertificate) -> Vec<ProbeResult> {
        let domains = managed.selected_domains();
        if domains.is_empty() {
            return vec![ProbeResult::failure(
                "no domains are selected for this certificate request",
                ProbeSource::Local,
            )];
        }

        let legacy_default = if managed.request_config.challenge_type.is_empty() {
            CHALLENGE_TYPE_HTTP
        } else {
            managed.request_config.challenge_type.as_str()
        };

        info!(
            certificate = %managed.name,
            domains = domains.len(),
            "evaluating readiness"
        );

        let mut results = Vec::new();

        for domain in &domains {
            let config = resolver::resolve(
                &managed.request_config.challenges,
                Some(domain),
                legacy_default,
            );

            debug!(
                domain = %domain,
                challenge_type = %config.challenge_type,
                "resolved challenge config"
            );

            match config.challenge_type.as_str() {
                CHALLENGE_TYPE_HTTP => self.check_http_readiness(domain, &mut results).await,
                CHALLENGE_TYPE_DNS => {
                    results.extend(self.probe.check_domain(domain, &self.ca_identifier).await);
                }
                other => {
                    results.push(ProbeResult::success(
                        format!(
                            "'{}' has no network readiness checks for challenge type '{}'",
                            domain, other
                        ),
                        ProbeSource::Local,
                    ));
                }
            }
        }

        results
    }

    /// HTTP validation needs the name to resolve and the challenge path
    /// to answer over plain HTTP.
    async fn check_http_readiness(&self, domain: &str, results: &mut Vec<ProbeResult>) {
        if domain.starts_with("*.") {
            results.push(ProbeResult::failure(
                format!(
                    "'{}' is a wildcard and cannot be validated over HTTP, use a DNS challenge",
                    domain
                ),
                ProbeSource::Local,
            ));
            return;
        }

        let dns = self.probe.check_dns(domain).await;
        let resolved = dns.is_success;
        results.push(dns);
        if !resolved {
            // the URL check cannot succeed for an unresolvable name;
            // move on to the next domain
            return;
        }

        let url = format!("http://{}/.well-known/acme-challenge/configcheck", domain);
        if self.probe.check_url_accessible(&url).await {
            results.push(ProbeResult::success(
                format!("'{}' answered the HTTP challenge path", domain),
                ProbeSource::Local,
            ));
        } else {
            results.push(ProbeResult::failure(
                format!(
                    "'{}' did not answer at {} - check the site is served over port 80",
                    domain, url
                ),
                ProbeSource::Local,
            ));
        }
    }
}
