//! DNS resolution, CAA, DNSSEC and TXT record checks.
//!
//! These run locally against the system resolver; the proxy validation
//! API does not currently mediate DNS checks, so every result carries
//! the local source marker.

use certmate_models::{ProbeResult, ProbeSource};
use hickory_resolver::proto::rr::rdata::caa::Value;
use tracing::{debug, info, warn};

use crate::dns_client::DnsError;
use crate::probe::NetworkProbe;

impl NetworkProbe {
    /// Check that `domain` resolves to at least one IP address.
    ///
    /// A failure here is terminal for the domain's probe set: an
    /// unresolvable name cannot be issued for, so CAA/DNSSEC checks are
    /// skipped by callers.
    pub async fn check_dns(&self, domain: &str) -> ProbeResult {
        info!(domain = %domain, "checking DNS name resolves to IP");

        match self.dns.lookup_ip(domain).await {
            Ok(ips) => match ips.first() {
                Some(ip) => ProbeResult::success(
                    format!("'{}' resolved to an IP address {}", domain, ip),
                    ProbeSource::Local,
                ),
                None => ProbeResult::failure(
                    format!("'{}' failed to resolve to an IP address", domain),
                    ProbeSource::Local,
                ),
            },
            Err(e) => {
                debug!(domain = %domain, error = %e, "DNS resolution failed");
                ProbeResult::failure(
                    format!("'{}' failed to resolve to an IP address", domain),
                    ProbeSource::Local,
                )
            }
        }
    }

    /// Check CAA policy compatibility for the target CA.
    ///
    /// No CAA records at all means no policy restricts issuance (pass).
    /// With one or more records, at least one `issue`/`issuewild` record
    /// must name the target CA.
    pub async fn check_caa(&self, domain: &str, target_ca_identifier: &str) -> ProbeResult {
        let records = match self.dns.lookup_caa(domain).await {
            Ok(records) => records,
            // an empty answer is a valid response: CAA is simply not
            // configured for this domain
            Err(DnsError::NoRecords(_)) => Vec::new(),
            Err(e) => {
                warn!(domain = %domain, error = %e, "CAA resolution failed");
                return ProbeResult::failure(
                    format!("'{}' failed to parse or resolve CAA", domain),
                    ProbeSource::Local,
                );
            }
        };

        if records.is_empty() {
            return ProbeResult::success(
                format!("'{}' has no CAA records, no policy restricts issuance", domain),
                ProbeSource::Local,
            );
        }

        let permits_target = records.iter().any(|caa| {
            (caa.tag().is_issue() || caa.tag().is_issuewild())
                && caa_issuer_matches(caa.value(), target_ca_identifier)
        });

        if permits_target {
            ProbeResult::success(
                format!("'{}' CAA policy permits issuance by {}", domain, target_ca_identifier),
                ProbeSource::Local,
            )
        } else {
            ProbeResult::failure(
                format!(
                    "'{}' DNS CAA verification failed - existing CAA record prevents issuance for {}",
                    domain, target_ca_identifier
                ),
                ProbeSource::Local,
            )
        }
    }

    /// Check DNSSEC validity via a validating resolution.
    ///
    /// Only an actively broken signature chain (bogus) fails the check;
    /// unsigned zones pass. Resolver-level errors are reported as
    /// failures without retry.
    pub async fn check_dnssec(&self, domain: &str) -> ProbeResult {
        match self.dns.secure_lookup_ip(domain).await {
            Ok(_) => ProbeResult::success(
                format!("'{}' DNSSEC check OK", domain),
                ProbeSource::Local,
            ),
            // a validated negative response is not a DNSSEC problem
            Err(DnsError::NoRecords(_)) => ProbeResult::success(
                format!("'{}' DNSSEC check OK, no records to validate", domain),
                ProbeSource::Local,
            ),
            Err(e) if e.to_string().to_lowercase().contains("bogus") => ProbeResult::failure(
                format!("'{}' DNSSEC check failed - validation result bogus", domain),
                ProbeSource::Local,
            ),
            Err(e) => ProbeResult::failure(
                format!("'{}' DNS error during secure resolution - {}", domain, e),
                ProbeSource::Local,
            ),
        }
    }

    /// Resolve a TXT record by fully-qualified name, returning the
    /// first value found. Used to verify DNS challenge records.
    pub async fn get_txt_record(&self, fqdn: &str) -> Option<String> {
        match self.dns.lookup_txt(fqdn).await {
            Ok(values) => values.into_iter().next(),
            Err(e) => {
                debug!(fqdn = %fqdn, error = %e, "TXT lookup failed");
                None
            }
        }
    }

    /// Run the full DNS probe set for a domain: resolution, then CAA,
    /// then DNSSEC. Each failure is terminal for the remaining checks
    /// of this domain; results for other domains are unaffected.
    pub async fn check_domain(&self, domain: &str, target_ca_identifier: &str) -> Vec<ProbeResult> {
        let mut results = Vec::new();

        if domain.is_empty() {
            results.push(ProbeResult::failure(
                "cannot check empty DNS name",
                ProbeSource::Local,
            ));
            return results;
        }

        let dns = self.check_dns(domain).await;
        let resolved = dns.is_success;
        results.push(dns);
        if !resolved {
            return results;
        }

        let caa = self.check_caa(domain, target_ca_identifier).await;
        let caa_ok = caa.is_success;
        results.push(caa);
        if !caa_ok {
            return results;
        }

        results.push(self.check_dnssec(domain).await);
        results
    }
}

/// True when a CAA record value names the given CA identifier.
fn caa_issuer_matches(value: &Value, target_ca_identifier: &str) -> bool {
    match value {
        Value::Issuer(Some(name), _) => name
            .to_utf8()
            .trim_end_matches('.')
            .eq_ignore_ascii_case(target_ca_identifier),
        _ => false,
    }
}
