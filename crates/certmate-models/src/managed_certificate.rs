//! Managed certificate: the unit of tracked certificate lifecycle
//! (domains + challenge configuration + issuance/renewal status).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::challenge::ChallengeConfig;

/// Outcome of the most recent renewal attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Success,
    Error,
    Paused,
}

/// Coarse health classification shown to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagedCertificateHealth {
    Unknown,
    Ok,
    AwaitingUser,
    Warning,
    Error,
}

/// A candidate hostname (or IP) for inclusion in the certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainOption {
    pub domain: String,

    /// Included in the certificate request when true
    pub is_selected: bool,

    /// Subject of the certificate; at most one option may be primary
    pub is_primary_domain: bool,

    /// Entered by the user rather than discovered from server bindings
    pub is_manual_entry: bool,
}

/// Configuration options for a certificate request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// The certificate subject domain
    pub primary_domain: String,

    /// Additional hostnames covered by the certificate
    #[serde(default)]
    pub subject_alternative_names: Vec<String>,

    /// IP addresses covered by the certificate
    #[serde(default)]
    pub subject_ip_addresses: Vec<String>,

    /// Ordered challenge configurations; resolution order matters
    #[serde(default)]
    pub challenges: Vec<ChallengeConfig>,

    /// Challenge type used by settings saved before multi-config
    /// support existed; the resolver falls back to this.
    #[serde(default)]
    pub challenge_type: String,
}

/// A named, tracked certificate request with its issuance metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedCertificate {
    pub id: String,
    pub name: String,

    /// Candidate hostnames/IPs for this certificate
    #[serde(default)]
    pub domain_options: Vec<DomainOption>,

    pub request_config: RequestConfig,

    // Post-issuance metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_thumbprint: Option<String>,
    /// Previous thumbprint, retained so deployment drivers can migrate
    /// bindings from the superseded certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_previous_thumbprint: Option<String>,
    #[serde(default)]
    pub certificate_revoked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_renewed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_last_renewal_attempt: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_renewal_status: Option<RequestState>,
    #[serde(default)]
    pub renewal_failure_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_failure_message: Option<String>,
}

impl ManagedCertificate {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            domain_options: Vec::new(),
            request_config: RequestConfig::default(),
            certificate_path: None,
            certificate_thumbprint: None,
            certificate_previous_thumbprint: None,
            certificate_revoked: false,
            date_expiry: None,
            date_renewed: None,
            date_last_renewal_attempt: None,
            last_renewal_status: None,
            renewal_failure_count: 0,
            renewal_failure_message: None,
        }
    }

    /// Distinct list of certificate domains/hostnames (primary + SANs)
    pub fn certificate_domains(&self) -> Vec<String> {
        let mut all = Vec::new();

        if !self.request_config.primary_domain.is_empty() {
            all.push(self.request_config.primary_domain.clone());
        }

        for san in &self.request_config.subject_alternative_names {
            if !all.contains(san) {
                all.push(san.clone());
            }
        }

        all
    }

    /// Domains currently selected for inclusion in the request
    pub fn selected_domains(&self) -> Vec<String> {
        self.domain_options
            .iter()
            .filter(|d| d.is_selected && !d.domain.is_empty())
            .map(|d| d.domain.clone())
            .collect()
    }

    pub fn has_selected_domains(&self) -> bool {
        self.domain_options
            .iter()
            .any(|d| d.is_selected && !d.domain.is_empty())
    }

    /// Enforce the at-most-one-primary invariant: if no option is marked
    /// primary, promote the first electable (non-empty, non-manual)
    /// option. Returns true if a promotion occurred.
    pub fn promote_primary_domain(&mut self) -> bool {
        if self.domain_options.iter().any(|d| d.is_primary_domain) {
            return false;
        }

        if let Some(first) = self
            .domain_options
            .iter_mut()
            .find(|d| !d.domain.is_empty() && !d.is_manual_entry)
        {
            first.is_primary_domain = true;
            return true;
        }

        false
    }

    /// Health classification based on renewal status, failure count,
    /// revocation and expiry proximity.
    pub fn health(&self) -> ManagedCertificateHealth {
        let now = Utc::now();

        match self.last_renewal_status {
            Some(RequestState::Error) => {
                if self.renewal_failure_count > 3
                    || self.date_expiry.is_some_and(|d| d < now + Duration::hours(12))
                {
                    ManagedCertificateHealth::Error
                } else {
                    ManagedCertificateHealth::Warning
                }
            }
            Some(RequestState::Paused) => ManagedCertificateHealth::AwaitingUser,
            Some(RequestState::Success) => {
                if self.certificate_revoked {
                    ManagedCertificateHealth::Error
                } else if self.date_expiry.is_some_and(|d| d < now + Duration::hours(12)) {
                    ManagedCertificateHealth::Error
                } else if self.date_expiry.is_some_and(|d| d < now + Duration::days(14)) {
                    ManagedCertificateHealth::Warning
                } else {
                    ManagedCertificateHealth::Ok
                }
            }
            None => ManagedCertificateHealth::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert_with_domains(domains: &[(&str, bool, bool)]) -> ManagedCertificate {
        let mut cert = ManagedCertificate::new("test");
        cert.domain_options = domains
            .iter()
            .map(|(d, selected, primary)| DomainOption {
                domain: d.to_string(),
                is_selected: *selected,
                is_primary_domain: *primary,
                is_manual_entry: false,
            })
            .collect();
        cert
    }

    #[test]
    fn test_certificate_domains_distinct() {
        let mut cert = ManagedCertificate::new("test");
        cert.request_config.primary_domain = "example.com".to_string();
        cert.request_config.subject_alternative_names = vec![
            "example.com".to_string(),
            "www.example.com".to_string(),
        ];

        let domains = cert.certificate_domains();
        assert_eq!(domains, vec!["example.com", "www.example.com"]);
    }

    #[test]
    fn test_promote_primary_domain() {
        let mut cert = cert_with_domains(&[
            ("a.example.com", true, false),
            ("b.example.com", true, false),
        ]);

        assert!(cert.promote_primary_domain());
        assert!(cert.domain_options[0].is_primary_domain);

        // second call is a no-op
        assert!(!cert.promote_primary_domain());
        assert_eq!(
            cert.domain_options.iter().filter(|d| d.is_primary_domain).count(),
            1
        );
    }

    #[test]
    fn test_promote_skips_manual_entries() {
        let mut cert = ManagedCertificate::new("test");
        cert.domain_options = vec![
            DomainOption {
                domain: "manual.example.com".to_string(),
                is_selected: true,
                is_primary_domain: false,
                is_manual_entry: true,
            },
            DomainOption {
                domain: "auto.example.com".to_string(),
                is_selected: true,
                is_primary_domain: false,
                is_manual_entry: false,
            },
        ];

        assert!(cert.promote_primary_domain());
        assert!(!cert.domain_options[0].is_primary_domain);
        assert!(cert.domain_options[1].is_primary_domain);
    }

    #[test]
    fn test_health_unknown_without_status() {
        let cert = ManagedCertificate::new("test");
        assert_eq!(cert.health(), ManagedCertificateHealth::Unknown);
    }

    #[test]
    fn test_health_error_after_repeated_failures() {
        let mut cert = ManagedCertificate::new("test");
        cert.last_renewal_status = Some(RequestState::Error);
        cert.renewal_failure_count = 2;
        cert.date_expiry = Some(Utc::now() + Duration::days(30));
        assert_eq!(cert.health(), ManagedCertificateHealth::Warning);

        cert.renewal_failure_count = 4;
        assert_eq!(cert.health(), ManagedCertificateHealth::Error);
    }

    #[test]
    fn test_health_expiry_proximity() {
        let mut cert = ManagedCertificate::new("test");
        cert.last_renewal_status = Some(RequestState::Success);

        cert.date_expiry = Some(Utc::now() + Duration::days(30));
        assert_eq!(cert.health(), ManagedCertificateHealth::Ok);

        cert.date_expiry = Some(Utc::now() + Duration::days(10));
        assert_eq!(cert.health(), ManagedCertificateHealth::Warning);

        cert.date_expiry = Some(Utc::now() + Duration::hours(6));
        assert_eq!(cert.health(), ManagedCertificateHealth::Error);
    }

    #[test]
    fn test_selected_domains() {
        let cert = cert_with_domains(&[
            ("a.example.com", true, true),
            ("b.example.com", false, false),
            ("c.example.com", true, false),
        ]);

        assert_eq!(cert.selected_domains(), vec!["a.example.com", "c.example.com"]);
        assert!(cert.has_selected_domains());
    }
}
