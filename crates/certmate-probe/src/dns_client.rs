//! DNS lookup seam for the probe checks.
//!
//! `NetworkProbe` talks to DNS through this trait so the check logic
//! (CAA policy, DNSSEC classification, terminal-failure ordering) can
//! be exercised against scripted lookups; `SystemDnsClient` is the
//! hickory-backed implementation used in production.

use std::net::IpAddr;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::rdata::CAA;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DnsError {
    /// A validated negative response: the name exists in no record set
    #[error("no records found for {0}")]
    NoRecords(String),

    #[error("{0}")]
    Resolution(String),
}

impl DnsError {
    fn from_resolve(name: &str, e: ResolveError) -> Self {
        match e.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => Self::NoRecords(name.to_string()),
            _ => Self::Resolution(e.to_string()),
        }
    }
}

/// Lookups the probe checks depend on.
#[async_trait]
pub trait DnsClient: Send + Sync {
    async fn lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, DnsError>;

    async fn lookup_caa(&self, name: &str) -> Result<Vec<CAA>, DnsError>;

    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError>;

    /// DNSSEC-validating resolution: an actively broken signature chain
    /// surfaces as a resolution error mentioning a bogus result.
    async fn secure_lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, DnsError>;
}

/// System-resolver-backed client.
pub struct SystemDnsClient {
    resolver: TokioAsyncResolver,
}

impl SystemDnsClient {
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

impl Default for SystemDnsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsClient for SystemDnsClient {
    async fn lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, DnsError> {
        self.resolver
            .lookup_ip(name)
            .await
            .map(|lookup| lookup.iter().collect())
            .map_err(|e| DnsError::from_resolve(name, e))
    }

    async fn lookup_caa(&self, name: &str) -> Result<Vec<CAA>, DnsError> {
        self.resolver
            .lookup(name, RecordType::CAA)
            .await
            .map(|lookup| {
                lookup
                    .iter()
                    .filter_map(|rdata| match rdata {
                        RData::CAA(caa) => Some(caa.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .map_err(|e| DnsError::from_resolve(name, e))
    }

    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        self.resolver
            .txt_lookup(name)
            .await
            .map(|lookup| {
                lookup
                    .iter()
                    .map(|txt| {
                        txt.txt_data()
                            .iter()
                            .map(|data| String::from_utf8_lossy(data))
                            .collect()
                    })
                    .collect()
            })
            .map_err(|e| DnsError::from_resolve(name, e))
    }

    async fn secure_lookup_ip(&self, name: &str) -> Result<Vec<IpAddr>, DnsError> {
        let mut opts = ResolverOpts::default();
        opts.validate = true;

        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);

        resolver
            .lookup_ip(name)
            .await
            .map(|lookup| lookup.iter().collect())
            .map_err(|e| DnsError::from_resolve(name, e))
    }
}
