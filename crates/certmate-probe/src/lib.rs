//! Network readiness probing
//!
//! Answers "can this hostname be validated and served correctly":
//! DNS resolution, CAA policy compatibility, DNSSEC validity, TLS
//! SNI-binding correctness and generic URL reachability, each with a
//! remote-proxy-first/local-fallback policy and zero persistent side
//! effects. The SNI check temporarily patches the local hosts file and
//! always reverts exactly the entries it appended.

pub mod dns;
pub mod dns_client;
pub mod http;
pub mod probe;
pub mod sni;

pub use dns_client::{DnsClient, DnsError, SystemDnsClient};
pub use probe::{NetworkProbe, ProbeConfig, ProbeError};
pub use sni::verify_certificate_san;
