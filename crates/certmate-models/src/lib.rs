//! Shared data model for managed certificates
//!
//! Defines the managed-certificate request (domains, challenge
//! configuration, issuance metadata) and the diagnostic value types
//! exchanged between the resolver, the network probes and the
//! certificate store.

pub mod challenge;
pub mod managed_certificate;
pub mod probe;

pub use challenge::{
    ChallengeConfig, ProviderParameter, CHALLENGE_TYPE_DNS, CHALLENGE_TYPE_HTTP,
};
pub use managed_certificate::{
    DomainOption, ManagedCertificate, ManagedCertificateHealth, RequestConfig, RequestState,
};
pub use probe::{ProbeResult, ProbeSource};
