//! Stored certificate metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one certificate held in a trust store.
///
/// The thumbprint is the hex SHA-256 digest of the leaf certificate in
/// DER form and serves as the store-wide identity of the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCertificateRecord {
    pub thumbprint: String,
    /// Operator-visible label; managed entries carry the marker token
    pub friendly_name: String,
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Whether the store holds a usable private key for this entry
    pub has_private_key: bool,
}

/// Raw certificate material handed over by an issuance client: a PEM
/// bundle containing the leaf certificate, any chain certificates and
/// (usually) the private key.
#[derive(Debug, Clone)]
pub struct CertificateBlob {
    pub pem: String,
}

impl CertificateBlob {
    pub fn new(pem: impl Into<String>) -> Self {
        Self { pem: pem.into() }
    }
}
