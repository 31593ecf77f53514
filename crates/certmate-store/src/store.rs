//! Trust store abstraction and the file-backed implementation.
//!
//! Each operation opens the store, does its work and releases it before
//! returning; no handle is cached across calls.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use x509_parser::prelude::*;

use crate::record::{CertificateBlob, StoredCertificateRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode stored record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to parse certificate: {0}")]
    CertificateParse(String),

    #[error("certificate blob contains no certificate")]
    EmptyBlob,

    #[error("certificate not found in store: {0}")]
    NotFound(String),

    #[error("private key not available for certificate {0} after re-import")]
    PrivateKeyUnavailable(String),
}

/// Platform trust store operations.
///
/// Lookups are read-only; `add`/`remove`/`set_friendly_name` mutate the
/// store. Implementations must be safe to call concurrently because the
/// underlying store is process-wide shared state.
#[cfg_attr(test, mockall::automock)]
pub trait TrustStore: Send + Sync {
    /// Import a certificate bundle, returning the stored metadata.
    fn add(&self, blob: &CertificateBlob) -> Result<StoredCertificateRecord, StoreError>;

    /// Relabel an existing entry.
    fn set_friendly_name(&self, thumbprint: &str, friendly_name: &str) -> Result<(), StoreError>;

    fn find_by_thumbprint(
        &self,
        thumbprint: &str,
    ) -> Result<Option<StoredCertificateRecord>, StoreError>;

    /// Entries whose subject contains the given name.
    fn find_by_subject_name(&self, name: &str)
        -> Result<Vec<StoredCertificateRecord>, StoreError>;

    /// Entries whose issuer contains the given name.
    fn find_all_by_issuer(&self, issuer: &str)
        -> Result<Vec<StoredCertificateRecord>, StoreError>;

    fn remove(&self, thumbprint: &str) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<StoredCertificateRecord>, StoreError>;
}

/// On-disk entry: metadata plus the original PEM bundle
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    record: StoredCertificateRecord,
    pem: String,
}

/// File-backed trust store keeping one JSON file per certificate,
/// keyed by thumbprint.
pub struct FileTrustStore {
    base_dir: PathBuf,
}

impl FileTrustStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, thumbprint: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", thumbprint))
    }

    fn read_entry(&self, path: &Path) -> Result<StoredEntry, StoreError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write_entry(&self, entry: &StoredEntry) -> Result<(), StoreError> {
        let path = self.entry_path(&entry.record.thumbprint);
        let json = serde_json::to_string_pretty(entry)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn load_entry(&self, thumbprint: &str) -> Result<StoredEntry, StoreError> {
        let path = self.entry_path(thumbprint);
        if !path.exists() {
            return Err(StoreError::NotFound(thumbprint.to_string()));
        }
        self.read_entry(&path)
    }
}

impl TrustStore for FileTrustStore {
    fn add(&self, blob: &CertificateBlob) -> Result<StoredCertificateRecord, StoreError> {
        let record = parse_bundle(&blob.pem)?;
        self.write_entry(&StoredEntry {
            record: record.clone(),
            pem: blob.pem.clone(),
        })?;
        Ok(record)
    }

    fn set_friendly_name(&self, thumbprint: &str, friendly_name: &str) -> Result<(), StoreError> {
        let mut entry = self.load_entry(thumbprint)?;
        entry.record.friendly_name = friendly_name.to_string();
        self.write_entry(&entry)
    }

    fn find_by_thumbprint(
        &self,
        thumbprint: &str,
    ) -> Result<Option<StoredCertificateRecord>, StoreError> {
        let path = self.entry_path(thumbprint);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(self.read_entry(&path)?.record))
    }

    fn find_by_subject_name(
        &self,
        name: &str,
    ) -> Result<Vec<StoredCertificateRecord>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.subject.contains(name))
            .collect())
    }

    fn find_all_by_issuer(
        &self,
        issuer: &str,
    ) -> Result<Vec<StoredCertificateRecord>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.issuer.contains(issuer))
            .collect())
    }

    fn remove(&self, thumbprint: &str) -> Result<(), StoreError> {
        let path = self.entry_path(thumbprint);
        if !path.exists() {
            return Err(StoreError::NotFound(thumbprint.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<StoredCertificateRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                records.push(self.read_entry(&path)?.record);
            }
        }
        // stable ordering for callers iterating the whole store
        records.sort_by(|a, b| a.thumbprint.cmp(&b.thumbprint));
        Ok(records)
    }
}

/// Parse a PEM bundle into stored metadata. The first certificate is
/// taken as the leaf; the friendly name starts out as the subject and
/// is relabelled by the manager after import.
fn parse_bundle(pem: &str) -> Result<StoredCertificateRecord, StoreError> {
    let mut reader = std::io::BufReader::new(pem.as_bytes());

    let mut leaf_der: Option<Vec<u8>> = None;
    let mut has_private_key = false;

    for item in rustls_pemfile::read_all(&mut reader) {
        match item? {
            rustls_pemfile::Item::X509Certificate(der) => {
                if leaf_der.is_none() {
                    leaf_der = Some(der.as_ref().to_vec());
                }
            }
            rustls_pemfile::Item::Pkcs1Key(_)
            | rustls_pemfile::Item::Pkcs8Key(_)
            | rustls_pemfile::Item::Sec1Key(_) => {
                has_private_key = true;
            }
            _ => {}
        }
    }

    let leaf_der = leaf_der.ok_or(StoreError::EmptyBlob)?;

    let (_, cert) = X509Certificate::from_der(&leaf_der)
        .map_err(|e| StoreError::CertificateParse(e.to_string()))?;

    let subject = cert.subject().to_string();

    Ok(StoredCertificateRecord {
        thumbprint: thumbprint(&leaf_der),
        friendly_name: subject.clone(),
        subject,
        issuer: cert.issuer().to_string(),
        not_before: asn1_to_utc(&cert.validity().not_before)?,
        not_after: asn1_to_utc(&cert.validity().not_after)?,
        has_private_key,
    })
}

fn thumbprint(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn asn1_to_utc(time: &ASN1Time) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| StoreError::CertificateParse("certificate validity out of range".into()))
}
