//! Certificate trust store lifecycle
//!
//! Imports issued certificates under managed friendly names, confirms
//! each import is actually usable (with a single bounded re-import for
//! the known transient missing-key condition) and sweeps stale managed
//! entries without ever touching certificates it does not own.

pub mod manager;
pub mod record;
pub mod store;

pub use manager::{CertificateStoreManager, CleanupMode, STORE_MARKER};
pub use record::{CertificateBlob, StoredCertificateRecord};
pub use store::{FileTrustStore, StoreError, TrustStore};
