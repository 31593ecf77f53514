//! Certificate installation and cleanup policy on top of a trust store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::record::{CertificateBlob, StoredCertificateRecord};
use crate::store::{StoreError, TrustStore};

/// Marker token embedded in every friendly name we write. Cleanup only
/// ever touches entries carrying this token.
pub const STORE_MARKER: &str = "[Certmate]";

/// Cleanup sweep selection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    /// Remove managed entries already expired at the cutoff, optionally
    /// narrowed by a friendly-name prefix
    AfterExpiry,
    /// Remove managed entries matching the friendly-name prefix
    /// regardless of expiry (drops a just-superseded certificate)
    AfterRenewal,
    /// Remove every managed entry not excluded
    FullCleanup,
}

/// Installs certificates with managed friendly names and sweeps stale
/// managed entries out of the store.
pub struct CertificateStoreManager {
    store: Arc<dyn TrustStore>,
    readback_delay: Duration,
}

impl CertificateStoreManager {
    pub fn new(store: Arc<dyn TrustStore>) -> Self {
        Self {
            store,
            readback_delay: Duration::from_millis(500),
        }
    }

    /// Override the pause between import and the read-back usability
    /// check. Tests zero this.
    pub fn with_readback_delay(mut self, delay: Duration) -> Self {
        self.readback_delay = delay;
        self
    }

    /// Import a certificate bundle and confirm the store can actually
    /// use it.
    ///
    /// After import the entry is re-read by thumbprint; if the private
    /// key is not usable yet, the entry is dropped and re-imported
    /// exactly once (importing under some process identities is known
    /// to transiently lose the key link, and a clean re-import fixes
    /// it). A second failure is surfaced as an error rather than
    /// retried further, so a persistent environment fault is not
    /// masked as a transient one.
    pub async fn install(
        &self,
        host_label: &str,
        blob: &CertificateBlob,
    ) -> Result<StoredCertificateRecord, StoreError> {
        let mut reimported = false;

        loop {
            let record = self.store.add(blob)?;
            let friendly = friendly_name(host_label, record.not_before, record.not_after);
            self.store.set_friendly_name(&record.thumbprint, &friendly)?;

            if !self.readback_delay.is_zero() {
                tokio::time::sleep(self.readback_delay).await;
            }

            match self.store.find_by_thumbprint(&record.thumbprint)? {
                Some(stored) if stored.has_private_key => {
                    info!(
                        thumbprint = %stored.thumbprint,
                        friendly_name = %stored.friendly_name,
                        "certificate installed"
                    );
                    return Ok(stored);
                }
                _ => {
                    // drop the unusable entry before deciding whether
                    // to re-import or give up
                    if let Err(e) = self.store.remove(&record.thumbprint) {
                        warn!(thumbprint = %record.thumbprint, error = %e, "failed to remove unusable certificate entry");
                    }

                    if reimported {
                        return Err(StoreError::PrivateKeyUnavailable(record.thumbprint));
                    }

                    warn!(
                        thumbprint = %record.thumbprint,
                        "private key not usable after import, re-importing once"
                    );
                    reimported = true;
                }
            }
        }
    }

    /// Sweep stale managed certificates out of the store, returning a
    /// description of each removed entry.
    ///
    /// Entries in `excluded_thumbprints` (currently-bound certificates)
    /// and entries without the marker token are never touched. Each
    /// removal is attempted independently; failures are logged and the
    /// sweep continues. This method never fails: if the store cannot be
    /// read at all, the sweep is abandoned with an empty result.
    pub fn cleanup(
        &self,
        mode: CleanupMode,
        expiry_cutoff: DateTime<Utc>,
        matching_name_prefix: Option<&str>,
        excluded_thumbprints: &[String],
    ) -> Vec<String> {
        let records = match self.store.list() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "certificate cleanup could not read the store");
                return Vec::new();
            }
        };

        let mut removed = Vec::new();

        for record in records {
            if excluded_thumbprints
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&record.thumbprint))
            {
                debug!(thumbprint = %record.thumbprint, "skipping excluded certificate");
                continue;
            }

            if !record.friendly_name.contains(STORE_MARKER) {
                continue;
            }

            let prefix_matches = match matching_name_prefix {
                Some(prefix) => record.friendly_name.starts_with(prefix),
                None => true,
            };

            let eligible = match mode {
                CleanupMode::AfterExpiry => {
                    record.not_after < expiry_cutoff && prefix_matches
                }
                // a renewal sweep without a name to match would remove
                // every managed certificate, so require the prefix
                CleanupMode::AfterRenewal => {
                    matching_name_prefix.is_some() && prefix_matches
                }
                CleanupMode::FullCleanup => true,
            };

            if !eligible {
                continue;
            }

            match self.store.remove(&record.thumbprint) {
                Ok(()) => {
                    info!(
                        thumbprint = %record.thumbprint,
                        friendly_name = %record.friendly_name,
                        "removed stale certificate"
                    );
                    removed.push(format!("{} ({})", record.friendly_name, record.thumbprint));
                }
                Err(e) => {
                    warn!(
                        thumbprint = %record.thumbprint,
                        error = %e,
                        "failed to remove certificate, continuing sweep"
                    );
                }
            }
        }

        removed
    }
}

/// `"{host} [Certmate] - {from} to {to}"`
fn friendly_name(host_label: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    format!(
        "{} {} - {} to {}",
        host_label,
        STORE_MARKER,
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d")
    )
}
