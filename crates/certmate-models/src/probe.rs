//! Diagnostic value types produced by network readiness checks.

use serde::{Deserialize, Serialize};

/// Which policy path produced a probe result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeSource {
    /// Remote proxy-mediated check
    ProxyApi,
    /// Check performed directly from this machine
    Local,
}

/// Outcome of one readiness check (DNS/CAA/DNSSEC/SNI/URL).
///
/// Ephemeral: aggregated into a diagnostic report, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub is_success: bool,
    /// Human-readable message suitable for direct display
    pub message: String,
    pub source: ProbeSource,
}

impl ProbeResult {
    pub fn success(message: impl Into<String>, source: ProbeSource) -> Self {
        Self {
            is_success: true,
            message: message.into(),
            source,
        }
    }

    pub fn failure(message: impl Into<String>, source: ProbeSource) -> Self {
        Self {
            is_success: false,
            message: message.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_result_constructors() {
        let ok = ProbeResult::success("resolved", ProbeSource::Local);
        assert!(ok.is_success);
        assert_eq!(ok.source, ProbeSource::Local);

        let fail = ProbeResult::failure("no records", ProbeSource::ProxyApi);
        assert!(!fail.is_success);
        assert_eq!(fail.message, "no records");
    }
}
