//! Challenge configuration: assignment of a validation method and
//! credential to one or more hostnames within a certificate request.

use serde::{Deserialize, Serialize};

/// ACME HTTP challenge (token served over plain HTTP on the hostname)
pub const CHALLENGE_TYPE_HTTP: &str = "http-01";

/// ACME DNS challenge (TXT record created under the hostname)
pub const CHALLENGE_TYPE_DNS: &str = "dns-01";

/// Free-form provider parameter (API zone id, region etc.)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderParameter {
    pub key: String,
    pub value: String,
}

/// A validation-method assignment for one or more hostnames.
///
/// `domain_match` selects which hostnames this config applies to:
/// `None`/empty is the catch-all, otherwise a `;`-separated list of
/// exact or wildcard (`*.example.com`) patterns. Callers should keep at
/// most one catch-all per certificate; the resolver only ever uses the
/// first one it encounters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Challenge type, e.g. `http-01` or `dns-01`
    pub challenge_type: String,

    /// Hostname pattern(s) this config applies to; empty = catch-all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_match: Option<String>,

    /// Id of the challenge/DNS provider plugin which performs the proof
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_provider: Option<String>,

    /// Key of the stored credential the provider should use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_credential_key: Option<String>,

    /// Additional provider-specific parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ProviderParameter>,
}

impl ChallengeConfig {
    /// A synthetic config carrying only a challenge type, used when a
    /// certificate predates multi-config support or no config matches.
    pub fn legacy_default(challenge_type: &str) -> Self {
        Self {
            challenge_type: challenge_type.to_string(),
            ..Default::default()
        }
    }

    /// True when this config applies to every hostname not claimed by a
    /// more specific config.
    pub fn is_catch_all(&self) -> bool {
        self.domain_match.as_deref().unwrap_or("").trim().is_empty()
    }
}
