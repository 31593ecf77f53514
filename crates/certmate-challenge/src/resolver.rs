//! Challenge config resolution for a target hostname.
//!
//! Given a certificate's ordered challenge configurations, selects the
//! single config which applies to a hostname. Tie-break order: exact
//! pattern, explicit wildcard pattern, wildcard by specificity, suffix
//! by specificity, catch-all, legacy default. Resolution never fails;
//! absence of any match degrades to a synthetic legacy-default config.

use std::borrow::Cow;

use certmate_models::ChallengeConfig;
use tracing::trace;

use crate::matcher::is_domain_or_wildcard_match;

/// Normalize a `domain_match` pattern into a lookup key.
///
/// Single-value patterns are trimmed but keep their original casing;
/// `;`-separated values are trimmed and lower-cased. The asymmetry is
/// long-standing observed behavior: correcting it would change which
/// config wins for mixed-case patterns, so it is kept in one place
/// until confirmed safe to change.
fn normalize_key(pattern: &str, is_multi_value: bool) -> String {
    let trimmed = pattern.trim();
    if is_multi_value {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// Insertion-ordered pattern -> config map. Ordering matters twice: the
/// first catch-all encountered wins, and equal-length keys keep their
/// insertion order when sorted by specificity.
fn build_pattern_map<'a>(configs: &'a [ChallengeConfig]) -> Vec<(String, &'a ChallengeConfig)> {
    let mut patterns: Vec<(String, &'a ChallengeConfig)> = Vec::new();

    for config in configs.iter().filter(|c| !c.is_catch_all()) {
        // users sometimes enter comma separators instead of semicolons
        let domain_match = config
            .domain_match
            .as_deref()
            .unwrap_or("")
            .replace(',', ";");

        if !domain_match.contains(';') {
            let key = normalize_key(&domain_match, false);
            // first writer wins for single-value patterns
            if !patterns.iter().any(|(k, _)| k == &key) {
                patterns.push((key, config));
            }
        } else {
            for segment in domain_match.split(';') {
                if segment.trim().is_empty() {
                    continue;
                }

                let key = normalize_key(segment, true);
                // last writer wins for multi-value patterns
                if let Some(entry) = patterns.iter_mut().find(|(k, _)| *k == key) {
                    entry.1 = config;
                } else {
                    patterns.push((key, config));
                }
            }
        }
    }

    patterns
}

/// Resolve the challenge config applicable to `domain`.
///
/// With no configs at all, returns a synthetic config of
/// `legacy_default_type` (settings saved before multi-config support
/// carry their challenge type at the request level). A single config is
/// returned unconditionally, ignoring its `domain_match`: one config is
/// always the catch-all regardless of any stray domain filter left on
/// it.
pub fn resolve<'a>(
    configs: &'a [ChallengeConfig],
    domain: Option<&str>,
    legacy_default_type: &str,
) -> Cow<'a, ChallengeConfig> {
    if configs.is_empty() {
        return Cow::Owned(ChallengeConfig::legacy_default(legacy_default_type));
    }

    if configs.len() == 1 {
        return Cow::Borrowed(&configs[0]);
    }

    // first catch-all encountered is the only one ever used
    let catch_all = configs.iter().find(|c| c.is_catch_all());

    let domain = domain.map(|d| d.trim().to_lowercase()).unwrap_or_default();

    if !domain.is_empty() {
        let patterns = build_pattern_map(configs);

        // exact match
        if let Some((_, config)) = patterns.iter().find(|(k, _)| *k == domain) {
            trace!(domain = %domain, "challenge config matched exact pattern");
            return Cow::Borrowed(*config);
        }

        // explicit wildcard match
        let wildcard_key = format!("*.{}", domain);
        if let Some((_, config)) = patterns.iter().find(|(k, _)| *k == wildcard_key) {
            return Cow::Borrowed(*config);
        }

        // most specific (longest) pattern first; stable sort keeps
        // insertion order for equal lengths
        let mut ordered: Vec<&(String, &'a ChallengeConfig)> = patterns.iter().collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        for entry in ordered.iter().filter(|(k, _)| k.starts_with("*.")) {
            if is_domain_or_wildcard_match(std::slice::from_ref(&entry.0), &domain, false) {
                trace!(domain = %domain, pattern = %entry.0, "challenge config matched wildcard");
                return Cow::Borrowed(entry.1);
            }
        }

        for entry in ordered.iter().filter(|(k, _)| !k.starts_with("*.")) {
            if domain.ends_with(&entry.0.to_lowercase()) {
                trace!(domain = %domain, pattern = %entry.0, "challenge config matched suffix");
                return Cow::Borrowed(entry.1);
            }
        }
    }

    match catch_all {
        Some(config) => Cow::Borrowed(config),
        None => Cow::Owned(ChallengeConfig::legacy_default(legacy_default_type)),
    }
}

/// Subset of `domains` which resolve to the given config, considering
/// all other configs. Used to report "these N hostnames use this
/// validation method".
pub fn get_domains_matching(
    configs: &[ChallengeConfig],
    config: &ChallengeConfig,
    domains: &[String],
    legacy_default_type: &str,
) -> Vec<String> {
    let mut matches = Vec::new();

    for domain in domains {
        if let Cow::Borrowed(resolved) = resolve(configs, Some(domain), legacy_default_type) {
            if std::ptr::eq(resolved, config) {
                matches.push(domain.clone());
            }
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use certmate_models::{CHALLENGE_TYPE_DNS, CHALLENGE_TYPE_HTTP};

    fn config(challenge_type: &str, domain_match: Option<&str>, credential: &str) -> ChallengeConfig {
        ChallengeConfig {
            challenge_type: challenge_type.to_string(),
            domain_match: domain_match.map(|s| s.to_string()),
            challenge_credential_key: Some(credential.to_string()),
            ..Default::default()
        }
    }

    fn credential<'a>(result: &'a Cow<'a, ChallengeConfig>) -> &'a str {
        result.challenge_credential_key.as_deref().unwrap_or("")
    }

    fn multi_configs() -> Vec<ChallengeConfig> {
        vec![
            config(CHALLENGE_TYPE_HTTP, None, "config-default"),
            config(CHALLENGE_TYPE_DNS, Some("*.fred.com"), "config-wildcard"),
            config(CHALLENGE_TYPE_DNS, Some("fred.com"), "config2"),
            config(CHALLENGE_TYPE_DNS, Some("subdomain.example.com"), "config3"),
            // mixed comma/semicolon separators with stray spaces
            config(CHALLENGE_TYPE_HTTP, Some("example.com;www.other.com, *.wild.com "), "config4"),
        ]
    }

    #[test]
    fn test_no_configs_returns_legacy_default() {
        let result = resolve(&[], Some("example.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(result.challenge_type, CHALLENGE_TYPE_HTTP);
        assert!(matches!(result, Cow::Owned(_)));
    }

    #[test]
    fn test_single_config_always_wins() {
        // a lone config is the catch-all even with a stray domain filter
        let configs = vec![config(CHALLENGE_TYPE_DNS, Some("only.example.com"), "only")];

        for domain in [None, Some("only.example.com"), Some("unrelated.net")] {
            let result = resolve(&configs, domain, CHALLENGE_TYPE_HTTP);
            assert_eq!(credential(&result), "only");
        }
    }

    #[test]
    fn test_blank_domain_matches_catch_all() {
        let configs = multi_configs();

        let result = resolve(&configs, None, CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config-default");

        let result = resolve(&configs, Some(""), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config-default");
    }

    #[test]
    fn test_exact_and_wildcard_matches() {
        let configs = multi_configs();

        let result = resolve(&configs, Some("*.fred.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config-wildcard", "explicit wildcard key");

        let result = resolve(&configs, Some("www.fred.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config-wildcard", "one label under wildcard");

        let result = resolve(&configs, Some("fred.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config2", "exact beats wildcard");

        let result = resolve(&configs, Some("subdomain.example.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config3");
    }

    #[test]
    fn test_multi_value_patterns() {
        let configs = multi_configs();

        let result = resolve(&configs, Some("example.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config4");

        let result = resolve(&configs, Some("www.other.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config4");

        let result = resolve(&configs, Some("sub.wild.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config4", "wildcard from comma-separated list");

        // two labels under the wildcard is out of scope for it
        let result = resolve(&configs, Some("www.sub.wild.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config-default");
    }

    #[test]
    fn test_unmatched_domain_falls_back_to_catch_all() {
        let configs = multi_configs();
        let result = resolve(&configs, Some("www.unrelated.net"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "config-default");
    }

    #[test]
    fn test_specificity_ladder() {
        // exact beats wildcard beats suffix beats catch-all
        let configs = vec![
            config(CHALLENGE_TYPE_HTTP, None, "catch-all"),
            config(CHALLENGE_TYPE_DNS, Some("www.a.com"), "exact"),
            config(CHALLENGE_TYPE_DNS, Some("*.a.com"), "wildcard"),
            config(CHALLENGE_TYPE_DNS, Some("a.com"), "suffix"),
        ];

        let result = resolve(&configs, Some("www.a.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "exact");

        let result = resolve(&configs, Some("x.a.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "wildcard");

        // wildcard label-count rule excludes deeper names; suffix rule
        // (no label restriction) picks them up
        let result = resolve(&configs, Some("sub.other.a.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "suffix");

        // exact key match, not the wildcard
        let result = resolve(&configs, Some("a.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "suffix");
    }

    #[test]
    fn test_no_catch_all_degrades_to_legacy_default() {
        let configs = vec![
            config(CHALLENGE_TYPE_DNS, Some("a.com"), "a"),
            config(CHALLENGE_TYPE_DNS, Some("b.com"), "b"),
        ];

        let result = resolve(&configs, Some("unrelated.net"), CHALLENGE_TYPE_HTTP);
        assert_eq!(result.challenge_type, CHALLENGE_TYPE_HTTP);
        assert!(matches!(result, Cow::Owned(_)));
    }

    #[test]
    fn test_first_writer_wins_for_single_patterns() {
        let configs = vec![
            config(CHALLENGE_TYPE_HTTP, None, "catch-all"),
            config(CHALLENGE_TYPE_DNS, Some("dup.com"), "first"),
            config(CHALLENGE_TYPE_DNS, Some("dup.com"), "second"),
        ];

        let result = resolve(&configs, Some("dup.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "first");
    }

    #[test]
    fn test_last_writer_wins_for_multi_patterns() {
        let configs = vec![
            config(CHALLENGE_TYPE_HTTP, None, "catch-all"),
            config(CHALLENGE_TYPE_DNS, Some("dup.com;x.net"), "first"),
            config(CHALLENGE_TYPE_DNS, Some("dup.com;y.net"), "second"),
        ];

        let result = resolve(&configs, Some("dup.com"), CHALLENGE_TYPE_HTTP);
        assert_eq!(credential(&result), "second");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let configs = multi_configs();

        let first = resolve(&configs, Some("www.fred.com"), CHALLENGE_TYPE_HTTP);
        let second = resolve(&configs, Some("www.fred.com"), CHALLENGE_TYPE_HTTP);

        match (&first, &second) {
            (Cow::Borrowed(a), Cow::Borrowed(b)) => assert!(std::ptr::eq(*a, *b)),
            _ => panic!("expected borrowed configs"),
        }
    }

    #[test]
    fn test_domains_matching_partitions_exactly() {
        let configs = multi_configs();
        let domains: Vec<String> = [
            "fred.com",
            "www.fred.com",
            "example.com",
            "subdomain.example.com",
            "www.unrelated.net",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut seen = Vec::new();
        for config in &configs {
            let matches = get_domains_matching(&configs, config, &domains, CHALLENGE_TYPE_HTTP);
            for m in matches {
                assert!(!seen.contains(&m), "domain {} matched twice", m);
                seen.push(m);
            }
        }

        assert_eq!(seen.len(), domains.len(), "every domain appears exactly once");
    }
}
