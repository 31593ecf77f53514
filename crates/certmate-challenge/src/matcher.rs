//! Wildcard/suffix hostname matching shared by the challenge resolver.

/// Check whether `hostname` matches any of the given DNS name patterns.
///
/// A pattern matches when it equals the hostname exactly, or when it is
/// a wildcard (`*.example.com`) and the hostname is exactly one label
/// deeper than the wildcard base. `*.example.com` matches
/// `www.example.com` but not `a.b.example.com`.
///
/// With `match_wildcards_to_root`, `*.example.com` also matches the bare
/// root `example.com`.
pub fn is_domain_or_wildcard_match(
    dns_names: &[String],
    hostname: &str,
    match_wildcards_to_root: bool,
) -> bool {
    if hostname.is_empty() {
        return false;
    }

    if dns_names.iter().any(|d| d == hostname) {
        return true;
    }

    for wildcard in dns_names.iter().filter(|d| d.starts_with("*.")) {
        if wildcard.eq_ignore_ascii_case(hostname) {
            return true;
        }

        let base = &wildcard["*.".len()..];

        if base.eq_ignore_ascii_case(hostname) && match_wildcards_to_root {
            return true;
        }

        // hostname must end with ".{base}" and be exactly one label deeper
        let suffix = format!(".{}", base);
        if hostname.to_lowercase().ends_with(&suffix.to_lowercase())
            && label_count(hostname) == label_count(base) + 1
        {
            return true;
        }
    }

    false
}

fn label_count(name: &str) -> usize {
    name.matches('.').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match() {
        assert!(is_domain_or_wildcard_match(
            &names(&["www.example.com"]),
            "www.example.com",
            false
        ));
        assert!(!is_domain_or_wildcard_match(
            &names(&["www.example.com"]),
            "example.com",
            false
        ));
    }

    #[test]
    fn test_wildcard_single_label() {
        let patterns = names(&["*.example.com"]);

        assert!(is_domain_or_wildcard_match(&patterns, "www.example.com", false));
        assert!(is_domain_or_wildcard_match(&patterns, "*.example.com", false));

        // two labels deeper is not covered by the wildcard
        assert!(!is_domain_or_wildcard_match(&patterns, "a.b.example.com", false));
    }

    #[test]
    fn test_wildcard_root_matching() {
        let patterns = names(&["*.example.com"]);

        assert!(!is_domain_or_wildcard_match(&patterns, "example.com", false));
        assert!(is_domain_or_wildcard_match(&patterns, "example.com", true));
    }

    #[test]
    fn test_case_insensitive_wildcard() {
        let patterns = names(&["*.Example.Com"]);
        assert!(is_domain_or_wildcard_match(&patterns, "www.example.com", false));
    }

    #[test]
    fn test_empty_hostname() {
        assert!(!is_domain_or_wildcard_match(&names(&["*.example.com"]), "", false));
    }
}
