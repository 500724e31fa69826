//! Deterministic cache key derivation
//!
//! Keys combine a readable slug of the normalized company name with a short
//! SHA-256 fingerprint of the same normalized string:
//!
//! ```text
//! logo:img:acme-corp:5d41402a
//! logo:search:direct:acme-corp:5d41402a
//! ```
//!
//! The slug keeps keys browsable in the backend; the fingerprint keeps names
//! that share a truncated slug apart. Nothing here is salted per process, so
//! a key derived today is the same key after a restart.

use sha2::{Digest, Sha256};
use std::fmt;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Maximum number of slug characters kept in a key
pub const SLUG_MAX_LEN: usize = 30;
/// Hex characters of the fingerprint
pub const FINGERPRINT_HEX_LEN: usize = 8;

/// One of the four independent cache namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CacheTier {
    Image,
    Metadata,
    Search,
    Autocomplete,
}

impl CacheTier {
    pub fn all() -> impl Iterator<Item = CacheTier> {
        Self::iter()
    }

    fn segment(&self) -> &'static str {
        match self {
            CacheTier::Image => "img",
            CacheTier::Metadata => "meta",
            CacheTier::Search => "search",
            CacheTier::Autocomplete => "autocomplete",
        }
    }
}

/// Call-site sub-namespace inside the search tier
///
/// A suggestion picked from autocomplete is cached apart from an exact
/// lookup so that one never shadows the other for a same-named company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SearchScope {
    Direct,
    Suggestion,
}

impl SearchScope {
    fn segment(&self) -> &'static str {
        match self {
            SearchScope::Direct => "direct",
            SearchScope::Suggestion => "suggest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercased, trimmed form used for every key and name comparison
pub fn normalize_company_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Derive a key under the default namespace
pub fn derive_key(tier: CacheTier, company_name: &str) -> CacheKey {
    KeyDeriver::default().derive(tier, company_name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeriver {
    namespace: String,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(crate::config::defaults::DEFAULT_KEY_NAMESPACE)
    }
}

impl KeyDeriver {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: namespace.trim().trim_end_matches(':').to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key for `company_name` in `tier`; search keys use the direct scope
    pub fn derive(&self, tier: CacheTier, company_name: &str) -> CacheKey {
        match tier {
            CacheTier::Search => self.derive_search(SearchScope::Direct, company_name),
            _ => CacheKey(format!(
                "{}{}",
                self.tier_prefix(tier),
                fingerprint(company_name)
            )),
        }
    }

    pub fn derive_search(&self, scope: SearchScope, company_name: &str) -> CacheKey {
        CacheKey(format!(
            "{}{}:{}",
            self.tier_prefix(CacheTier::Search),
            scope.segment(),
            fingerprint(company_name)
        ))
    }

    /// Prefix shared by every key of a tier, suitable for prefix scans
    pub fn tier_prefix(&self, tier: CacheTier) -> String {
        format!("{}:{}:", self.namespace, tier.segment())
    }

    /// Key holding the active provider; outside every tier and never expiring
    pub fn provider_config_key(&self) -> String {
        format!("{}:config:provider", self.namespace)
    }

    /// Every key a company name can occupy, one per tier and search scope
    pub fn keys_for(&self, company_name: &str) -> Vec<(CacheTier, CacheKey)> {
        vec![
            (CacheTier::Image, self.derive(CacheTier::Image, company_name)),
            (CacheTier::Metadata, self.derive(CacheTier::Metadata, company_name)),
            (
                CacheTier::Search,
                self.derive_search(SearchScope::Direct, company_name),
            ),
            (
                CacheTier::Search,
                self.derive_search(SearchScope::Suggestion, company_name),
            ),
            (
                CacheTier::Autocomplete,
                self.derive(CacheTier::Autocomplete, company_name),
            ),
        ]
    }
}

/// `<slug>:<fingerprint>` for a company name
fn fingerprint(company_name: &str) -> String {
    let normalized = normalize_company_name(company_name);

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    let hash = hex::encode(&digest[..FINGERPRINT_HEX_LEN / 2]);

    format!("{}:{}", slug(&normalized), hash)
}

fn slug(normalized: &str) -> String {
    let mut slug = String::with_capacity(normalized.len().min(SLUG_MAX_LEN));
    let mut last_was_dash = false;

    for c in normalized.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
        if slug.len() >= SLUG_MAX_LEN {
            break;
        }
    }

    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "_".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    #[case(CacheTier::Image, "logo:img:")]
    #[case(CacheTier::Metadata, "logo:meta:")]
    #[case(CacheTier::Search, "logo:search:direct:")]
    #[case(CacheTier::Autocomplete, "logo:autocomplete:")]
    fn test_tier_keys_are_prefixed(#[case] tier: CacheTier, #[case] prefix: &str) {
        let key = derive_key(tier, "Acme");
        assert!(key.as_str().starts_with(prefix), "{key} should start with {prefix}");
        assert!(key.as_str().starts_with(&KeyDeriver::default().tier_prefix(tier)));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let first = derive_key(CacheTier::Image, "Acme Corp");
        let second = derive_key(CacheTier::Image, "Acme Corp");
        let fresh = KeyDeriver::new("logo").derive(CacheTier::Image, "Acme Corp");
        assert_eq!(first, second);
        assert_eq!(first, fresh);
    }

    #[test]
    fn test_known_key_is_stable_across_releases() {
        let key = derive_key(CacheTier::Image, "acme");
        let mut hasher = Sha256::new();
        hasher.update(b"acme");
        let expected = format!("logo:img:acme:{}", &hex::encode(hasher.finalize())[..8]);
        assert_eq!(key.as_str(), expected);
    }

    #[rstest]
    #[case("Acme", "acme")]
    #[case("  ACME  ", "acme")]
    #[case("acme\t", "Acme")]
    fn test_case_and_whitespace_variants_share_a_key(#[case] a: &str, #[case] b: &str) {
        assert_eq!(derive_key(CacheTier::Search, a), derive_key(CacheTier::Search, b));
    }

    #[test]
    fn test_long_names_with_shared_prefix_do_not_collide() {
        let prefix = "International Business Machines Corporation";
        let names: Vec<String> = (0..50).map(|i| format!("{prefix} Division {i}")).collect();

        let keys: HashSet<CacheKey> = names
            .iter()
            .map(|name| derive_key(CacheTier::Image, name))
            .collect();
        assert_eq!(keys.len(), names.len());

        // The readable part really is shared, the fingerprint does the work
        let slugs: HashSet<String> = names.iter().map(|n| slug(&normalize_company_name(n))).collect();
        assert_eq!(slugs.len(), 1);
    }

    #[test]
    fn test_punctuation_variants_do_not_collide() {
        let a = derive_key(CacheTier::Image, "AT&T");
        let b = derive_key(CacheTier::Image, "AT-T");
        let c = derive_key(CacheTier::Image, "at t");
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_slug_is_readable_and_bounded() {
        assert_eq!(slug("acme corp."), "acme-corp");
        assert_eq!(slug("!!!"), "_");
        assert_eq!(slug("société générale"), "soci-t-g-n-rale");
        assert!(slug(&"x".repeat(200)).len() <= SLUG_MAX_LEN);
    }

    #[test]
    fn test_search_scopes_are_distinct() {
        let deriver = KeyDeriver::default();
        let direct = deriver.derive_search(SearchScope::Direct, "Meta");
        let suggestion = deriver.derive_search(SearchScope::Suggestion, "Meta");
        assert_ne!(direct, suggestion);
        assert!(suggestion.as_str().starts_with(&deriver.tier_prefix(CacheTier::Search)));
    }

    #[test]
    fn test_keys_for_covers_every_tier() {
        let deriver = KeyDeriver::new("tracker:");
        let keys = deriver.keys_for("Acme");
        assert_eq!(keys.len(), 5);
        for tier in CacheTier::all() {
            assert!(keys.iter().any(|(t, _)| *t == tier));
        }
        assert!(keys.iter().all(|(_, k)| k.as_str().starts_with("tracker:")));
        assert_eq!(deriver.provider_config_key(), "tracker:config:provider");
    }
}
