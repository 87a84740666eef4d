//! Source resolution and cache-busting for embedded content.

use fg_core::EmbedError;
use fg_core::EmbedResult;
use std::collections::BTreeSet;
use url::Url;

const CACHE_BUST_PARAM: &str = "ts";

/// Rewrite rules for hosts that must be reached through the local reverse
/// proxy instead of requested directly (TLS trust issues in non-production
/// deployments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRules {
    denylist: BTreeSet<String>,
    proxy_path_prefix: String,
}

impl ProxyRules {
    pub fn new(proxy_path_prefix: impl Into<String>) -> Self {
        Self {
            denylist: BTreeSet::new(),
            proxy_path_prefix: proxy_path_prefix.into(),
        }
    }

    /// Rules with no denylisted hosts; every source passes through as-is.
    pub fn pass_through() -> Self {
        Self::new("")
    }

    /// Defaults matching the portal deployment: the reservation backend is
    /// served over a self-signed certificate and goes through the proxy.
    pub fn portal_defaults() -> Self {
        Self::new("/reservation-proxy").deny("https://10.101.5.111:4433")
    }

    pub fn deny(mut self, source: impl Into<String>) -> Self {
        self.denylist.insert(source.into());
        self
    }

    pub fn proxy_path_prefix(&self) -> &str {
        &self.proxy_path_prefix
    }

    pub fn is_denied(&self, requested: &str) -> bool {
        let normalized = normalize_source(requested);
        self.denylist
            .iter()
            .any(|entry| normalize_source(entry) == normalized)
    }
}

/// Maps the caller-supplied source to the value the frame element receives.
///
/// Denylisted absolute hosts rewrite to the proxy path prefix; relative
/// paths and other absolute URLs pass through unchanged. An empty source is
/// a precondition violation, never a renderable value.
pub fn resolve_source(requested: &str, rules: &ProxyRules) -> EmbedResult<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(EmbedError::new(
            "frame.source_missing",
            "embed source is empty",
        ));
    }

    if rules.is_denied(trimmed) {
        return Ok(rules.proxy_path_prefix.clone());
    }

    Ok(trimmed.to_owned())
}

/// Appends or replaces the cache-busting query parameter so a reassignment
/// is never served from cache, even when the rest of the URL is identical.
pub fn with_cache_buster(source: &str, stamp: &str) -> EmbedResult<String> {
    if source.trim().is_empty() {
        return Err(EmbedError::new(
            "frame.source_missing",
            "cannot cache-bust an empty source",
        ));
    }

    match Url::parse(source) {
        Ok(mut parsed) => {
            let kept: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(key, _)| key != CACHE_BUST_PARAM)
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();

            parsed
                .query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair(CACHE_BUST_PARAM, stamp);

            Ok(parsed.into())
        }
        // Relative sources (proxy paths) get their query rebuilt by hand.
        Err(_) => {
            let (base, query) = match source.split_once('?') {
                Some((base, query)) => (base, query),
                None => (source, ""),
            };

            let bust_prefix = format!("{CACHE_BUST_PARAM}=");
            let mut pairs: Vec<&str> = query
                .split('&')
                .filter(|pair| !pair.is_empty() && !pair.starts_with(&bust_prefix))
                .collect();

            let bust = format!("{CACHE_BUST_PARAM}={stamp}");
            pairs.push(&bust);
            Ok(format!("{base}?{}", pairs.join("&")))
        }
    }
}

fn normalize_source(value: &str) -> String {
    match Url::parse(value.trim()) {
        Ok(parsed) => {
            let origin = parsed.origin().ascii_serialization();
            let path = parsed.path().trim_end_matches('/');
            format!("{origin}{path}")
        }
        Err(_) => value.trim().trim_end_matches('/').to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::ProxyRules;
    use super::resolve_source;
    use super::with_cache_buster;

    #[test]
    fn denylisted_host_rewrites_to_proxy_prefix() {
        let rules = ProxyRules::portal_defaults();
        let resolved = resolve_source("https://10.101.5.111:4433", &rules);
        assert_eq!(resolved, Ok("/reservation-proxy".to_owned()));
    }

    #[test]
    fn denylist_match_ignores_trailing_slash() {
        let rules = ProxyRules::portal_defaults();
        let resolved = resolve_source("https://10.101.5.111:4433/", &rules);
        assert_eq!(resolved, Ok("/reservation-proxy".to_owned()));
    }

    #[test]
    fn other_absolute_urls_pass_through() {
        let rules = ProxyRules::portal_defaults();
        let resolved = resolve_source("https://public.example.com/form", &rules);
        assert_eq!(resolved, Ok("https://public.example.com/form".to_owned()));
    }

    #[test]
    fn relative_paths_pass_through() {
        let rules = ProxyRules::portal_defaults();
        let resolved = resolve_source("/embedded/booking", &rules);
        assert_eq!(resolved, Ok("/embedded/booking".to_owned()));
    }

    #[test]
    fn empty_source_is_rejected() {
        let rules = ProxyRules::pass_through();
        let resolved = resolve_source("   ", &rules);
        assert!(resolved.is_err());
        if let Err(error) = resolved {
            assert_eq!(error.code, "frame.source_missing");
        }
    }

    #[test]
    fn cache_buster_appends_to_absolute_url() {
        let busted = with_cache_buster("https://example.com/form?lang=es", "17000-1");
        assert_eq!(
            busted,
            Ok("https://example.com/form?lang=es&ts=17000-1".to_owned())
        );
    }

    #[test]
    fn cache_buster_replaces_previous_stamp() {
        let first = match with_cache_buster("https://example.com/form", "17000-1") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let second = match with_cache_buster(&first, "17000-2") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };

        assert_ne!(first, second);
        assert_eq!(second.matches("ts=").count(), 1);
    }

    #[test]
    fn cache_buster_handles_relative_proxy_paths() {
        let busted = with_cache_buster("/reservation-proxy", "17000-1");
        assert_eq!(busted, Ok("/reservation-proxy?ts=17000-1".to_owned()));

        let rebusted = with_cache_buster("/reservation-proxy?ts=17000-1", "17000-2");
        assert_eq!(rebusted, Ok("/reservation-proxy?ts=17000-2".to_owned()));
    }
}
