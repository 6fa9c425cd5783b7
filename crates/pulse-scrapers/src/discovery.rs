//! Discovery-actor output handling: profile URL extraction and the slug
//! lookups used for author attribution.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;

static PROFILE_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)linkedin\.com/in/([^/?#]+)").unwrap());

/// Remove trailing slashes and query parameters.
pub fn normalize_linkedin_url(url: &str) -> String {
    let url = url.split('?').next().unwrap_or(url);
    url.trim_end_matches('/').to_string()
}

/// The `/in/username` slug of a LinkedIn profile URL, lower-cased.
pub fn extract_linkedin_slug(url: &str) -> Option<String> {
    PROFILE_SLUG_RE.captures(url).map(|c| c[1].to_lowercase())
}

/// The slug used for a discovery stub's placeholder name.
pub fn stub_slug(url: &str) -> String {
    url.split("/in/")
        .nth(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Pull profile URLs out of discovery-actor items, keeping only personal
/// profile links, normalized and de-duplicated in arrival order.
pub fn extract_profile_urls(items: &[JsonValue]) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        let url = ["profileUrl", "linkedinUrl", "url"]
            .iter()
            .find_map(|key| item.get(*key).and_then(JsonValue::as_str))
            .unwrap_or("");
        if !url.contains("linkedin.com/in/") {
            continue;
        }
        let normalized = normalize_linkedin_url(url);
        if !seen.contains(&normalized) {
            seen.push(normalized);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_normalization_strips_slash_and_query() {
        assert_eq!(
            normalize_linkedin_url("https://www.linkedin.com/in/jane-doe/?utm=x"),
            "https://www.linkedin.com/in/jane-doe"
        );
    }

    #[test]
    fn slug_extraction_is_case_insensitive() {
        assert_eq!(
            extract_linkedin_slug("https://www.LinkedIn.com/in/Jane-Doe/"),
            Some("jane-doe".to_string())
        );
        assert_eq!(extract_linkedin_slug("https://example.com/jane"), None);
    }

    #[test]
    fn discovery_items_are_filtered_and_deduplicated() {
        let items = vec![
            json!({"profileUrl": "https://www.linkedin.com/in/jane-doe/"}),
            json!({"linkedinUrl": "https://www.linkedin.com/in/jane-doe?src=search"}),
            json!({"url": "https://www.linkedin.com/company/acme-corp"}),
            json!({"url": "https://www.linkedin.com/in/bob"}),
            json!({"name": "no url at all"}),
        ];
        assert_eq!(
            extract_profile_urls(&items),
            vec![
                "https://www.linkedin.com/in/jane-doe".to_string(),
                "https://www.linkedin.com/in/bob".to_string(),
            ]
        );
    }

    #[test]
    fn stub_slug_falls_back_to_unknown() {
        assert_eq!(stub_slug("https://www.linkedin.com/in/jane-doe/"), "jane-doe");
        assert_eq!(stub_slug("https://example.com"), "unknown");
    }
}
