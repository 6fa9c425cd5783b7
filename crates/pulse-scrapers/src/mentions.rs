//! Company-mention detection over free post text.

use std::sync::LazyLock;

use regex::Regex;

static COMPANY_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"company/([^/?\s]+)").unwrap());

/// The `acme-corp` part of `linkedin.com/company/acme-corp`, lower-cased.
pub fn company_slug(company_url: &str) -> Option<String> {
    COMPANY_SLUG_RE
        .captures(company_url)
        .map(|c| c[1].to_lowercase())
}

/// Case-insensitive substring heuristics, short-circuiting on first match:
/// the company @mention (LinkedIn renders these as the display name), the
/// URL slug anywhere in text, the full normalized company URL, and — when
/// given — the human-readable company name. The name check is the repair
/// pass's extra signal; the scrape-path detector passes `None`.
pub fn detect_company_mention(text: &str, company_url: &str, company_name: Option<&str>) -> bool {
    if text.is_empty() || company_url.is_empty() {
        return false;
    }

    let lower_text = text.to_lowercase();
    let slug = company_slug(company_url).unwrap_or_default();

    if !slug.is_empty() {
        if lower_text.contains(&format!("@{}", slug.replace('-', " "))) {
            return true;
        }
        if lower_text.contains(&format!("@{slug}")) {
            return true;
        }
        if lower_text.contains(&slug) {
            return true;
        }
    }

    let normalized_url = company_url.to_lowercase();
    let normalized_url = normalized_url.trim_end_matches('/');
    if !normalized_url.is_empty() && lower_text.contains(normalized_url) {
        return true;
    }

    if let Some(name) = company_name {
        if !name.is_empty() && lower_text.contains(&name.to_lowercase()) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.linkedin.com/company/acme-corp/";

    #[test]
    fn slug_extraction() {
        assert_eq!(company_slug(URL).as_deref(), Some("acme-corp"));
        assert_eq!(company_slug("https://example.com"), None);
    }

    #[test]
    fn at_mention_with_spaces_matches() {
        assert!(detect_company_mention("Proud day at @Acme Corp!", URL, None));
    }

    #[test]
    fn raw_slug_matches_anywhere() {
        assert!(detect_company_mention("see acme-corp for details", URL, None));
    }

    #[test]
    fn full_url_matches() {
        assert!(detect_company_mention(
            "apply via https://www.linkedin.com/company/acme-corp",
            URL,
            None,
        ));
    }

    #[test]
    fn company_name_only_matches_when_provided() {
        let text = "Huge milestone for Acme Corporation this quarter";
        assert!(!detect_company_mention(text, URL, None));
        assert!(detect_company_mention(text, URL, Some("Acme Corporation")));
    }

    #[test]
    fn unrelated_text_does_not_match() {
        assert!(!detect_company_mention("weekend hiking photos", URL, Some("Acme Corporation")));
    }

    #[test]
    fn empty_inputs_never_match() {
        assert!(!detect_company_mention("", URL, None));
        assert!(!detect_company_mention("acme-corp", "", None));
    }
}
