//! Post normalization: one heterogeneous vendor record in, one canonical
//! post (or a rejection) out.
//!
//! Field names vary by actor, so every lookup is an explicit ordered
//! cascade over the raw JSON — the precedence is the contract, and it is
//! visible in the key lists below.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use pulse_core::{PostType, ScoreWeights};
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::discovery::{extract_linkedin_slug, normalize_linkedin_url};
use crate::mentions::detect_company_mention;
use crate::text::sanitize_text;

static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\w+").unwrap());

/// Canonical fields produced by the normalizer, pending attribution and
/// persistence by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPost {
    pub linkedin_post_id: String,
    pub linkedin_url: String,
    pub post_type: PostType,
    pub text_content: String,
    pub published_at: DateTime<Utc>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub engagement_score: i64,
    pub mentions_company: bool,
    pub media_urls: Option<Vec<String>>,
    pub hashtags: Option<Vec<String>>,
}

/// A mention-search result: the normalized post plus the inline author
/// metadata stored when the author is not a tracked employee.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalPost {
    pub post: NormalizedPost,
    pub author_name: String,
    pub author_linkedin_url: String,
    pub author_public_identifier: String,
    pub author_avatar_url: String,
    pub author_headline: String,
}

/// First string value found under the given keys, in order.
fn json_str<'a>(value: &'a JsonValue, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(JsonValue::as_str))
}

/// First string-or-number value found under the given keys, in order.
/// Vendor IDs arrive as either.
fn json_id(value: &JsonValue, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key) {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// First numeric count found under the given keys; an array counts as its
/// length (some actors return comments as a list of comment objects).
fn json_count(value: &JsonValue, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| match value.get(*key) {
        Some(JsonValue::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(JsonValue::Array(items)) => Some(items.len() as i64),
        _ => None,
    })
}

fn is_repost(raw: &JsonValue) -> bool {
    if raw.get("isRepost").and_then(JsonValue::as_bool) == Some(true) {
        return true;
    }
    let type_text = json_str(raw, &["type", "postType"]).unwrap_or("").to_lowercase();
    type_text.contains("reshare") || type_text.contains("repost")
}

fn classify_post_type(raw: &JsonValue) -> PostType {
    let type_text = json_str(raw, &["type", "postType"]).unwrap_or("").to_lowercase();
    if type_text.contains("reshare") || type_text.contains("repost") {
        PostType::Reshare
    } else if type_text.contains("article") {
        PostType::Article
    } else if type_text.contains("poll") {
        PostType::Poll
    } else {
        PostType::Original
    }
}

/// Unix timestamps below 1e12 are seconds; above, milliseconds.
fn parse_timestamp(raw: f64) -> Option<DateTime<Utc>> {
    let millis = if raw < 1e12 { raw * 1000.0 } else { raw };
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
}

fn parse_date_text(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

fn parse_date_value(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(s) => parse_date_text(s),
        JsonValue::Number(n) => n.as_f64().and_then(parse_timestamp),
        _ => None,
    }
}

/// `postedAt` may be an ISO string, a unix timestamp, or an object with
/// `{timestamp, date}`; the later fallbacks are plain string/number fields.
/// When every source fails to parse, the post defaults to "now" rather
/// than being rejected.
fn resolve_published_at(raw: &JsonValue) -> DateTime<Utc> {
    if let Some(posted_at) = raw.get("postedAt") {
        if let Some(parsed) = posted_at
            .get("date")
            .and_then(parse_date_value)
            .or_else(|| posted_at.get("timestamp").and_then(parse_date_value))
            .or_else(|| parse_date_value(posted_at))
        {
            return parsed;
        }
    }
    ["publishedAt", "date", "createdAt"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(parse_date_value))
        .unwrap_or_else(Utc::now)
}

/// The author slug carried by a post, used for attribution: the public
/// identifier, the author URL slug, or — as a last resort — the slug in
/// the post's own `/posts/` URL. Company-authored posts have no person
/// slug and return None.
pub fn author_slug(raw: &JsonValue) -> Option<String> {
    let author = raw.get("author");
    if let Some(author) = author {
        if author.get("type").and_then(JsonValue::as_str) == Some("company") {
            return None;
        }
        if let Some(ident) = author.get("publicIdentifier").and_then(JsonValue::as_str) {
            if !ident.is_empty() {
                return Some(ident.to_lowercase());
            }
        }
        if let Some(url) = author.get("linkedinUrl").and_then(JsonValue::as_str) {
            if let Some(slug) = extract_linkedin_slug(url) {
                return Some(slug);
            }
        }
    }
    let post_url = json_str(raw, &["linkedinUrl", "url", "postUrl"]).unwrap_or("");
    post_url_slug(post_url)
}

fn post_url_slug(post_url: &str) -> Option<String> {
    let tail = post_url.split("/posts/").nth(1)?;
    let slug = tail.split('_').next()?.to_lowercase();
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// Whether the post was actually authored by the profile being scraped.
/// Signals are tried in reliability order; if none is present the post is
/// accepted — cannot verify must not mean silently dropped.
fn is_authored_by(raw: &JsonValue, profile_url: &str) -> bool {
    let Some(expected) = extract_linkedin_slug(profile_url) else {
        return true;
    };

    if let Some(author) = raw.get("author") {
        // An empty identifier is "absent", not "mismatched": fall through
        // to the author URL instead of rejecting.
        if let Some(ident) = author
            .get("publicIdentifier")
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
        {
            return ident.to_lowercase() == expected;
        }
        if let Some(url) = author.get("linkedinUrl").and_then(JsonValue::as_str) {
            return extract_linkedin_slug(url).as_deref() == Some(expected.as_str());
        }
        if author.get("type").and_then(JsonValue::as_str) == Some("company") {
            return false;
        }
    }

    let post_url = json_str(raw, &["linkedinUrl", "url", "postUrl"]).unwrap_or("");
    if post_url.contains("/posts/") {
        return post_url_slug(post_url).as_deref() == Some(expected.as_str());
    }

    true
}

fn extract_hashtags(raw: &JsonValue, text: &str) -> Vec<String> {
    if let Some(explicit) = raw.get("hashtags").and_then(JsonValue::as_array) {
        let mut tags = Vec::new();
        for tag in explicit.iter().filter_map(JsonValue::as_str) {
            let lower = tag.to_lowercase();
            if !tags.contains(&lower) {
                tags.push(lower);
            }
        }
        if !tags.is_empty() {
            return tags;
        }
    }

    let mut tags = Vec::new();
    for found in HASHTAG_RE.find_iter(text) {
        let lower = found.as_str().to_lowercase();
        if !tags.contains(&lower) {
            tags.push(lower);
        }
    }
    tags
}

fn extract_media_urls(raw: &JsonValue) -> Vec<String> {
    for key in ["images", "postImages", "media"] {
        let Some(items) = raw.get(key).and_then(JsonValue::as_array) else {
            continue;
        };
        let urls: Vec<String> = items
            .iter()
            .filter_map(|item| {
                item.as_str()
                    .or_else(|| item.get("url").and_then(JsonValue::as_str))
                    .map(ToString::to_string)
            })
            .collect();
        if !urls.is_empty() {
            return urls;
        }
    }
    Vec::new()
}

/// Map one raw vendor post to canonical fields. Returns None for reposts,
/// posts not authored by the target profile (when `profile_url` is given,
/// i.e. a per-profile feed scrape rather than a mention search), and
/// records with no usable identifier.
pub fn normalize_post(
    raw: &JsonValue,
    company_url: &str,
    profile_url: Option<&str>,
    weights: &ScoreWeights,
) -> Option<NormalizedPost> {
    if is_repost(raw) {
        return None;
    }
    if let Some(profile_url) = profile_url {
        if !is_authored_by(raw, profile_url) {
            return None;
        }
    }

    let linkedin_post_id = json_id(raw, &["postId", "shareUrn", "urn", "entityId", "id"]);
    let linkedin_url = json_str(raw, &["linkedinUrl", "url", "postUrl"])
        .map(ToString::to_string)
        .unwrap_or_default();
    if linkedin_post_id.is_none() && linkedin_url.is_empty() {
        return None;
    }

    let text_content = sanitize_text(json_str(raw, &["text", "textContent", "content"]).unwrap_or(""));

    // Nested engagement object wins over the top-level aliases.
    let engagement = raw.get("engagement");
    let likes = engagement
        .and_then(|e| json_count(e, &["likes"]))
        .or_else(|| json_count(raw, &["likes", "numLikes"]))
        .unwrap_or(0);
    let comments = engagement
        .and_then(|e| json_count(e, &["comments"]))
        .or_else(|| json_count(raw, &["comments", "numComments"]))
        .unwrap_or(0);
    let shares = engagement
        .and_then(|e| json_count(e, &["shares"]))
        .or_else(|| json_count(raw, &["shares", "numShares", "repostCount", "reposts"]))
        .unwrap_or(0);

    let published_at = resolve_published_at(raw);
    let hashtags = extract_hashtags(raw, &text_content);
    let media_urls = extract_media_urls(raw);

    let linkedin_post_id = linkedin_post_id.unwrap_or_else(|| linkedin_url.clone());
    let linkedin_url = if linkedin_url.is_empty() {
        format!("https://www.linkedin.com/feed/update/{linkedin_post_id}")
    } else {
        linkedin_url
    };

    Some(NormalizedPost {
        linkedin_post_id,
        linkedin_url,
        post_type: classify_post_type(raw),
        mentions_company: detect_company_mention(&text_content, company_url, None),
        engagement_score: weights.score(likes, comments, shares),
        text_content,
        published_at,
        likes,
        comments,
        shares,
        media_urls: if media_urls.is_empty() { None } else { Some(media_urls) },
        hashtags: if hashtags.is_empty() { None } else { Some(hashtags) },
    })
}

/// Map one mention-search result. The match is given — the post was found
/// by searching the company name — so `mentions_company` is forced true
/// rather than re-derived from text.
pub fn normalize_search_post(raw: &JsonValue, company_url: &str) -> Option<ExternalPost> {
    let mut post = normalize_post(raw, company_url, None, &ScoreWeights::default())?;
    post.mentions_company = true;

    let author = raw.get("author").cloned().unwrap_or(JsonValue::Null);
    let public_identifier = author
        .get("publicIdentifier")
        .and_then(JsonValue::as_str)
        .unwrap_or("")
        .to_string();
    let author_linkedin_url = match author.get("linkedinUrl").and_then(JsonValue::as_str) {
        Some(url) => normalize_linkedin_url(url),
        None if !public_identifier.is_empty() => {
            format!("https://www.linkedin.com/in/{public_identifier}")
        }
        None => String::new(),
    };
    let author_name = author
        .get("name")
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(if public_identifier.is_empty() {
            "Unknown"
        } else {
            public_identifier.as_str()
        })
        .to_string();
    let author_avatar_url = author
        .get("avatar")
        .and_then(|a| a.as_str().or_else(|| a.get("url").and_then(JsonValue::as_str)))
        .unwrap_or("")
        .to_string();
    let author_headline = author
        .get("info")
        .and_then(JsonValue::as_str)
        .unwrap_or("")
        .to_string();

    Some(ExternalPost {
        post,
        author_name,
        author_linkedin_url,
        author_public_identifier: public_identifier,
        author_avatar_url,
        author_headline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COMPANY_URL: &str = "https://www.linkedin.com/company/acme-corp";
    const PROFILE_URL: &str = "https://www.linkedin.com/in/jane-doe";

    fn weights() -> ScoreWeights {
        ScoreWeights::default()
    }

    #[test]
    fn reposts_are_rejected() {
        let flagged = json!({"postId": "p1", "isRepost": true});
        assert!(normalize_post(&flagged, COMPANY_URL, None, &weights()).is_none());

        let typed = json!({"postId": "p2", "type": "reshare_update"});
        assert!(normalize_post(&typed, COMPANY_URL, None, &weights()).is_none());

        let typed = json!({"postId": "p3", "postType": "Repost"});
        assert!(normalize_post(&typed, COMPANY_URL, None, &weights()).is_none());
    }

    #[test]
    fn posts_by_other_authors_are_rejected_on_profile_scrapes() {
        let other = json!({
            "postId": "p1",
            "author": {"publicIdentifier": "someone-else"},
        });
        assert!(normalize_post(&other, COMPANY_URL, Some(PROFILE_URL), &weights()).is_none());

        let company = json!({
            "postId": "p2",
            "author": {"type": "company"},
        });
        assert!(normalize_post(&company, COMPANY_URL, Some(PROFILE_URL), &weights()).is_none());

        // No author signal at all: cannot verify, accept.
        let bare = json!({"postId": "p3", "text": "hello"});
        assert!(normalize_post(&bare, COMPANY_URL, Some(PROFILE_URL), &weights()).is_some());
    }

    #[test]
    fn empty_public_identifier_defers_to_the_author_url() {
        let ours = json!({
            "postId": "p1",
            "author": {
                "publicIdentifier": "",
                "linkedinUrl": "https://www.linkedin.com/in/jane-doe",
            },
        });
        assert!(normalize_post(&ours, COMPANY_URL, Some(PROFILE_URL), &weights()).is_some());

        let theirs = json!({
            "postId": "p2",
            "author": {
                "publicIdentifier": "",
                "linkedinUrl": "https://www.linkedin.com/in/bob",
            },
        });
        assert!(normalize_post(&theirs, COMPANY_URL, Some(PROFILE_URL), &weights()).is_none());
    }

    #[test]
    fn post_url_slug_is_the_last_resort_author_signal() {
        let ours = json!({
            "postId": "p1",
            "url": "https://www.linkedin.com/posts/jane-doe_launch-activity-123",
        });
        assert!(normalize_post(&ours, COMPANY_URL, Some(PROFILE_URL), &weights()).is_some());

        let theirs = json!({
            "postId": "p2",
            "url": "https://www.linkedin.com/posts/bob_launch-activity-123",
        });
        assert!(normalize_post(&theirs, COMPANY_URL, Some(PROFILE_URL), &weights()).is_none());
    }

    #[test]
    fn identifier_cascade_prefers_post_id_then_falls_back_to_url() {
        let raw = json!({"postId": "id-1", "urn": "urn-1", "url": "https://x/post"});
        let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
        assert_eq!(post.linkedin_post_id, "id-1");

        let url_only = json!({"url": "https://x/post"});
        let post = normalize_post(&url_only, COMPANY_URL, None, &weights()).unwrap();
        assert_eq!(post.linkedin_post_id, "https://x/post");

        let neither = json!({"text": "no identity"});
        assert!(normalize_post(&neither, COMPANY_URL, None, &weights()).is_none());
    }

    #[test]
    fn missing_url_is_reconstructed_from_the_post_id() {
        let raw = json!({"postId": "urn:li:share:42"});
        let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
        assert_eq!(
            post.linkedin_url,
            "https://www.linkedin.com/feed/update/urn:li:share:42"
        );
    }

    #[test]
    fn nested_engagement_object_wins_over_top_level_counts() {
        let raw = json!({
            "postId": "p1",
            "likes": 1,
            "comments": 1,
            "shares": 1,
            "engagement": {"likes": 10, "comments": 20, "shares": 30},
        });
        let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
        assert_eq!((post.likes, post.comments, post.shares), (10, 20, 30));
        assert_eq!(post.engagement_score, 10 + 40 + 90);
    }

    #[test]
    fn comments_array_counts_by_length() {
        let raw = json!({
            "postId": "p1",
            "comments": [{"text": "a"}, {"text": "b"}, {"text": "c"}],
        });
        let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
        assert_eq!(post.comments, 3);
    }

    #[test]
    fn seconds_and_millisecond_timestamps_parse_to_the_same_instant() {
        let seconds = json!({"postId": "p1", "postedAt": {"timestamp": 1_700_000_000u64}});
        let millis = json!({"postId": "p2", "postedAt": {"timestamp": 1_700_000_000_000u64}});
        let a = normalize_post(&seconds, COMPANY_URL, None, &weights()).unwrap();
        let b = normalize_post(&millis, COMPANY_URL, None, &weights()).unwrap();
        assert_eq!(a.published_at, b.published_at);
    }

    #[test]
    fn posted_at_object_prefers_iso_date_over_timestamp() {
        let raw = json!({
            "postId": "p1",
            "postedAt": {"timestamp": 1_700_000_000u64, "date": "2024-01-15T08:30:00Z"},
        });
        let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
        assert_eq!(post.published_at.to_rfc3339(), "2024-01-15T08:30:00+00:00");
    }

    #[test]
    fn unparseable_dates_default_to_now_instead_of_rejecting() {
        let raw = json!({"postId": "p1", "publishedAt": "not a date"});
        let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
        assert!((Utc::now() - post.published_at).num_seconds() < 60);
    }

    #[test]
    fn post_type_classification() {
        for (type_text, expected) in [
            ("article share", PostType::Article),
            ("poll", PostType::Poll),
            ("regular", PostType::Original),
        ] {
            let raw = json!({"postId": "p", "type": type_text});
            let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
            assert_eq!(post.post_type, expected);
        }
    }

    #[test]
    fn hashtags_fall_back_to_text_extraction() {
        let raw = json!({"postId": "p1", "text": "Big news #Launch #AI #launch"});
        let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
        assert_eq!(
            post.hashtags,
            Some(vec!["#launch".to_string(), "#ai".to_string()])
        );
    }

    #[test]
    fn text_is_sanitized_of_nul_bytes() {
        let raw = json!({"postId": "p1", "text": "clean\u{0000}ed"});
        let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
        assert_eq!(post.text_content, "cleaned");
    }

    #[test]
    fn company_mentions_are_detected_from_text() {
        let raw = json!({"postId": "p1", "text": "We shipped it at acme-corp today"});
        let post = normalize_post(&raw, COMPANY_URL, None, &weights()).unwrap();
        assert!(post.mentions_company);
    }

    #[test]
    fn search_posts_force_the_mention_flag_and_carry_author_metadata() {
        let raw = json!({
            "postId": "p1",
            "text": "nothing about the company at all",
            "author": {
                "name": "Sam Poster",
                "publicIdentifier": "sam-poster",
                "linkedinUrl": "https://www.linkedin.com/in/sam-poster/?src=feed",
                "avatar": {"url": "https://cdn/avatar.jpg"},
                "info": "Growth at Elsewhere",
            },
        });
        let external = normalize_search_post(&raw, COMPANY_URL).unwrap();
        assert!(external.post.mentions_company);
        assert_eq!(external.author_name, "Sam Poster");
        assert_eq!(
            external.author_linkedin_url,
            "https://www.linkedin.com/in/sam-poster"
        );
        assert_eq!(external.author_avatar_url, "https://cdn/avatar.jpg");
        assert_eq!(external.author_headline, "Growth at Elsewhere");
    }

    #[test]
    fn search_post_author_url_is_reconstructed_from_public_identifier() {
        let raw = json!({
            "postId": "p1",
            "author": {"publicIdentifier": "sam-poster"},
        });
        let external = normalize_search_post(&raw, COMPANY_URL).unwrap();
        assert_eq!(
            external.author_linkedin_url,
            "https://www.linkedin.com/in/sam-poster"
        );
        assert_eq!(external.author_name, "sam-poster");
    }

    #[test]
    fn author_slug_resolution_order() {
        let ident = json!({"author": {"publicIdentifier": "Jane-Doe"}});
        assert_eq!(author_slug(&ident).as_deref(), Some("jane-doe"));

        let url = json!({"author": {"linkedinUrl": "https://www.linkedin.com/in/jane-doe"}});
        assert_eq!(author_slug(&url).as_deref(), Some("jane-doe"));

        let post_url = json!({"url": "https://www.linkedin.com/posts/jane-doe_x-y"});
        assert_eq!(author_slug(&post_url).as_deref(), Some("jane-doe"));

        let company = json!({"author": {"type": "company", "publicIdentifier": "acme"}});
        assert_eq!(author_slug(&company), None);

        assert_eq!(author_slug(&json!({})), None);
    }
}
