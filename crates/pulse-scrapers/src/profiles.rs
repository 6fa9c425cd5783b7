//! Profile normalization and headline-driven classification.
//!
//! Department and role inference are ordered rule cascades over the
//! headline: first match wins, and the ordering *is* the contract (the
//! marketing rule must run before the engineering rule so "Content
//! Engineering" titles land in MARKETING).

use std::sync::LazyLock;

use chrono::NaiveDate;
use pulse_core::{Department, EmployeeRole};
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::discovery::normalize_linkedin_url;
use crate::mentions::company_slug;
use crate::text::sanitize_text;

/// Canonical profile fields, ready to merge onto a stored employee.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProfile {
    pub linkedin_url: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub headline: String,
    pub about: String,
    pub job_title: String,
    pub department: Department,
    pub avatar_url: String,
    pub experience: Option<JsonValue>,
    pub education: Option<JsonValue>,
    pub skills: Option<JsonValue>,
}

fn json_str<'a>(value: &'a JsonValue, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(JsonValue::as_str))
        .filter(|s| !s.is_empty())
}

fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let rest: Vec<&str> = parts.collect();
    (first, rest.join(" "))
}

/// Avatar fields arrive as either a bare string URL or a `{url, sizes}`
/// object, depending on the actor.
fn avatar_url(raw: &JsonValue) -> String {
    ["profilePicture", "profileImageUrl", "avatarUrl"]
        .iter()
        .find_map(|key| {
            let field = raw.get(*key)?;
            field
                .as_str()
                .or_else(|| field.get("url").and_then(JsonValue::as_str))
        })
        .unwrap_or("")
        .to_string()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

// "cto" is a substring of "director" and "coo" of "coordinator", so the
// short acronyms need word boundaries rather than a contains check.
static C_SUITE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(ceo|cto|coo|cfo)\b").unwrap());

const ADVISOR_KEYWORDS: &[&str] = &["advisor", "adviser", "consultant", "fractional"];
const SENIOR_TITLE_KEYWORDS: &[&str] = &[
    "vp",
    "vice president",
    "head of",
    "director",
    "manager",
    "lead",
];

/// Headline → department, first matching rule wins. External advisors
/// without a senior internal title are bucketed as CONTENT_ENGINEERING;
/// every later rule assumes the headline describes an internal role.
pub fn infer_department(headline: &str) -> Department {
    let h = headline.to_lowercase();

    type Rule = (fn(&str) -> bool, Department);
    const RULES: &[Rule] = &[
        (
            |h| {
                contains_any(h, ADVISOR_KEYWORDS) && !contains_any(h, SENIOR_TITLE_KEYWORDS)
            },
            Department::ContentEngineering,
        ),
        (
            |h| {
                C_SUITE_RE.is_match(h)
                    || contains_any(
                        h,
                        &[
                            "chief executive", "chief technology", "chief operating",
                            "chief financial", "founder", "co-founder", "board member",
                            "board of",
                        ],
                    )
            },
            Department::Leadership,
        ),
        (
            |h| contains_any(h, &["talent", "recruit", "people ops", "human resources", "hr "]),
            Department::People,
        ),
        (
            |h| contains_any(h, &["partnership", "alliances", "channel partner"]),
            Department::Partnerships,
        ),
        (
            |h| contains_any(h, &["data", "analytics", "business intelligence", " bi "]),
            Department::Data,
        ),
        (
            |h| {
                contains_any(
                    h,
                    &["operations", "ops ", "finance", "chief of staff", "strategy"],
                )
            },
            Department::Operations,
        ),
        // Before the marketing rule: "creative" would otherwise never be reached.
        (|h| h.contains("creative director"), Department::Design),
        (
            |h| {
                contains_any(
                    h,
                    &["market", "growth", "content", "seo", "brand", "gtm", "social media"],
                )
            },
            Department::Marketing,
        ),
        (
            |h| {
                contains_any(h, &["engineer", "software", "developer", "devops", "sre"])
                    || contains_any(
                        h,
                        &["software architect", "solutions architect", "systems architect"],
                    )
            },
            Department::Engineering,
        ),
        (
            |h| contains_any(h, &["sales", "account exec", "business develop", "sdr", "bdr"]),
            Department::Sales,
        ),
        (|h| h.contains("product"), Department::Product),
        (
            |h| contains_any(h, &["design", "ux", "ui ", "illustrat"]),
            Department::Design,
        ),
    ];

    for (matches, department) in RULES {
        if matches(&h) {
            return *department;
        }
    }
    Department::Other
}

/// Advisor keywords mark the profile ADVISOR unless a senior internal
/// title co-occurs with the company name in the same headline segment —
/// a "Fractional VP Marketing at Acme" is effectively staff.
pub fn infer_role(headline: &str, company_name: &str) -> EmployeeRole {
    let h = headline.to_lowercase();
    if !contains_any(&h, ADVISOR_KEYWORDS) {
        return EmployeeRole::Employee;
    }

    let company = company_name.to_lowercase();
    if !company.is_empty() {
        for segment in h.split(['|', ',', ';', '•']) {
            if segment.contains(&company) && contains_any(segment, SENIOR_TITLE_KEYWORDS) {
                return EmployeeRole::Employee;
            }
        }
    }

    EmployeeRole::Advisor
}

const MONTH_NAMES: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn parse_month(value: Option<&JsonValue>) -> u32 {
    match value {
        Some(JsonValue::Number(n)) => match n.as_u64() {
            Some(m @ 1..=12) => m as u32,
            _ => 1,
        },
        Some(JsonValue::String(s)) => {
            let lower = s.to_lowercase();
            if let Ok(m @ 1..=12) = lower.trim().parse::<u32>() {
                return m;
            }
            MONTH_NAMES
                .iter()
                .position(|name| lower.starts_with(name))
                .map(|i| i as u32 + 1)
                // Only the year is usually reliable.
                .unwrap_or(1)
        }
        _ => 1,
    }
}

fn parse_year(value: Option<&JsonValue>) -> Option<i32> {
    match value {
        Some(JsonValue::Number(n)) => n.as_i64().map(|y| y as i32),
        Some(JsonValue::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn entry_start_date(entry: &JsonValue) -> Option<NaiveDate> {
    let start = entry.get("startDate").or_else(|| entry.get("start"))?;
    let year = parse_year(start.get("year"))?;
    let month = parse_month(start.get("month"));
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn entry_is_current(entry: &JsonValue) -> bool {
    json_str(entry, &["endDate", "end", "dateRange", "caption"])
        .map(|text| text.to_lowercase().contains("present"))
        .unwrap_or(false)
}

/// Scan a work-history list for the entry at the tracked company (its
/// company URL contains the company slug); fall back to the entry still
/// marked "Present". No confident match means no date, never a guess.
pub fn extract_company_start_date(
    experience: &JsonValue,
    company_url: &str,
) -> Option<NaiveDate> {
    let entries = experience.as_array()?;
    let slug = company_slug(company_url)?;

    for entry in entries {
        let entry_url = json_str(
            entry,
            &["companyUrl", "companyLinkedinUrl", "companyLink", "url"],
        )
        .unwrap_or("")
        .to_lowercase();
        if entry_url.contains(&slug) {
            return entry_start_date(entry);
        }
    }

    entries
        .iter()
        .find(|entry| entry_is_current(entry))
        .and_then(entry_start_date)
}

/// Map one raw vendor profile record to canonical fields. Rejects only
/// records with no profile URL at all.
pub fn normalize_profile(raw: &JsonValue) -> Option<NormalizedProfile> {
    let linkedin_url = json_str(raw, &["url", "linkedinUrl"])?;
    let linkedin_url = normalize_linkedin_url(linkedin_url);

    let full_name = json_str(raw, &["fullName", "name"]).unwrap_or("").to_string();
    let (first_name, last_name) = match (
        json_str(raw, &["firstName"]),
        json_str(raw, &["lastName"]),
    ) {
        (Some(first), Some(last)) => (first.to_string(), last.to_string()),
        _ => split_full_name(&full_name),
    };
    let full_name = if full_name.is_empty() {
        format!("{first_name} {last_name}").trim().to_string()
    } else {
        full_name
    };

    let headline = sanitize_text(json_str(raw, &["headline"]).unwrap_or(""));
    let job_title = json_str(raw, &["jobTitle", "title"])
        .map(sanitize_text)
        .or_else(|| {
            headline
                .split(" at ")
                .next()
                .filter(|t| !t.is_empty())
                .map(ToString::to_string)
        })
        .unwrap_or_default();

    Some(NormalizedProfile {
        linkedin_url,
        first_name,
        last_name,
        full_name,
        department: infer_department(&headline),
        about: sanitize_text(json_str(raw, &["about", "summary"]).unwrap_or("")),
        headline,
        job_title,
        avatar_url: avatar_url(raw),
        experience: raw.get("experience").filter(|v| !v.is_null()).cloned(),
        education: raw.get("education").filter(|v| !v.is_null()).cloned(),
        skills: raw.get("skills").filter(|v| !v.is_null()).cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COMPANY_URL: &str = "https://www.linkedin.com/company/acme-corp";

    #[test]
    fn department_rule_table() {
        for (headline, expected) in [
            ("Startup Advisor & Angel", Department::ContentEngineering),
            ("Fractional CMO for B2B startups", Department::ContentEngineering),
            ("Co-Founder & CEO at Acme", Department::Leadership),
            ("Head of Talent Acquisition", Department::People),
            ("Director of Partnerships", Department::Partnerships),
            ("Senior Data Analyst", Department::Data),
            ("Chief of Staff", Department::Operations),
            ("Creative Director", Department::Design),
            ("Growth Marketing Manager", Department::Marketing),
            ("Senior Software Engineer", Department::Engineering),
            ("Account Executive, EMEA", Department::Sales),
            ("Product Manager", Department::Product),
            ("UX Researcher", Department::Design),
            ("Professional Dog Walker", Department::Other),
        ] {
            assert_eq!(infer_department(headline), expected, "headline: {headline}");
        }
    }

    #[test]
    fn csuite_acronyms_match_whole_words_only() {
        assert_eq!(infer_department("CTO"), Department::Leadership);
        assert_eq!(infer_department("CEO @ Acme"), Department::Leadership);
        // "director" contains "cto" and "coordinator" contains "coo";
        // neither headline is leadership.
        assert_eq!(
            infer_department("Director of Partnerships"),
            Department::Partnerships
        );
        assert_eq!(
            infer_department("Partnerships Coordinator"),
            Department::Partnerships
        );
        assert_eq!(infer_department("Chief Operating Officer"), Department::Leadership);
    }

    #[test]
    fn content_engineering_titles_classify_as_marketing() {
        assert_eq!(
            infer_department("Head of Content Engineering at Acme"),
            Department::Marketing
        );
        assert_eq!(infer_department("GTM Engineer"), Department::Marketing);
    }

    #[test]
    fn advisor_with_senior_title_is_not_the_advisor_bucket() {
        // The senior title suppresses the advisor rule, so the headline
        // falls through to the marketing rule.
        assert_eq!(
            infer_department("Fractional VP of Marketing at Acme"),
            Department::Marketing
        );
    }

    #[test]
    fn role_inference() {
        assert_eq!(
            infer_role("Senior Software Engineer at Acme", "Acme"),
            EmployeeRole::Employee
        );
        assert_eq!(
            infer_role("Startup Advisor | ex-Google", "Acme"),
            EmployeeRole::Advisor
        );
        // Senior title tied to the company in the same segment wins.
        assert_eq!(
            infer_role("Fractional VP Marketing at Acme | Advisor to startups", "Acme"),
            EmployeeRole::Employee
        );
        // Senior title in a *different* segment does not rescue the label.
        assert_eq!(
            infer_role("Advisor at Acme | Director at Globex", "Acme"),
            EmployeeRole::Advisor
        );
    }

    #[test]
    fn profile_with_no_url_is_rejected() {
        assert!(normalize_profile(&json!({"fullName": "Jane Doe"})).is_none());
    }

    #[test]
    fn name_parts_are_split_from_full_name_when_absent() {
        let raw = json!({
            "url": "https://www.linkedin.com/in/jane-doe/",
            "name": "Jane van der Doe",
        });
        let profile = normalize_profile(&raw).unwrap();
        assert_eq!(profile.first_name, "Jane");
        assert_eq!(profile.last_name, "van der Doe");
        assert_eq!(profile.linkedin_url, "https://www.linkedin.com/in/jane-doe");
    }

    #[test]
    fn job_title_falls_back_to_headline_before_at() {
        let raw = json!({
            "url": "https://www.linkedin.com/in/jane-doe",
            "headline": "Staff Engineer at Acme Corp",
        });
        let profile = normalize_profile(&raw).unwrap();
        assert_eq!(profile.job_title, "Staff Engineer");
        assert_eq!(profile.department, Department::Engineering);
    }

    #[test]
    fn avatar_accepts_string_or_object_shape() {
        let string_shape = json!({
            "url": "https://www.linkedin.com/in/a",
            "profilePicture": "https://cdn/a.jpg",
        });
        assert_eq!(
            normalize_profile(&string_shape).unwrap().avatar_url,
            "https://cdn/a.jpg"
        );

        let object_shape = json!({
            "url": "https://www.linkedin.com/in/b",
            "profilePicture": {"url": "https://cdn/b.jpg", "sizes": [200, 400]},
        });
        assert_eq!(
            normalize_profile(&object_shape).unwrap().avatar_url,
            "https://cdn/b.jpg"
        );
    }

    #[test]
    fn start_date_prefers_the_slug_matched_entry() {
        let experience = json!([
            {
                "companyUrl": "https://www.linkedin.com/company/globex",
                "startDate": {"month": 3, "year": 2018},
            },
            {
                "companyUrl": "https://www.linkedin.com/company/acme-corp",
                "startDate": {"month": "September", "year": 2021},
            },
        ]);
        assert_eq!(
            extract_company_start_date(&experience, COMPANY_URL),
            NaiveDate::from_ymd_opt(2021, 9, 1)
        );
    }

    #[test]
    fn start_date_falls_back_to_the_present_entry() {
        let experience = json!([
            {
                "companyUrl": "https://www.linkedin.com/company/globex",
                "endDate": "2020-01-01",
                "startDate": {"year": 2018},
            },
            {
                "dateRange": "Jan 2022 - Present",
                "startDate": {"month": "Jan", "year": 2022},
            },
        ]);
        assert_eq!(
            extract_company_start_date(&experience, COMPANY_URL),
            NaiveDate::from_ymd_opt(2022, 1, 1)
        );
    }

    #[test]
    fn unparseable_month_defaults_to_january_but_year_is_required() {
        let experience = json!([{
            "companyUrl": "https://www.linkedin.com/company/acme-corp",
            "startDate": {"month": "Q3", "year": "2020"},
        }]);
        assert_eq!(
            extract_company_start_date(&experience, COMPANY_URL),
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );

        let no_year = json!([{
            "companyUrl": "https://www.linkedin.com/company/acme-corp",
            "startDate": {"month": 5},
        }]);
        assert_eq!(extract_company_start_date(&no_year, COMPANY_URL), None);
    }
}
