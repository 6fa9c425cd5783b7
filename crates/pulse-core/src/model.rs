//! Canonical persisted entities and their closed enums.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("unrecognized {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(Department, "department", {
    Engineering => "ENGINEERING",
    Marketing => "MARKETING",
    Sales => "SALES",
    Product => "PRODUCT",
    Design => "DESIGN",
    Leadership => "LEADERSHIP",
    People => "PEOPLE",
    Partnerships => "PARTNERSHIPS",
    Data => "DATA",
    Operations => "OPERATIONS",
    ContentEngineering => "CONTENT_ENGINEERING",
    Other => "OTHER",
});

string_enum!(EmployeeRole, "role", {
    Employee => "EMPLOYEE",
    Advisor => "ADVISOR",
});

string_enum!(PostType, "post type", {
    Original => "ORIGINAL",
    Reshare => "RESHARE",
    Article => "ARTICLE",
    Poll => "POLL",
});

string_enum!(ScrapeStatus, "scrape status", {
    Pending => "PENDING",
    Running => "RUNNING",
    Completed => "COMPLETED",
    Failed => "FAILED",
    Partial => "PARTIAL",
});

string_enum!(ScrapeType, "scrape type", {
    EmployeeDiscovery => "EMPLOYEE_DISCOVERY",
    ProfileScrape => "PROFILE_SCRAPE",
    PostScrape => "POST_SCRAPE",
    MentionSearch => "MENTION_SEARCH",
});

/// A tracked profile. Never hard-deleted: deactivation preserves post history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub headline: String,
    pub about: String,
    pub job_title: String,
    pub department: Department,
    pub role: EmployeeRole,
    /// Unique natural key.
    pub linkedin_url: String,
    pub avatar_url: String,
    pub company_start_date: Option<NaiveDate>,
    pub is_active: bool,
    /// Manual classification is authoritative; re-scrapes must not
    /// overwrite role or department when set.
    pub is_manually_added: bool,
    pub experience: Option<JsonValue>,
    pub education: Option<JsonValue>,
    pub skills: Option<JsonValue>,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Bare-bones record created by discovery, pending profile enrichment.
    pub fn stub(linkedin_url: &str, slug: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: slug.to_string(),
            last_name: String::new(),
            full_name: slug.to_string(),
            headline: String::new(),
            about: String::new(),
            job_title: String::new(),
            department: Department::Other,
            role: EmployeeRole::Employee,
            linkedin_url: linkedin_url.to_string(),
            avatar_url: String::new(),
            company_start_date: None,
            is_active: true,
            is_manually_added: false,
            experience: None,
            education: None,
            skills: None,
            last_scraped_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Canonical post keyed by the vendor-stable `linkedin_post_id`.
/// Reposts are filtered at normalization and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub linkedin_post_id: String,
    /// None means the author is external / unattributed.
    pub author_id: Option<Uuid>,
    pub post_type: PostType,
    pub text_content: String,
    pub published_at: DateTime<Utc>,
    pub linkedin_url: String,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    /// Always `likes + 2*comments + 3*shares`; never stored inconsistently
    /// with its inputs.
    pub engagement_score: i64,
    pub mentions_company: bool,
    pub is_external: bool,
    pub external_author_name: Option<String>,
    pub external_author_url: Option<String>,
    pub external_author_avatar_url: Option<String>,
    pub external_author_headline: Option<String>,
    pub media_urls: Option<Vec<String>>,
    pub hashtags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only history row written when a stored post's counts change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub id: Uuid,
    pub post_id: Uuid,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub score: i64,
    pub captured_at: DateTime<Utc>,
}

/// Derived 1:1 projection of posts flagged `mentions_company`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyMention {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Option<Uuid>,
    pub published_at: DateTime<Utc>,
}

/// Per-(employee, calendar day) post count. Heatmap input and the streak
/// calculator's direct input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingActivity {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub post_count: i64,
}

/// Audit/status record for one orchestration step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRun {
    pub id: Uuid,
    pub run_type: ScrapeType,
    pub status: ScrapeStatus,
    pub items_processed: i64,
    pub items_created: i64,
    pub items_updated: i64,
    pub cost_usd: f64,
    pub errors: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScrapeRun {
    pub fn begin(run_type: ScrapeType) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_type,
            status: ScrapeStatus::Running,
            items_processed: 0,
            items_created: 0,
            items_updated: 0,
            cost_usd: 0.0,
            errors: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Counters recorded onto a run when it is finalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub items_processed: i64,
    pub items_created: i64,
    pub items_updated: i64,
    pub cost_usd: f64,
    pub errors: Option<String>,
}

impl RunStats {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            errors: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Singleton configuration row: the tracked company plus scoring tunables.
/// The mention bonus multiplier is applied by leaderboard consumers, not by
/// the stored engagement score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub company_linkedin_url: String,
    pub company_name: String,
    pub mention_bonus_multiplier: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            company_linkedin_url: String::new(),
            company_name: String::new(),
            mention_bonus_multiplier: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_strings() {
        assert_eq!(
            "CONTENT_ENGINEERING".parse::<Department>().unwrap(),
            Department::ContentEngineering
        );
        assert_eq!(Department::ContentEngineering.as_str(), "CONTENT_ENGINEERING");
        assert_eq!("RUNNING".parse::<ScrapeStatus>().unwrap(), ScrapeStatus::Running);
        assert!("SOMETHING_ELSE".parse::<ScrapeStatus>().is_err());
    }

    #[test]
    fn stub_employee_uses_slug_for_names() {
        let stub = Employee::stub("https://www.linkedin.com/in/jane-doe", "jane-doe");
        assert_eq!(stub.full_name, "jane-doe");
        assert_eq!(stub.first_name, "jane-doe");
        assert!(stub.last_name.is_empty());
        assert!(stub.is_active);
        assert!(!stub.is_manually_added);
    }
}
