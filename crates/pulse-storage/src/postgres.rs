//! Postgres-backed [`Store`].
//!
//! Queries are runtime-bound (`sqlx::query` + `bind`), with enums stored
//! as their canonical TEXT values and list/history fields as JSONB.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{
    AppConfig, CompanyMention, Employee, EngagementSnapshot, ParseEnumError, Post,
    PostingActivity, RunStats, ScrapeRun, ScrapeStatus,
};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::{Result, Store, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS app_config (
    id SMALLINT PRIMARY KEY DEFAULT 1 CHECK (id = 1),
    company_linkedin_url TEXT NOT NULL DEFAULT '',
    company_name TEXT NOT NULL DEFAULT '',
    mention_bonus_multiplier DOUBLE PRECISION NOT NULL DEFAULT 1.0
);

CREATE TABLE IF NOT EXISTS employees (
    id UUID PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    full_name TEXT NOT NULL,
    headline TEXT NOT NULL DEFAULT '',
    about TEXT NOT NULL DEFAULT '',
    job_title TEXT NOT NULL DEFAULT '',
    department TEXT NOT NULL,
    role TEXT NOT NULL,
    linkedin_url TEXT NOT NULL UNIQUE,
    avatar_url TEXT NOT NULL DEFAULT '',
    company_start_date DATE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    is_manually_added BOOLEAN NOT NULL DEFAULT FALSE,
    experience JSONB,
    education JSONB,
    skills JSONB,
    last_scraped_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    id UUID PRIMARY KEY,
    linkedin_post_id TEXT NOT NULL UNIQUE,
    author_id UUID REFERENCES employees(id),
    post_type TEXT NOT NULL,
    text_content TEXT NOT NULL DEFAULT '',
    published_at TIMESTAMPTZ NOT NULL,
    linkedin_url TEXT NOT NULL,
    likes BIGINT NOT NULL DEFAULT 0,
    comments BIGINT NOT NULL DEFAULT 0,
    shares BIGINT NOT NULL DEFAULT 0,
    engagement_score BIGINT NOT NULL DEFAULT 0,
    mentions_company BOOLEAN NOT NULL DEFAULT FALSE,
    is_external BOOLEAN NOT NULL DEFAULT FALSE,
    external_author_name TEXT,
    external_author_url TEXT,
    external_author_avatar_url TEXT,
    external_author_headline TEXT,
    media_urls JSONB,
    hashtags JSONB,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_author_id ON posts (author_id);
CREATE INDEX IF NOT EXISTS idx_posts_updated_at ON posts (updated_at);

CREATE TABLE IF NOT EXISTS engagement_snapshots (
    id UUID PRIMARY KEY,
    post_id UUID NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    likes BIGINT NOT NULL,
    comments BIGINT NOT NULL,
    shares BIGINT NOT NULL,
    score BIGINT NOT NULL,
    captured_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_post_id ON engagement_snapshots (post_id);

CREATE TABLE IF NOT EXISTS company_mentions (
    id UUID PRIMARY KEY,
    post_id UUID NOT NULL UNIQUE REFERENCES posts(id) ON DELETE CASCADE,
    author_id UUID,
    published_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS posting_activities (
    employee_id UUID NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
    date DATE NOT NULL,
    post_count BIGINT NOT NULL,
    PRIMARY KEY (employee_id, date)
);

CREATE TABLE IF NOT EXISTS scrape_runs (
    id UUID PRIMARY KEY,
    run_type TEXT NOT NULL,
    status TEXT NOT NULL,
    items_processed BIGINT NOT NULL DEFAULT 0,
    items_created BIGINT NOT NULL DEFAULT 0,
    items_updated BIGINT NOT NULL DEFAULT 0,
    cost_usd DOUBLE PRECISION NOT NULL DEFAULT 0,
    errors TEXT,
    started_at TIMESTAMPTZ NOT NULL,
    completed_at TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_scrape_runs_status_started
    ON scrape_runs (status, started_at);
"#;

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, full_name, headline, about, \
     job_title, department, role, linkedin_url, avatar_url, company_start_date, is_active, \
     is_manually_added, experience, education, skills, last_scraped_at, created_at, updated_at";

const POST_COLUMNS: &str = "id, linkedin_post_id, author_id, post_type, text_content, \
     published_at, linkedin_url, likes, comments, shares, engagement_score, mentions_company, \
     is_external, external_author_name, external_author_url, external_author_avatar_url, \
     external_author_headline, media_urls, hashtags, created_at, updated_at";

fn parse_enum<T>(raw: &str) -> Result<T>
where
    T: std::str::FromStr<Err = ParseEnumError>,
{
    raw.parse().map_err(|e: ParseEnumError| StoreError::Decode(e.to_string()))
}

fn string_list(value: Option<JsonValue>) -> Result<Option<Vec<String>>> {
    value
        .map(|v| serde_json::from_value(v).map_err(|e| StoreError::Decode(e.to_string())))
        .transpose()
}

fn string_list_json(list: &Option<Vec<String>>) -> Option<JsonValue> {
    list.as_ref().map(|l| JsonValue::from(l.clone()))
}

fn employee_from_row(row: &PgRow) -> Result<Employee> {
    Ok(Employee {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        full_name: row.try_get("full_name")?,
        headline: row.try_get("headline")?,
        about: row.try_get("about")?,
        job_title: row.try_get("job_title")?,
        department: parse_enum(row.try_get::<String, _>("department")?.as_str())?,
        role: parse_enum(row.try_get::<String, _>("role")?.as_str())?,
        linkedin_url: row.try_get("linkedin_url")?,
        avatar_url: row.try_get("avatar_url")?,
        company_start_date: row.try_get("company_start_date")?,
        is_active: row.try_get("is_active")?,
        is_manually_added: row.try_get("is_manually_added")?,
        experience: row.try_get("experience")?,
        education: row.try_get("education")?,
        skills: row.try_get("skills")?,
        last_scraped_at: row.try_get("last_scraped_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn post_from_row(row: &PgRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        linkedin_post_id: row.try_get("linkedin_post_id")?,
        author_id: row.try_get("author_id")?,
        post_type: parse_enum(row.try_get::<String, _>("post_type")?.as_str())?,
        text_content: row.try_get("text_content")?,
        published_at: row.try_get("published_at")?,
        linkedin_url: row.try_get("linkedin_url")?,
        likes: row.try_get("likes")?,
        comments: row.try_get("comments")?,
        shares: row.try_get("shares")?,
        engagement_score: row.try_get("engagement_score")?,
        mentions_company: row.try_get("mentions_company")?,
        is_external: row.try_get("is_external")?,
        external_author_name: row.try_get("external_author_name")?,
        external_author_url: row.try_get("external_author_url")?,
        external_author_avatar_url: row.try_get("external_author_avatar_url")?,
        external_author_headline: row.try_get("external_author_headline")?,
        media_urls: string_list(row.try_get("media_urls")?)?,
        hashtags: string_list(row.try_get("hashtags")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn run_from_row(row: &PgRow) -> Result<ScrapeRun> {
    Ok(ScrapeRun {
        id: row.try_get("id")?,
        run_type: parse_enum(row.try_get::<String, _>("run_type")?.as_str())?,
        status: parse_enum(row.try_get::<String, _>("status")?.as_str())?,
        items_processed: row.try_get("items_processed")?,
        items_created: row.try_get("items_created")?,
        items_updated: row.try_get("items_updated")?,
        cost_usd: row.try_get("cost_usd")?,
        errors: row.try_get("errors")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create any missing tables and indexes. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("database schema up to date");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn app_config(&self) -> Result<AppConfig> {
        let row = sqlx::query(
            "SELECT company_linkedin_url, company_name, mention_bonus_multiplier \
             FROM app_config LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(AppConfig {
                company_linkedin_url: row.try_get("company_linkedin_url")?,
                company_name: row.try_get("company_name")?,
                mention_bonus_multiplier: row.try_get("mention_bonus_multiplier")?,
            }),
            None => Ok(AppConfig::default()),
        }
    }

    async fn employee_by_url(&self, linkedin_url: &str) -> Result<Option<Employee>> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE linkedin_url = $1"
        ))
        .bind(linkedin_url)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(employee_from_row).transpose()
    }

    async fn list_employees(&self, only_active: bool) -> Result<Vec<Employee>> {
        let rows = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees \
             WHERE ($1 = FALSE OR is_active) ORDER BY full_name"
        ))
        .bind(only_active)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(employee_from_row).collect()
    }

    async fn insert_employee(&self, employee: &Employee) -> Result<()> {
        sqlx::query(
            "INSERT INTO employees (id, first_name, last_name, full_name, headline, about, \
             job_title, department, role, linkedin_url, avatar_url, company_start_date, \
             is_active, is_manually_added, experience, education, skills, last_scraped_at, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20)",
        )
        .bind(employee.id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.full_name)
        .bind(&employee.headline)
        .bind(&employee.about)
        .bind(&employee.job_title)
        .bind(employee.department.as_str())
        .bind(employee.role.as_str())
        .bind(&employee.linkedin_url)
        .bind(&employee.avatar_url)
        .bind(employee.company_start_date)
        .bind(employee.is_active)
        .bind(employee.is_manually_added)
        .bind(&employee.experience)
        .bind(&employee.education)
        .bind(&employee.skills)
        .bind(employee.last_scraped_at)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_employee(&self, employee: &Employee) -> Result<()> {
        sqlx::query(
            "UPDATE employees SET first_name = $2, last_name = $3, full_name = $4, \
             headline = $5, about = $6, job_title = $7, department = $8, role = $9, \
             linkedin_url = $10, avatar_url = $11, company_start_date = $12, is_active = $13, \
             is_manually_added = $14, experience = $15, education = $16, skills = $17, \
             last_scraped_at = $18, updated_at = $19 \
             WHERE id = $1",
        )
        .bind(employee.id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.full_name)
        .bind(&employee.headline)
        .bind(&employee.about)
        .bind(&employee.job_title)
        .bind(employee.department.as_str())
        .bind(employee.role.as_str())
        .bind(&employee.linkedin_url)
        .bind(&employee.avatar_url)
        .bind(employee.company_start_date)
        .bind(employee.is_active)
        .bind(employee.is_manually_added)
        .bind(&employee.experience)
        .bind(&employee.education)
        .bind(&employee.skills)
        .bind(employee.last_scraped_at)
        .bind(employee.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn post_by_linkedin_id(&self, linkedin_post_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE linkedin_post_id = $1"
        ))
        .bind(linkedin_post_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(post_from_row).transpose()
    }

    async fn insert_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            "INSERT INTO posts (id, linkedin_post_id, author_id, post_type, text_content, \
             published_at, linkedin_url, likes, comments, shares, engagement_score, \
             mentions_company, is_external, external_author_name, external_author_url, \
             external_author_avatar_url, external_author_headline, media_urls, hashtags, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21)",
        )
        .bind(post.id)
        .bind(&post.linkedin_post_id)
        .bind(post.author_id)
        .bind(post.post_type.as_str())
        .bind(&post.text_content)
        .bind(post.published_at)
        .bind(&post.linkedin_url)
        .bind(post.likes)
        .bind(post.comments)
        .bind(post.shares)
        .bind(post.engagement_score)
        .bind(post.mentions_company)
        .bind(post.is_external)
        .bind(&post.external_author_name)
        .bind(&post.external_author_url)
        .bind(&post.external_author_avatar_url)
        .bind(&post.external_author_headline)
        .bind(string_list_json(&post.media_urls))
        .bind(string_list_json(&post.hashtags))
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            "UPDATE posts SET author_id = $2, post_type = $3, text_content = $4, \
             published_at = $5, linkedin_url = $6, likes = $7, comments = $8, shares = $9, \
             engagement_score = $10, mentions_company = $11, is_external = $12, \
             external_author_name = $13, external_author_url = $14, \
             external_author_avatar_url = $15, external_author_headline = $16, \
             media_urls = $17, hashtags = $18, updated_at = $19 \
             WHERE id = $1",
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(post.post_type.as_str())
        .bind(&post.text_content)
        .bind(post.published_at)
        .bind(&post.linkedin_url)
        .bind(post.likes)
        .bind(post.comments)
        .bind(post.shares)
        .bind(post.engagement_score)
        .bind(post.mentions_company)
        .bind(post.is_external)
        .bind(&post.external_author_name)
        .bind(&post.external_author_url)
        .bind(&post.external_author_avatar_url)
        .bind(&post.external_author_headline)
        .bind(string_list_json(&post.media_urls))
        .bind(string_list_json(&post.hashtags))
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_post_mentions_company(&self, post_id: Uuid, mentions: bool) -> Result<()> {
        sqlx::query("UPDATE posts SET mentions_company = $2, updated_at = NOW() WHERE id = $1")
            .bind(post_id)
            .bind(mentions)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn posts_flagged_mentioning(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE mentions_company"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(post_from_row).collect()
    }

    async fn employee_posts_not_mentioning(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE author_id IS NOT NULL AND NOT mentions_company"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(post_from_row).collect()
    }

    async fn author_ids_with_posts_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT DISTINCT author_id FROM posts \
             WHERE author_id IS NOT NULL AND updated_at >= $1",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row.try_get("author_id").map_err(StoreError::from))
            .collect()
    }

    async fn posts_by_authors(&self, author_ids: &[Uuid]) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ANY($1)"
        ))
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(post_from_row).collect()
    }

    async fn insert_engagement_snapshot(&self, snapshot: &EngagementSnapshot) -> Result<()> {
        sqlx::query(
            "INSERT INTO engagement_snapshots (id, post_id, likes, comments, shares, score, \
             captured_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(snapshot.id)
        .bind(snapshot.post_id)
        .bind(snapshot.likes)
        .bind(snapshot.comments)
        .bind(snapshot.shares)
        .bind(snapshot.score)
        .bind(snapshot.captured_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn snapshots_for_post(&self, post_id: Uuid) -> Result<Vec<EngagementSnapshot>> {
        let rows = sqlx::query(
            "SELECT id, post_id, likes, comments, shares, score, captured_at \
             FROM engagement_snapshots WHERE post_id = $1 ORDER BY captured_at",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(EngagementSnapshot {
                    id: row.try_get("id")?,
                    post_id: row.try_get("post_id")?,
                    likes: row.try_get("likes")?,
                    comments: row.try_get("comments")?,
                    shares: row.try_get("shares")?,
                    score: row.try_get("score")?,
                    captured_at: row.try_get("captured_at")?,
                })
            })
            .collect()
    }

    async fn upsert_company_mention(&self, mention: &CompanyMention) -> Result<()> {
        sqlx::query(
            "INSERT INTO company_mentions (id, post_id, author_id, published_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (post_id) DO UPDATE SET author_id = EXCLUDED.author_id, \
             published_at = EXCLUDED.published_at",
        )
        .bind(mention.id)
        .bind(mention.post_id)
        .bind(mention.author_id)
        .bind(mention.published_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_company_mentions_not_in(&self, post_ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM company_mentions WHERE post_id <> ALL($1)")
            .bind(post_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn company_mentions(&self) -> Result<Vec<CompanyMention>> {
        let rows = sqlx::query(
            "SELECT id, post_id, author_id, published_at FROM company_mentions \
             ORDER BY published_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(CompanyMention {
                    id: row.try_get("id")?,
                    post_id: row.try_get("post_id")?,
                    author_id: row.try_get("author_id")?,
                    published_at: row.try_get("published_at")?,
                })
            })
            .collect()
    }

    async fn upsert_posting_activity(&self, activity: &PostingActivity) -> Result<()> {
        sqlx::query(
            "INSERT INTO posting_activities (employee_id, date, post_count) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (employee_id, date) DO UPDATE SET post_count = EXCLUDED.post_count",
        )
        .bind(activity.employee_id)
        .bind(activity.date)
        .bind(activity.post_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn posting_activity_for_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<PostingActivity>> {
        let rows = sqlx::query(
            "SELECT employee_id, date, post_count FROM posting_activities \
             WHERE employee_id = $1 ORDER BY date",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(PostingActivity {
                    employee_id: row.try_get("employee_id")?,
                    date: row.try_get("date")?,
                    post_count: row.try_get("post_count")?,
                })
            })
            .collect()
    }

    async fn create_scrape_run(&self, run: &ScrapeRun) -> Result<()> {
        sqlx::query(
            "INSERT INTO scrape_runs (id, run_type, status, items_processed, items_created, \
             items_updated, cost_usd, errors, started_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(run.id)
        .bind(run.run_type.as_str())
        .bind(run.status.as_str())
        .bind(run.items_processed)
        .bind(run.items_created)
        .bind(run.items_updated)
        .bind(run.cost_usd)
        .bind(&run.errors)
        .bind(run.started_at)
        .bind(run.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize_scrape_run(
        &self,
        run_id: Uuid,
        status: ScrapeStatus,
        stats: &RunStats,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_runs SET status = $2, items_processed = $3, items_created = $4, \
             items_updated = $5, cost_usd = $6, errors = $7, completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(run_id)
        .bind(status.as_str())
        .bind(stats.items_processed)
        .bind(stats.items_created)
        .bind(stats.items_updated)
        .bind(stats.cost_usd)
        .bind(&stats.errors)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn running_runs_started_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ScrapeRun>> {
        let rows = sqlx::query(
            "SELECT id, run_type, status, items_processed, items_created, items_updated, \
             cost_usd, errors, started_at, completed_at FROM scrape_runs \
             WHERE status = 'RUNNING' AND started_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(run_from_row).collect()
    }

    async fn recent_scrape_runs(&self, limit: i64) -> Result<Vec<ScrapeRun>> {
        let rows = sqlx::query(
            "SELECT id, run_type, status, items_processed, items_created, items_updated, \
             cost_usd, errors, started_at, completed_at FROM scrape_runs \
             ORDER BY started_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(run_from_row).collect()
    }
}
