//! Persistence boundary for the engagement pipeline.
//!
//! The orchestrator talks to [`Store`] only; [`PgStore`] is the Postgres
//! implementation and [`MemStore`] backs tests. Every write is an
//! independent idempotent upsert — steps are not transactional, and
//! re-running a step after a partial failure is safe.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{
    AppConfig, CompanyMention, Employee, EngagementSnapshot, Post, PostingActivity, RunStats,
    ScrapeRun, ScrapeStatus,
};
use thiserror::Error;
use uuid::Uuid;

mod postgres;

pub use postgres::PgStore;

pub const CRATE_NAME: &str = "pulse-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The pipeline's persistence operations.
#[async_trait]
pub trait Store: Send + Sync {
    async fn app_config(&self) -> Result<AppConfig>;

    async fn employee_by_url(&self, linkedin_url: &str) -> Result<Option<Employee>>;
    async fn list_employees(&self, only_active: bool) -> Result<Vec<Employee>>;
    async fn insert_employee(&self, employee: &Employee) -> Result<()>;
    async fn update_employee(&self, employee: &Employee) -> Result<()>;

    async fn post_by_linkedin_id(&self, linkedin_post_id: &str) -> Result<Option<Post>>;
    async fn insert_post(&self, post: &Post) -> Result<()>;
    async fn update_post(&self, post: &Post) -> Result<()>;
    async fn set_post_mentions_company(&self, post_id: Uuid, mentions: bool) -> Result<()>;
    /// Posts currently flagged as mentioning the company.
    async fn posts_flagged_mentioning(&self) -> Result<Vec<Post>>;
    /// Attributed employee posts whose mention flag is still false —
    /// the repair pass's candidates.
    async fn employee_posts_not_mentioning(&self) -> Result<Vec<Post>>;
    async fn author_ids_with_posts_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Uuid>>;
    async fn posts_by_authors(&self, author_ids: &[Uuid]) -> Result<Vec<Post>>;

    async fn insert_engagement_snapshot(&self, snapshot: &EngagementSnapshot) -> Result<()>;
    async fn snapshots_for_post(&self, post_id: Uuid) -> Result<Vec<EngagementSnapshot>>;

    async fn upsert_company_mention(&self, mention: &CompanyMention) -> Result<()>;
    /// Remove mention rows whose post is no longer in the flagged set.
    async fn delete_company_mentions_not_in(&self, post_ids: &[Uuid]) -> Result<u64>;
    async fn company_mentions(&self) -> Result<Vec<CompanyMention>>;

    async fn upsert_posting_activity(&self, activity: &PostingActivity) -> Result<()>;
    async fn posting_activity_for_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<PostingActivity>>;

    async fn create_scrape_run(&self, run: &ScrapeRun) -> Result<()>;
    async fn finalize_scrape_run(
        &self,
        run_id: Uuid,
        status: ScrapeStatus,
        stats: &RunStats,
    ) -> Result<()>;
    async fn running_runs_started_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ScrapeRun>>;
    async fn recent_scrape_runs(&self, limit: i64) -> Result<Vec<ScrapeRun>>;
}

#[derive(Default)]
struct MemInner {
    config: AppConfig,
    employees: HashMap<Uuid, Employee>,
    posts: HashMap<Uuid, Post>,
    snapshots: Vec<EngagementSnapshot>,
    mentions: HashMap<Uuid, CompanyMention>,
    activities: HashMap<(Uuid, chrono::NaiveDate), PostingActivity>,
    runs: HashMap<Uuid, ScrapeRun>,
}

/// In-memory [`Store`] with the same upsert semantics as Postgres.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<MemInner>,
}

impl MemStore {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Mutex::new(MemInner {
                config,
                ..MemInner::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Store for MemStore {
    async fn app_config(&self) -> Result<AppConfig> {
        Ok(self.lock().config.clone())
    }

    async fn employee_by_url(&self, linkedin_url: &str) -> Result<Option<Employee>> {
        Ok(self
            .lock()
            .employees
            .values()
            .find(|e| e.linkedin_url == linkedin_url)
            .cloned())
    }

    async fn list_employees(&self, only_active: bool) -> Result<Vec<Employee>> {
        let mut employees: Vec<Employee> = self
            .lock()
            .employees
            .values()
            .filter(|e| !only_active || e.is_active)
            .cloned()
            .collect();
        employees.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(employees)
    }

    async fn insert_employee(&self, employee: &Employee) -> Result<()> {
        self.lock().employees.insert(employee.id, employee.clone());
        Ok(())
    }

    async fn update_employee(&self, employee: &Employee) -> Result<()> {
        self.lock().employees.insert(employee.id, employee.clone());
        Ok(())
    }

    async fn post_by_linkedin_id(&self, linkedin_post_id: &str) -> Result<Option<Post>> {
        Ok(self
            .lock()
            .posts
            .values()
            .find(|p| p.linkedin_post_id == linkedin_post_id)
            .cloned())
    }

    async fn insert_post(&self, post: &Post) -> Result<()> {
        self.lock().posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        self.lock().posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn set_post_mentions_company(&self, post_id: Uuid, mentions: bool) -> Result<()> {
        if let Some(post) = self.lock().posts.get_mut(&post_id) {
            post.mentions_company = mentions;
            post.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn posts_flagged_mentioning(&self) -> Result<Vec<Post>> {
        Ok(self
            .lock()
            .posts
            .values()
            .filter(|p| p.mentions_company)
            .cloned()
            .collect())
    }

    async fn employee_posts_not_mentioning(&self) -> Result<Vec<Post>> {
        Ok(self
            .lock()
            .posts
            .values()
            .filter(|p| p.author_id.is_some() && !p.mentions_company)
            .cloned()
            .collect())
    }

    async fn author_ids_with_posts_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .lock()
            .posts
            .values()
            .filter(|p| p.updated_at >= since)
            .filter_map(|p| p.author_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn posts_by_authors(&self, author_ids: &[Uuid]) -> Result<Vec<Post>> {
        Ok(self
            .lock()
            .posts
            .values()
            .filter(|p| p.author_id.map(|id| author_ids.contains(&id)).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn insert_engagement_snapshot(&self, snapshot: &EngagementSnapshot) -> Result<()> {
        self.lock().snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn snapshots_for_post(&self, post_id: Uuid) -> Result<Vec<EngagementSnapshot>> {
        Ok(self
            .lock()
            .snapshots
            .iter()
            .filter(|s| s.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn upsert_company_mention(&self, mention: &CompanyMention) -> Result<()> {
        let mut inner = self.lock();
        match inner.mentions.get_mut(&mention.post_id) {
            Some(existing) => {
                existing.author_id = mention.author_id;
                existing.published_at = mention.published_at;
            }
            None => {
                inner.mentions.insert(mention.post_id, mention.clone());
            }
        }
        Ok(())
    }

    async fn delete_company_mentions_not_in(&self, post_ids: &[Uuid]) -> Result<u64> {
        let mut inner = self.lock();
        let before = inner.mentions.len();
        inner.mentions.retain(|post_id, _| post_ids.contains(post_id));
        Ok((before - inner.mentions.len()) as u64)
    }

    async fn company_mentions(&self) -> Result<Vec<CompanyMention>> {
        Ok(self.lock().mentions.values().cloned().collect())
    }

    async fn upsert_posting_activity(&self, activity: &PostingActivity) -> Result<()> {
        self.lock()
            .activities
            .insert((activity.employee_id, activity.date), *activity);
        Ok(())
    }

    async fn posting_activity_for_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<PostingActivity>> {
        let mut activities: Vec<PostingActivity> = self
            .lock()
            .activities
            .values()
            .filter(|a| a.employee_id == employee_id)
            .copied()
            .collect();
        activities.sort_by_key(|a| a.date);
        Ok(activities)
    }

    async fn create_scrape_run(&self, run: &ScrapeRun) -> Result<()> {
        self.lock().runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn finalize_scrape_run(
        &self,
        run_id: Uuid,
        status: ScrapeStatus,
        stats: &RunStats,
    ) -> Result<()> {
        if let Some(run) = self.lock().runs.get_mut(&run_id) {
            run.status = status;
            run.items_processed = stats.items_processed;
            run.items_created = stats.items_created;
            run.items_updated = stats.items_updated;
            run.cost_usd = stats.cost_usd;
            run.errors = stats.errors.clone();
            run.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn running_runs_started_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ScrapeRun>> {
        Ok(self
            .lock()
            .runs
            .values()
            .filter(|r| r.status == ScrapeStatus::Running && r.started_at < cutoff)
            .cloned()
            .collect())
    }

    async fn recent_scrape_runs(&self, limit: i64) -> Result<Vec<ScrapeRun>> {
        let mut runs: Vec<ScrapeRun> = self.lock().runs.values().cloned().collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit.max(0) as usize);
        Ok(runs)
    }
}
