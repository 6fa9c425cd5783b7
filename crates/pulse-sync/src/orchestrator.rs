//! Step orchestration: each scrape step runs the vendor actor, feeds the
//! normalizers, and persists results through the [`Store`], bracketed by
//! a ScrapeRun audit row (created RUNNING, finalized exactly once).
//!
//! Steps run sequentially — profile refresh must land before post refresh
//! so attribution sees current URLs — and every write is an independent
//! idempotent upsert, so re-running a partially failed step is safe.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use pulse_apify::{ActorInvoker, ApifyError};
use pulse_core::{
    CompanyMention, Employee, Post, PostingActivity, RunStats, ScoreWeights, ScrapeRun,
    ScrapeStatus, ScrapeType,
};
use pulse_scrapers::discovery::stub_slug;
use pulse_scrapers::mentions::company_slug;
use pulse_scrapers::{
    author_slug, detect_company_mention, extract_company_start_date, extract_linkedin_slug,
    extract_profile_urls, infer_role, normalize_post, normalize_profile, normalize_search_post,
    ExternalPost, NormalizedPost,
};
use pulse_storage::{Store, StoreError};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::streaks::{compute_streaks, StreakSummary};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no company LinkedIn URL configured")]
    MissingCompanyUrl,
    #[error("no company name available for mention search")]
    MissingCompanyName,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Actor(#[from] ApifyError),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Counters from one company-mention table refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MentionRefresh {
    /// Posts whose flag was repaired from false to true.
    pub repaired: usize,
    pub upserted: usize,
    pub deleted: u64,
}

/// Aggregate outcome of one sync recipe.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub expired_runs: usize,
    pub discovery: Option<RunStats>,
    pub profiles: Option<RunStats>,
    pub posts: RunStats,
    pub mentions: RunStats,
    pub mention_refresh: MentionRefresh,
    pub activity_buckets: usize,
}

enum Upsert {
    Created,
    Updated,
}

pub struct Orchestrator {
    store: Arc<dyn Store>,
    actors: Arc<dyn ActorInvoker>,
    config: SyncConfig,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, actors: Arc<dyn ActorInvoker>, config: SyncConfig) -> Self {
        Self {
            store,
            actors,
            config,
        }
    }

    /// Full sync: expire stuck runs, discover, refresh profiles, refresh
    /// posts, search external mentions, rebuild the mention table, and
    /// rebuild activity buckets for authors touched since the post
    /// refresh started.
    pub async fn run_full_sync(&self) -> Result<SyncReport> {
        let expired_runs = self
            .expire_stuck_runs(Duration::minutes(self.config.stale_run_minutes))
            .await?;
        let discovery = self.discover_new_employees().await?;
        let profiles = self.refresh_profiles().await?;
        let scrape_start = Utc::now();
        let posts = self.refresh_posts().await?;
        let mentions = self.search_mentions().await?;
        let mention_refresh = self.update_company_mentions().await?;
        let activity_buckets = self.refresh_posting_activity(Some(scrape_start)).await?;
        Ok(SyncReport {
            expired_runs,
            discovery: Some(discovery),
            profiles: Some(profiles),
            posts,
            mentions,
            mention_refresh,
            activity_buckets,
        })
    }

    /// Daily sync skips discovery and profile refresh; the roster churns
    /// far slower than engagement counts.
    pub async fn run_daily_sync(&self) -> Result<SyncReport> {
        let expired_runs = self
            .expire_stuck_runs(Duration::minutes(self.config.stale_run_minutes))
            .await?;
        let scrape_start = Utc::now();
        let posts = self.refresh_posts().await?;
        let mentions = self.search_mentions().await?;
        let mention_refresh = self.update_company_mentions().await?;
        let activity_buckets = self.refresh_posting_activity(Some(scrape_start)).await?;
        Ok(SyncReport {
            expired_runs,
            discovery: None,
            profiles: None,
            posts,
            mentions,
            mention_refresh,
            activity_buckets,
        })
    }

    pub async fn run_weekly_sync(&self) -> Result<SyncReport> {
        self.run_full_sync().await
    }

    /// Flip runs stuck in RUNNING past the window to FAILED. Not an
    /// exception path: a self-healing correction against crashed callers.
    pub async fn expire_stuck_runs(&self, window: Duration) -> Result<usize> {
        let cutoff = Utc::now() - window;
        let stuck = self.store.running_runs_started_before(cutoff).await?;
        for run in &stuck {
            tracing::warn!(run_id = %run.id, run_type = %run.run_type, "expiring stuck run");
            self.store
                .finalize_scrape_run(
                    run.id,
                    ScrapeStatus::Failed,
                    &RunStats::failure(format!(
                        "expired: still RUNNING after {} minutes",
                        window.num_minutes()
                    )),
                )
                .await?;
        }
        Ok(stuck.len())
    }

    pub async fn discover_new_employees(&self) -> Result<RunStats> {
        let run = ScrapeRun::begin(ScrapeType::EmployeeDiscovery);
        self.store.create_scrape_run(&run).await?;
        let outcome = self.discover_inner().await;
        self.finish_step(run.id, outcome).await
    }

    async fn discover_inner(&self) -> Result<RunStats> {
        let config = self.store.app_config().await?;
        if config.company_linkedin_url.is_empty() {
            return Err(SyncError::MissingCompanyUrl);
        }

        let result = self
            .actors
            .run_actor(
                &self.config.discovery_actor,
                json!({"companies": [config.company_linkedin_url], "takePages": 100}),
            )
            .await?;

        let urls = extract_profile_urls(&result.items);
        let mut created = 0i64;
        for url in &urls {
            if self.store.employee_by_url(url).await?.is_none() {
                let stub = Employee::stub(url, &stub_slug(url));
                self.store.insert_employee(&stub).await?;
                tracing::info!(%url, "created employee stub");
                created += 1;
            }
        }

        tracing::info!(found = urls.len(), created, "employee discovery finished");
        Ok(RunStats {
            items_processed: urls.len() as i64,
            items_created: created,
            cost_usd: result.cost_usd,
            ..RunStats::default()
        })
    }

    pub async fn refresh_profiles(&self) -> Result<RunStats> {
        let run = ScrapeRun::begin(ScrapeType::ProfileScrape);
        self.store.create_scrape_run(&run).await?;
        let outcome = self.profiles_inner().await;
        self.finish_step(run.id, outcome).await
    }

    async fn profiles_inner(&self) -> Result<RunStats> {
        let config = self.store.app_config().await?;
        let employees = self.store.list_employees(true).await?;
        if employees.is_empty() {
            return Ok(RunStats::default());
        }

        let urls: Vec<&str> = employees.iter().map(|e| e.linkedin_url.as_str()).collect();
        let result = self
            .actors
            .run_actor(&self.config.profile_actor, json!({"urls": urls}))
            .await?;

        let mut updated = 0i64;
        for item in &result.items {
            let Some(profile) = normalize_profile(item) else {
                continue;
            };
            // Redirected profiles can come back under a URL we do not
            // track; skip them rather than failing the batch.
            let Some(mut employee) = self.store.employee_by_url(&profile.linkedin_url).await?
            else {
                tracing::warn!(url = %profile.linkedin_url, "scraped profile matches no employee, skipping");
                continue;
            };

            let now = Utc::now();
            employee.first_name = profile.first_name;
            employee.last_name = profile.last_name;
            employee.full_name = profile.full_name;
            employee.headline = profile.headline.clone();
            employee.about = profile.about;
            employee.job_title = profile.job_title;
            if !employee.is_manually_added {
                employee.department = profile.department;
                employee.role = infer_role(&profile.headline, &config.company_name);
            }
            if !profile.avatar_url.is_empty() {
                employee.avatar_url = profile.avatar_url;
            }
            // Overwritten from the fresh work history every refresh; a
            // history that no longer yields a date clears the field.
            employee.company_start_date = profile
                .experience
                .as_ref()
                .and_then(|exp| extract_company_start_date(exp, &config.company_linkedin_url));
            employee.experience = profile.experience;
            employee.education = profile.education;
            employee.skills = profile.skills;
            employee.last_scraped_at = Some(now);
            employee.updated_at = now;

            self.store.update_employee(&employee).await?;
            updated += 1;
        }

        tracing::info!(scraped = result.items.len(), updated, "profile refresh finished");
        Ok(RunStats {
            items_processed: result.items.len() as i64,
            items_updated: updated,
            cost_usd: result.cost_usd,
            ..RunStats::default()
        })
    }

    pub async fn refresh_posts(&self) -> Result<RunStats> {
        let run = ScrapeRun::begin(ScrapeType::PostScrape);
        self.store.create_scrape_run(&run).await?;
        let outcome = self.posts_inner().await;
        self.finish_step(run.id, outcome).await
    }

    /// All active employees' feeds in one actor call; items are attributed
    /// back by author slug afterwards. Items whose slug matches no tracked
    /// employee are dropped.
    async fn posts_inner(&self) -> Result<RunStats> {
        let config = self.store.app_config().await?;
        if config.company_linkedin_url.is_empty() {
            return Err(SyncError::MissingCompanyUrl);
        }
        let employees = self.store.list_employees(true).await?;
        if employees.is_empty() {
            return Ok(RunStats::default());
        }

        let by_slug = slug_index(&employees);
        let urls: Vec<&str> = employees.iter().map(|e| e.linkedin_url.as_str()).collect();
        let result = self
            .actors
            .run_actor(
                &self.config.posts_actor,
                json!({
                    "targetUrls": urls,
                    "postedLimit": "month",
                    "maxPosts": 0,
                    "includeReposts": false,
                }),
            )
            .await?;

        let weights = ScoreWeights::default();
        let mut created = 0i64;
        let mut updated = 0i64;
        for item in &result.items {
            let Some(slug) = author_slug(item) else {
                continue;
            };
            let Some(&author_id) = by_slug.get(&slug) else {
                continue;
            };
            let Some(post) = normalize_post(item, &config.company_linkedin_url, None, &weights)
            else {
                continue;
            };
            match self.upsert_employee_post(author_id, &post).await? {
                Upsert::Created => created += 1,
                Upsert::Updated => updated += 1,
            }
        }

        tracing::info!(
            scraped = result.items.len(),
            created,
            updated,
            "post refresh finished"
        );
        Ok(RunStats {
            items_processed: result.items.len() as i64,
            items_created: created,
            items_updated: updated,
            cost_usd: result.cost_usd,
            ..RunStats::default()
        })
    }

    pub async fn search_mentions(&self) -> Result<RunStats> {
        let run = ScrapeRun::begin(ScrapeType::MentionSearch);
        self.store.create_scrape_run(&run).await?;
        let outcome = self.mentions_inner().await;
        self.finish_step(run.id, outcome).await
    }

    async fn mentions_inner(&self) -> Result<RunStats> {
        let config = self.store.app_config().await?;
        if config.company_linkedin_url.is_empty() {
            return Err(SyncError::MissingCompanyUrl);
        }
        // Fall back to the URL slug with dashes as spaces when no display
        // name is configured.
        let company_name = if config.company_name.is_empty() {
            company_slug(&config.company_linkedin_url)
                .map(|slug| slug.replace('-', " "))
                .unwrap_or_default()
        } else {
            config.company_name.clone()
        };
        if company_name.is_empty() {
            return Err(SyncError::MissingCompanyName);
        }

        let result = self
            .actors
            .run_actor(
                &self.config.search_actor,
                json!({
                    "searchQueries": [company_name],
                    "postedLimit": "month",
                    "sortBy": "date",
                }),
            )
            .await?;

        // Full roster, deactivated included: a former employee's mention
        // post keeps its attribution instead of turning external.
        let employees = self.store.list_employees(false).await?;
        let by_slug = slug_index(&employees);

        let mut created = 0i64;
        let mut updated = 0i64;
        for item in &result.items {
            let Some(external) = normalize_search_post(item, &config.company_linkedin_url) else {
                continue;
            };
            let known_author = extract_linkedin_slug(&external.author_linkedin_url)
                .and_then(|slug| by_slug.get(&slug).copied());
            match self.upsert_search_post(known_author, &external).await? {
                Upsert::Created => created += 1,
                Upsert::Updated => updated += 1,
            }
        }

        tracing::info!(
            found = result.items.len(),
            created,
            updated,
            "mention search finished"
        );
        Ok(RunStats {
            items_processed: result.items.len() as i64,
            items_created: created,
            items_updated: updated,
            cost_usd: result.cost_usd,
            ..RunStats::default()
        })
    }

    /// Rebuild the company-mention table: first a repair pass that
    /// re-detects mentions on attributed posts using the configured
    /// company name as an extra signal, then a full reconciliation of the
    /// mention rows against the flagged-post set (no orphans survive).
    pub async fn update_company_mentions(&self) -> Result<MentionRefresh> {
        let config = self.store.app_config().await?;

        let mut repaired = 0usize;
        if !config.company_linkedin_url.is_empty() {
            for post in self.store.employee_posts_not_mentioning().await? {
                if detect_company_mention(
                    &post.text_content,
                    &config.company_linkedin_url,
                    Some(&config.company_name),
                ) {
                    self.store.set_post_mentions_company(post.id, true).await?;
                    repaired += 1;
                }
            }
        }

        let flagged = self.store.posts_flagged_mentioning().await?;
        let mut kept = Vec::with_capacity(flagged.len());
        for post in &flagged {
            self.store
                .upsert_company_mention(&CompanyMention {
                    id: Uuid::new_v4(),
                    post_id: post.id,
                    author_id: post.author_id,
                    published_at: post.published_at,
                })
                .await?;
            kept.push(post.id);
        }
        let deleted = self.store.delete_company_mentions_not_in(&kept).await?;

        tracing::info!(repaired, upserted = kept.len(), deleted, "company mentions rebuilt");
        Ok(MentionRefresh {
            repaired,
            upserted: kept.len(),
            deleted,
        })
    }

    /// Rebuild per-day posting buckets. With `since`, only authors whose
    /// posts were touched after that instant are recomputed; `None` means
    /// every employee.
    pub async fn refresh_posting_activity(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        let author_ids: Vec<Uuid> = match since {
            Some(watermark) => {
                self.store
                    .author_ids_with_posts_updated_since(watermark)
                    .await?
            }
            None => self
                .store
                .list_employees(false)
                .await?
                .iter()
                .map(|e| e.id)
                .collect(),
        };
        if author_ids.is_empty() {
            return Ok(0);
        }

        let posts = self.store.posts_by_authors(&author_ids).await?;
        let mut buckets: HashMap<(Uuid, NaiveDate), i64> = HashMap::new();
        for post in &posts {
            if let Some(author_id) = post.author_id {
                *buckets
                    .entry((author_id, post.published_at.date_naive()))
                    .or_insert(0) += 1;
            }
        }

        let count = buckets.len();
        for ((employee_id, date), post_count) in buckets {
            self.store
                .upsert_posting_activity(&PostingActivity {
                    employee_id,
                    date,
                    post_count,
                })
                .await?;
        }

        tracing::info!(authors = author_ids.len(), buckets = count, "posting activity rebuilt");
        Ok(count)
    }

    pub async fn employee_streaks(&self, employee_id: Uuid) -> Result<StreakSummary> {
        let activities = self.store.posting_activity_for_employee(employee_id).await?;
        Ok(compute_streaks(&activities, Utc::now().date_naive()))
    }

    async fn finish_step(&self, run_id: Uuid, outcome: Result<RunStats>) -> Result<RunStats> {
        match outcome {
            Ok(stats) => {
                self.store
                    .finalize_scrape_run(run_id, ScrapeStatus::Completed, &stats)
                    .await?;
                Ok(stats)
            }
            Err(err) => {
                self.store
                    .finalize_scrape_run(
                        run_id,
                        ScrapeStatus::Failed,
                        &RunStats::failure(err.to_string()),
                    )
                    .await?;
                Err(err)
            }
        }
    }

    async fn upsert_employee_post(
        &self,
        author_id: Uuid,
        incoming: &NormalizedPost,
    ) -> Result<Upsert> {
        match self
            .store
            .post_by_linkedin_id(&incoming.linkedin_post_id)
            .await?
        {
            Some(mut existing) => {
                self.snapshot_if_changed(&existing, incoming).await?;
                existing.author_id = Some(author_id);
                existing.is_external = false;
                existing.external_author_name = None;
                existing.external_author_url = None;
                existing.external_author_avatar_url = None;
                existing.external_author_headline = None;
                existing.mentions_company = incoming.mentions_company;
                apply_post_fields(&mut existing, incoming);
                self.store.update_post(&existing).await?;
                Ok(Upsert::Updated)
            }
            None => {
                self.store
                    .insert_post(&new_post(incoming, Some(author_id), false))
                    .await?;
                Ok(Upsert::Created)
            }
        }
    }

    /// Merge a search result onto the store. A stored attribution is
    /// never downgraded: when the search result carries no known author
    /// but the stored post has one, the author fields are preserved —
    /// only counts, text, and the (forced) mention flag move forward.
    async fn upsert_search_post(
        &self,
        known_author: Option<Uuid>,
        external: &ExternalPost,
    ) -> Result<Upsert> {
        let incoming = &external.post;
        match self
            .store
            .post_by_linkedin_id(&incoming.linkedin_post_id)
            .await?
        {
            Some(mut existing) => {
                self.snapshot_if_changed(&existing, incoming).await?;
                let preserve_author = existing.author_id.is_some() && known_author.is_none();
                if let Some(author_id) = known_author {
                    existing.author_id = Some(author_id);
                    existing.is_external = false;
                    existing.external_author_name = None;
                    existing.external_author_url = None;
                    existing.external_author_avatar_url = None;
                    existing.external_author_headline = None;
                } else if !preserve_author {
                    existing.author_id = None;
                    existing.is_external = true;
                    set_external_author(&mut existing, external);
                }
                existing.mentions_company = true;
                apply_post_fields(&mut existing, incoming);
                self.store.update_post(&existing).await?;
                Ok(Upsert::Updated)
            }
            None => {
                let mut post = new_post(incoming, known_author, known_author.is_none());
                if known_author.is_none() {
                    set_external_author(&mut post, external);
                }
                self.store.insert_post(&post).await?;
                Ok(Upsert::Created)
            }
        }
    }

    /// Append a history row only when the counts actually moved.
    async fn snapshot_if_changed(&self, existing: &Post, incoming: &NormalizedPost) -> Result<()> {
        if existing.likes == incoming.likes
            && existing.comments == incoming.comments
            && existing.shares == incoming.shares
        {
            return Ok(());
        }
        self.store
            .insert_engagement_snapshot(&pulse_core::EngagementSnapshot {
                id: Uuid::new_v4(),
                post_id: existing.id,
                likes: incoming.likes,
                comments: incoming.comments,
                shares: incoming.shares,
                score: incoming.engagement_score,
                captured_at: Utc::now(),
            })
            .await?;
        Ok(())
    }
}

fn slug_index(employees: &[Employee]) -> HashMap<String, Uuid> {
    employees
        .iter()
        .filter_map(|e| extract_linkedin_slug(&e.linkedin_url).map(|slug| (slug, e.id)))
        .collect()
}

fn apply_post_fields(existing: &mut Post, incoming: &NormalizedPost) {
    existing.post_type = incoming.post_type;
    existing.text_content = incoming.text_content.clone();
    existing.published_at = incoming.published_at;
    existing.linkedin_url = incoming.linkedin_url.clone();
    existing.likes = incoming.likes;
    existing.comments = incoming.comments;
    existing.shares = incoming.shares;
    existing.engagement_score = incoming.engagement_score;
    existing.media_urls = incoming.media_urls.clone();
    existing.hashtags = incoming.hashtags.clone();
    existing.updated_at = Utc::now();
}

fn set_external_author(post: &mut Post, external: &ExternalPost) {
    post.external_author_name = Some(external.author_name.clone());
    post.external_author_url = Some(external.author_linkedin_url.clone());
    post.external_author_avatar_url = Some(external.author_avatar_url.clone());
    post.external_author_headline = Some(external.author_headline.clone());
}

fn new_post(incoming: &NormalizedPost, author_id: Option<Uuid>, is_external: bool) -> Post {
    let now = Utc::now();
    Post {
        id: Uuid::new_v4(),
        linkedin_post_id: incoming.linkedin_post_id.clone(),
        author_id,
        post_type: incoming.post_type,
        text_content: incoming.text_content.clone(),
        published_at: incoming.published_at,
        linkedin_url: incoming.linkedin_url.clone(),
        likes: incoming.likes,
        comments: incoming.comments,
        shares: incoming.shares,
        engagement_score: incoming.engagement_score,
        mentions_company: incoming.mentions_company,
        is_external,
        external_author_name: None,
        external_author_url: None,
        external_author_avatar_url: None,
        external_author_headline: None,
        media_urls: incoming.media_urls.clone(),
        hashtags: incoming.hashtags.clone(),
        created_at: now,
        updated_at: now,
    }
}
