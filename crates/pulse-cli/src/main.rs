use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use clap::{Parser, Subcommand};
use pulse_apify::ApifyClient;
use pulse_storage::{PgStore, Store};
use pulse_sync::{Orchestrator, SyncConfig, SyncReport};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "LinkedIn engagement pipeline operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create any missing tables and indexes.
    Migrate,
    /// Expire stuck runs, discover, refresh profiles and posts, search
    /// mentions, rebuild aggregates.
    FullSync,
    /// Like full-sync, minus discovery and profile refresh.
    DailySync,
    WeeklySync,
    Discover,
    RefreshProfiles,
    RefreshPosts,
    SearchMentions,
    /// Rebuild the company-mention table from stored posts.
    RecomputeMentions,
    /// Rebuild every employee's posting-activity buckets.
    RecomputeActivity,
    /// Streak summary for one employee.
    Streaks { employee_id: Uuid },
    ExpireRuns {
        #[arg(long, default_value_t = 30)]
        window_minutes: i64,
    },
    /// Recent run history (expires stuck runs first).
    Status {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

fn print_report(report: &SyncReport) {
    if let Some(discovery) = &report.discovery {
        println!(
            "discovery: {} found, {} created",
            discovery.items_processed, discovery.items_created
        );
    }
    if let Some(profiles) = &report.profiles {
        println!(
            "profiles: {} scraped, {} updated",
            profiles.items_processed, profiles.items_updated
        );
    }
    println!(
        "posts: {} scraped, {} created, {} updated",
        report.posts.items_processed, report.posts.items_created, report.posts.items_updated
    );
    println!(
        "mentions: {} found, {} created, {} updated",
        report.mentions.items_processed,
        report.mentions.items_created,
        report.mentions.items_updated
    );
    println!(
        "mention table: {} repaired, {} upserted, {} deleted",
        report.mention_refresh.repaired,
        report.mention_refresh.upserted,
        report.mention_refresh.deleted
    );
    println!(
        "activity: {} buckets rebuilt, {} stuck runs expired",
        report.activity_buckets, report.expired_runs
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulse=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env();
    let store = Arc::new(PgStore::connect(&config.database_url).await?);
    store.migrate().await?;

    if config.apify_token.is_empty() {
        tracing::warn!("APIFY_TOKEN is not set; scrape commands will fail");
    }
    let actors = Arc::new(ApifyClient::new(config.apify_token.clone()));
    let orchestrator = Orchestrator::new(store.clone(), actors, config);

    match cli.command {
        Commands::Migrate => println!("migrations applied"),
        Commands::FullSync => print_report(&orchestrator.run_full_sync().await?),
        Commands::DailySync => print_report(&orchestrator.run_daily_sync().await?),
        Commands::WeeklySync => print_report(&orchestrator.run_weekly_sync().await?),
        Commands::Discover => {
            let stats = orchestrator.discover_new_employees().await?;
            println!(
                "discovery: {} found, {} created (${:.4})",
                stats.items_processed, stats.items_created, stats.cost_usd
            );
        }
        Commands::RefreshProfiles => {
            let stats = orchestrator.refresh_profiles().await?;
            println!(
                "profiles: {} scraped, {} updated (${:.4})",
                stats.items_processed, stats.items_updated, stats.cost_usd
            );
        }
        Commands::RefreshPosts => {
            let stats = orchestrator.refresh_posts().await?;
            println!(
                "posts: {} scraped, {} created, {} updated (${:.4})",
                stats.items_processed, stats.items_created, stats.items_updated, stats.cost_usd
            );
        }
        Commands::SearchMentions => {
            let stats = orchestrator.search_mentions().await?;
            println!(
                "mentions: {} found, {} created, {} updated (${:.4})",
                stats.items_processed, stats.items_created, stats.items_updated, stats.cost_usd
            );
        }
        Commands::RecomputeMentions => {
            let refresh = orchestrator.update_company_mentions().await?;
            println!(
                "mention table: {} repaired, {} upserted, {} deleted",
                refresh.repaired, refresh.upserted, refresh.deleted
            );
        }
        Commands::RecomputeActivity => {
            let buckets = orchestrator.refresh_posting_activity(None).await?;
            println!("activity: {buckets} buckets rebuilt");
        }
        Commands::Streaks { employee_id } => {
            let summary = orchestrator.employee_streaks(employee_id).await?;
            println!(
                "current={} longest={} active={} last_post={}",
                summary.current_streak,
                summary.longest_streak,
                summary.is_active,
                summary
                    .last_post_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "never".to_string())
            );
        }
        Commands::ExpireRuns { window_minutes } => {
            let expired = orchestrator
                .expire_stuck_runs(Duration::minutes(window_minutes))
                .await?;
            println!("expired {expired} stuck runs");
        }
        Commands::Status { limit } => {
            // Short window: anything RUNNING past 10 minutes is reported
            // as FAILED rather than left to look alive.
            orchestrator.expire_stuck_runs(Duration::minutes(10)).await?;
            let runs = store.recent_scrape_runs(limit).await?;
            for run in runs {
                println!(
                    "{} {:<18} {:<9} processed={} created={} updated={} cost=${:.4}{}",
                    run.started_at.format("%Y-%m-%d %H:%M"),
                    run.run_type.as_str(),
                    run.status.as_str(),
                    run.items_processed,
                    run.items_created,
                    run.items_updated,
                    run.cost_usd,
                    run.errors
                        .map(|e| format!(" errors: {e}"))
                        .unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
