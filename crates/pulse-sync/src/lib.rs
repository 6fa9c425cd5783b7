//! Scrape orchestration for the engagement pipeline: sync recipes, the
//! per-step run lifecycle, derived-aggregate maintenance, and runtime
//! configuration.

pub mod config;
pub mod orchestrator;
pub mod streaks;

pub use config::SyncConfig;
pub use orchestrator::{MentionRefresh, Orchestrator, SyncError, SyncReport};
pub use streaks::{compute_streaks, StreakSummary};

pub const CRATE_NAME: &str = "pulse-sync";
