//! Core domain model for the engagement-tracking pipeline.

pub mod dates;
pub mod engagement;
pub mod model;

pub use dates::week_start;
pub use engagement::{engagement_score, ScoreWeights, HIT_LIKES_THRESHOLD};
pub use model::{
    AppConfig, CompanyMention, Department, Employee, EmployeeRole, EngagementSnapshot,
    ParseEnumError, Post, PostType, PostingActivity, RunStats, ScrapeRun, ScrapeStatus, ScrapeType,
};

pub const CRATE_NAME: &str = "pulse-core";
