//! Normalization boundary between heterogeneous vendor records and the
//! canonical domain model. Each module is a pure mapper: raw JSON in,
//! canonical fields (or a rejection) out. A single malformed item must
//! never abort a batch, so every mapper is total over arbitrary JSON.

pub mod discovery;
pub mod mentions;
pub mod posts;
pub mod profiles;
pub mod text;

pub use discovery::{extract_linkedin_slug, extract_profile_urls, normalize_linkedin_url};
pub use mentions::detect_company_mention;
pub use posts::{author_slug, normalize_post, normalize_search_post, ExternalPost, NormalizedPost};
pub use profiles::{
    extract_company_start_date, infer_department, infer_role, normalize_profile, NormalizedProfile,
};

pub const CRATE_NAME: &str = "pulse-scrapers";
