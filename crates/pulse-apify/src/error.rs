use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApifyError>;

#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Apify API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("actor run finished with status {0}")]
    RunFailed(String),
}
