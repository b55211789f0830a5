use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend responded {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Malformed backend response: {0}")]
    Decode(String),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("Unknown category: {0}")]
    InvalidCategory(String),

    #[error("Lookup failed: {0}")]
    Backend(#[from] SourceError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Page {0} is out of range")]
    PageOutOfRange(usize),

    #[error("Failed to fetch products page: {0}")]
    Backend(#[from] SourceError),
}
