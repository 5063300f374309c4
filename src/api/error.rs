use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to call marketplace API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API request to {endpoint} failed with status {status}: {body}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected response schema: {0}")]
    Schema(String),
}
