use thiserror::Error;

use crate::wallet::SignerError;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to call marketplace API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("marketplace API returned an error body: {body}")]
    Api { body: serde_json::Value },
    #[error("step {index} carries a malformed `{kind}` payload: {reason}")]
    MalformedStep {
        index: usize,
        kind: String,
        reason: String,
    },
    #[error("invalid order endpoint `{endpoint}`: {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },
    #[error("order submission rejected with status {status}: {body}")]
    OrderRejected {
        status: u16,
        body: serde_json::Value,
    },
    #[error("step {index} data did not materialize after {attempts} polls")]
    PollTimeout { index: usize, attempts: u32 },
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Signer(#[from] SignerError),
}
