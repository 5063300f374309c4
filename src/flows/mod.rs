//! The three user-facing flows — buy, list, sweep — as thin front-ends over
//! one shared step executor. They differ only in the execute URL they build
//! and the preconditions they check before touching the network.

pub mod buy;
pub mod list;
pub mod sweep;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::execute::{ExecuteError, ProgressSink, StepExecutor, StepFetcher};
use crate::wallet::WalletSigner;

pub use buy::buy_tokens;
pub use list::{ExpirationPreset, Listing, ListingFee, OrderKind, Orderbook, list_token};
pub use sweep::sweep_tokens;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("missing a signer")]
    MissingSigner,
    #[error("missing token ids")]
    MissingTokenIds,
    #[error("missing collection id")]
    MissingCollectionId,
    #[error("missing a taker address")]
    MissingTaker,
    #[error("missing a maker address")]
    MissingMaker,
    #[error("invalid token reference `{0}`, expected `contract:tokenId`")]
    InvalidTokenRef(String),
    #[error("invalid execute URL: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

/// `contract:tokenId` pair, the way the execute API addresses a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRef {
    pub contract: String,
    pub token_id: String,
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contract, self.token_id)
    }
}

impl FromStr for TokenRef {
    type Err = FlowError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.split_once(':') {
            Some((contract, token_id)) if !contract.is_empty() && !token_id.is_empty() => {
                Ok(Self {
                    contract: contract.to_string(),
                    token_id: token_id.to_string(),
                })
            }
            _ => Err(FlowError::InvalidTokenRef(input.to_string())),
        }
    }
}

/// Runs the executor and emits the terminal callback the demos emitted:
/// "Success" on completion, "Error: {message}" on failure.
pub(crate) async fn run<F: StepFetcher>(
    executor: &StepExecutor<F>,
    url: Url,
    signer: &dyn WalletSigner,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<(), FlowError> {
    match executor.execute(url, signer, None, progress, cancel).await {
        Ok(()) => {
            progress.update("Success");
            Ok(())
        }
        Err(err) => {
            progress.update(&format!("Error: {err}"));
            Err(err.into())
        }
    }
}
