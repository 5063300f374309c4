use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::execute::{ProgressSink, StepExecutor, StepFetcher, set_params};
use crate::flows::{FlowError, TokenRef};
use crate::wallet::WalletSigner;

/// Buys an explicit set of listed tokens, possibly across collections.
pub async fn buy_tokens<F: StepFetcher>(
    executor: &StepExecutor<F>,
    api_base: &Url,
    tokens: &[TokenRef],
    taker: &str,
    signer: Option<&dyn WalletSigner>,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<(), FlowError> {
    let signer = signer.ok_or(FlowError::MissingSigner)?;
    if tokens.is_empty() {
        return Err(FlowError::MissingTokenIds);
    }
    if taker.is_empty() {
        return Err(FlowError::MissingTaker);
    }

    let url = buy_url(api_base, tokens, taker)?;
    info!(target: "flows::buy", tokens = tokens.len(), "starting buy");
    super::run(executor, url, signer, progress, cancel).await
}

fn buy_url(api_base: &Url, tokens: &[TokenRef], taker: &str) -> Result<Url, FlowError> {
    let mut url = api_base.join("/execute/buy/v2")?;
    let mut params = vec![("taker".to_string(), taker.to_string())];
    for (index, token) in tokens.iter().enumerate() {
        params.push((format!("tokens[{index}]"), token.to_string()));
    }
    set_params(&mut url, params);
    Ok(url)
}
