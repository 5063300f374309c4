use std::collections::BTreeSet;

use metrics::counter;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::execute::error::ExecuteError;
use crate::execute::fetcher::{OrderReceipt, StepFetcher};
use crate::execute::poll::{PollConfig, poll_until_has_data};
use crate::execute::query::{set_params, stringify};
use crate::execute::types::{ExecuteResponse, SignatureRequest, StepAction};
use crate::monitoring::prometheus_enabled;
use crate::wallet::WalletSigner;

/// Receives human-readable progress messages as the loop advances, the same
/// strings the browser demos rendered.
pub trait ProgressSink: Send + Sync {
    fn update(&self, message: &str);
}

/// Sink that drops every message, for callers that do not render progress.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update(&self, _message: &str) {}
}

/// Success criterion for the orderbook POST. The source demos checked the
/// HTTP reason phrase (`statusText !== 'OK'`), which only ever accepts a bare
/// 200; whether that was intentional is unclear, so both readings are kept
/// and the source-faithful one is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderPostCheck {
    #[default]
    ReasonPhrase,
    HttpStatus,
}

impl OrderPostCheck {
    pub fn accepts(&self, receipt: &OrderReceipt) -> bool {
        match self {
            OrderPostCheck::ReasonPhrase => receipt.reason.as_deref() == Some("OK"),
            OrderPostCheck::HttpStatus => (200..300).contains(&receipt.status),
        }
    }
}

/// Drives a server-declared step list to completion: fetch, dispatch the
/// first incomplete step, fold the server's follow-up query parameters into
/// the execute URL, re-fetch, until no incomplete step remains.
///
/// The URL passed to [`execute`](Self::execute) is the execution context: it
/// is owned by that one invocation and accumulates signature components and
/// server-asserted parameters between fetches.
pub struct StepExecutor<F> {
    fetcher: F,
    poll: PollConfig,
    post_check: OrderPostCheck,
}

impl<F: StepFetcher> StepExecutor<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            poll: PollConfig::default(),
            post_check: OrderPostCheck::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_post_check(mut self, post_check: OrderPostCheck) -> Self {
        self.post_check = post_check;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn execute(
        &self,
        mut url: Url,
        signer: &dyn WalletSigner,
        seed: Option<ExecuteResponse>,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), ExecuteError> {
        let mut seed = seed;
        // Unknown step kinds are dispatched once as a no-op and then ignored
        // when locating the next incomplete step, so a server that never
        // advances them cannot spin the loop.
        let mut skipped: BTreeSet<usize> = BTreeSet::new();

        loop {
            if cancel.is_cancelled() {
                return Err(ExecuteError::Cancelled);
            }

            let response = match seed.take() {
                Some(response) => response,
                None => self.fetcher.fetch_steps(&url).await?,
            };

            let Some(index) = response.first_incomplete(&skipped) else {
                info!(target: "execute", %url, "all steps complete");
                return Ok(());
            };

            // Fold server-asserted query additions in before any poll or
            // dispatch touches the URL again.
            if !response.query.is_empty() {
                let pairs: Vec<(String, String)> = response
                    .query
                    .iter()
                    .map(|(key, value)| (key.clone(), stringify(value)))
                    .collect();
                set_params(&mut url, pairs);
            }

            let step = &response.steps[index];
            let kind = step.kind.clone();
            let data = if step.has_data() {
                step.data.clone()
            } else {
                let refreshed =
                    poll_until_has_data(&self.fetcher, &url, index, self.poll, cancel).await?;
                refreshed.steps.get(index).and_then(|step| step.data.clone())
            };

            record_step(&kind);
            debug!(target: "execute", index, kind = %kind, "dispatching step");

            match StepAction::parse(index, &kind, data.unwrap_or(serde_json::Value::Null))? {
                StepAction::Transaction(tx) => {
                    progress.update("Waiting for user to confirm");
                    let pending = signer.send_transaction(&tx).await?;
                    progress.update("Finalizing on blockchain");
                    signer.wait_for_receipt(&pending).await?;
                }
                StepAction::Signature(request) => {
                    progress.update("Waiting for user to sign");
                    let signature = match request {
                        SignatureRequest::Eip191 { message } => {
                            signer.sign_message(&message).await?
                        }
                        SignatureRequest::Eip712 {
                            domain,
                            types,
                            value,
                        } => signer.sign_typed_data(&domain, &types, &value).await?,
                    };
                    let parts = signature.split();
                    set_params(
                        &mut url,
                        [
                            ("r", parts.r),
                            ("s", parts.s),
                            ("v", parts.v.to_string()),
                        ],
                    );
                }
                StepAction::Request(post) => {
                    progress.update("Verifying");
                    // Endpoints resolve against the API origin, not the
                    // execute URL's path, so `order/v2` and `/order/v2`
                    // land on the same resource.
                    let endpoint = url
                        .join("/")
                        .and_then(|origin| origin.join(&post.endpoint))
                        .map_err(|source| ExecuteError::InvalidEndpoint {
                            endpoint: post.endpoint.clone(),
                            source,
                        })?;
                    let receipt = match self.fetcher.post_order(&endpoint, &post.body).await {
                        Ok(receipt) => receipt,
                        Err(err) => {
                            progress.update("Your order could not be posted.");
                            return Err(err);
                        }
                    };
                    if !self.post_check.accepts(&receipt) {
                        progress.update("Your order could not be posted.");
                        return Err(ExecuteError::OrderRejected {
                            status: receipt.status,
                            body: receipt.body,
                        });
                    }
                }
                StepAction::Confirmation => {
                    progress.update("Confirmed by indexer");
                }
                StepAction::Unknown(other) => {
                    warn!(target: "execute", index, kind = %other, "skipping unknown step kind");
                    skipped.insert(index);
                }
            }
        }
    }
}

fn record_step(kind: &str) {
    if !prometheus_enabled() {
        return;
    }
    counter!("floorsweep_steps_dispatched_total", "kind" => kind.to_string()).increment(1);
}
