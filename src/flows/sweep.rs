use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::execute::{ProgressSink, StepExecutor, StepFetcher, set_params};
use crate::flows::FlowError;
use crate::wallet::WalletSigner;

/// Buys every listed token in `token_ids` from one collection in a single
/// driven flow.
pub async fn sweep_tokens<F: StepFetcher>(
    executor: &StepExecutor<F>,
    api_base: &Url,
    collection: &str,
    token_ids: &[String],
    taker: &str,
    signer: Option<&dyn WalletSigner>,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<(), FlowError> {
    let signer = signer.ok_or(FlowError::MissingSigner)?;
    if token_ids.is_empty() {
        return Err(FlowError::MissingTokenIds);
    }
    if collection.is_empty() {
        return Err(FlowError::MissingCollectionId);
    }
    if taker.is_empty() {
        return Err(FlowError::MissingTaker);
    }

    let url = sweep_url(api_base, collection, token_ids, taker)?;
    info!(target: "flows::sweep", collection, tokens = token_ids.len(), "starting sweep");
    super::run(executor, url, signer, progress, cancel).await
}

fn sweep_url(
    api_base: &Url,
    collection: &str,
    token_ids: &[String],
    taker: &str,
) -> Result<Url, FlowError> {
    let mut url = api_base.join("/execute/buy/v2")?;
    let mut params = vec![("taker".to_string(), taker.to_string())];
    for (index, token_id) in token_ids.iter().enumerate() {
        params.push((format!("tokens[{index}]"), format!("{collection}:{token_id}")));
    }
    set_params(&mut url, params);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::{ExecuteError, ExecuteResponse, OrderReceipt};
    use crate::wallet::{PendingTransaction, Signature, SignerError, TransactionRequest};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    #[test]
    fn builds_the_buy_v2_url_with_indexed_tokens() {
        let base = Url::parse("https://api-rinkeby.reservoir.tools").unwrap();
        let ids = vec!["5".to_string(), "9".to_string()];
        let url = sweep_url(&base, "0xcol", &ids, "0xtaker").unwrap();
        assert_eq!(url.path(), "/execute/buy/v2");
        assert_eq!(
            url.query(),
            Some("taker=0xtaker&tokens%5B0%5D=0xcol%3A5&tokens%5B1%5D=0xcol%3A9")
        );
    }

    struct ScriptedFetcher {
        responses: Mutex<Vec<Value>>,
        urls: Mutex<Vec<Url>>,
    }

    #[async_trait]
    impl StepFetcher for ScriptedFetcher {
        async fn fetch_steps(&self, url: &Url) -> Result<ExecuteResponse, ExecuteError> {
            self.urls.lock().unwrap().push(url.clone());
            let mut responses = self.responses.lock().unwrap();
            let body = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            ExecuteResponse::from_value(body)
        }

        async fn post_order(&self, _url: &Url, _body: &Value) -> Result<OrderReceipt, ExecuteError> {
            unreachable!("sweep scenario posts no orders")
        }
    }

    struct StubSigner;

    #[async_trait]
    impl crate::wallet::WalletSigner for StubSigner {
        fn address(&self) -> &str {
            "0xtaker"
        }

        async fn send_transaction(
            &self,
            _tx: &TransactionRequest,
        ) -> Result<PendingTransaction, SignerError> {
            Ok(PendingTransaction {
                hash: "0xhash".into(),
            })
        }

        async fn wait_for_receipt(&self, _tx: &PendingTransaction) -> Result<(), SignerError> {
            Ok(())
        }

        async fn sign_message(&self, _message: &[u8]) -> Result<Signature, SignerError> {
            let raw = format!("0x{}{}1b", "11".repeat(32), "22".repeat(32));
            Signature::from_hex(&raw)
        }

        async fn sign_typed_data(
            &self,
            _domain: &Value,
            _types: &Value,
            _value: &Value,
        ) -> Result<Signature, SignerError> {
            self.sign_message(&[]).await
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressSink for Recorder {
        fn update(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn sweep_runs_steps_to_completion_and_reports_success() {
        let fetcher = ScriptedFetcher {
            responses: Mutex::new(vec![
                json!({ "steps": [{ "kind": "transaction", "status": "incomplete",
                                    "data": { "to": "0xmarket", "value": "0x1" } }] }),
                json!({ "steps": [{ "kind": "transaction", "status": "complete" }] }),
            ]),
            urls: Mutex::new(Vec::new()),
        };
        let executor = StepExecutor::new(fetcher);
        let base = Url::parse("https://api-rinkeby.reservoir.tools").unwrap();
        let ids = vec!["5".to_string(), "9".to_string()];
        let progress = Recorder::default();

        sweep_tokens(
            &executor,
            &base,
            "0xcol",
            &ids,
            "0xtaker",
            Some(&StubSigner),
            &progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let messages = progress.0.lock().unwrap();
        assert_eq!(
            messages.as_slice(),
            &[
                "Waiting for user to confirm".to_string(),
                "Finalizing on blockchain".to_string(),
                "Success".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn preconditions_fail_before_any_fetch() {
        let fetcher = ScriptedFetcher {
            responses: Mutex::new(vec![json!({ "steps": [] })]),
            urls: Mutex::new(Vec::new()),
        };
        let executor = StepExecutor::new(fetcher);
        let base = Url::parse("https://api-rinkeby.reservoir.tools").unwrap();
        let progress = Recorder::default();
        let cancel = CancellationToken::new();
        let ids = vec!["5".to_string()];

        let err = sweep_tokens(
            &executor, &base, "0xcol", &ids, "0xtaker", None, &progress, &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FlowError::MissingSigner));

        let err = sweep_tokens(
            &executor,
            &base,
            "0xcol",
            &[],
            "0xtaker",
            Some(&StubSigner),
            &progress,
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FlowError::MissingTokenIds));

        let err = sweep_tokens(
            &executor,
            &base,
            "",
            &ids,
            "0xtaker",
            Some(&StubSigner),
            &progress,
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FlowError::MissingCollectionId));

        let err = sweep_tokens(
            &executor,
            &base,
            "0xcol",
            &ids,
            "",
            Some(&StubSigner),
            &progress,
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FlowError::MissingTaker));

        // No fetch happened for any of the failed preconditions.
        assert!(executor_urls(&executor).is_empty());
    }

    fn executor_urls(executor: &StepExecutor<ScriptedFetcher>) -> Vec<Url> {
        executor.fetcher().urls.lock().unwrap().clone()
    }
}
