use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::execute::error::ExecuteError;
use crate::execute::types::ExecuteResponse;
use crate::monitoring::prometheus_enabled;

/// Outcome of posting a signed order, kept raw so the dispatcher can apply
/// the configured strictness (see [`crate::execute::OrderPostCheck`]).
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub status: u16,
    /// Canonical HTTP reason phrase, when the status code has one.
    pub reason: Option<String>,
    pub body: Value,
}

/// Seam between the step loop and the marketplace HTTP API.
#[async_trait]
pub trait StepFetcher: Send + Sync {
    /// Fetches and validates the current step list for an execute URL.
    async fn fetch_steps(&self, url: &Url) -> Result<ExecuteResponse, ExecuteError>;

    /// Posts a signed order object to the orderbook endpoint.
    async fn post_order(&self, url: &Url, body: &Value) -> Result<OrderReceipt, ExecuteError>;
}

#[derive(Debug, Clone)]
pub struct HttpStepFetcher {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpStepFetcher {
    pub fn new(client: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    fn record_fetch(&self, result: &str, status: Option<u16>, elapsed_ms: f64) {
        if !prometheus_enabled() {
            return;
        }
        let status_label = status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "none".to_string());
        counter!(
            "floorsweep_step_fetch_total",
            "result" => result.to_string(),
            "status" => status_label.clone()
        )
        .increment(1);
        histogram!(
            "floorsweep_step_fetch_latency_ms",
            "result" => result.to_string(),
            "status" => status_label
        )
        .record(elapsed_ms);
    }
}

#[async_trait]
impl StepFetcher for HttpStepFetcher {
    async fn fetch_steps(&self, url: &Url) -> Result<ExecuteResponse, ExecuteError> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(url.as_str())
            .timeout(self.request_timeout)
            .send()
            .await
            .inspect_err(|_| {
                self.record_fetch("transport_error", None, elapsed_ms(start));
            })?;

        let status = response.status();
        let body: Value = response.json().await.inspect_err(|_| {
            self.record_fetch("decode_error", Some(status.as_u16()), elapsed_ms(start));
        })?;

        if !status.is_success() {
            self.record_fetch("http_error", Some(status.as_u16()), elapsed_ms(start));
            debug!(
                target: "execute::fetch",
                %url,
                status = status.as_u16(),
                "step fetch failed"
            );
            return Err(ExecuteError::Api { body });
        }

        self.record_fetch("ok", Some(status.as_u16()), elapsed_ms(start));
        ExecuteResponse::from_value(body)
    }

    async fn post_order(&self, url: &Url, body: &Value) -> Result<OrderReceipt, ExecuteError> {
        let response = self
            .client
            .post(url.as_str())
            .timeout(self.request_timeout)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        debug!(
            target: "execute::order",
            %url,
            status = status.as_u16(),
            "order posted"
        );

        Ok(OrderReceipt {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body,
        })
    }
}

fn elapsed_ms(start: std::time::Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1_000.0
}
