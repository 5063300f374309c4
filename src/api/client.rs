use std::time::Duration;

use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::api::error::ApiError;
use crate::api::types::{
    FloorToken, FloorTokensResponse, TokenListing, TokenListingsResponse, UserToken,
    UserTokensResponse,
};
use crate::monitoring::prometheus_enabled;

/// Read-side client for the marketplace HTTP API (token and listing data).
/// The write side — the `/execute/*` step endpoints — lives in
/// [`crate::execute`].
#[derive(Debug, Clone)]
pub struct MarketApiClient {
    base_url: Url,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl MarketApiClient {
    pub fn new(client: reqwest::Client, base_url: Url, request_timeout: Duration) -> Self {
        Self {
            base_url,
            client,
            request_timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Cheapest listed tokens of a collection (`/tokens/bootstrap/v1`), the
    /// candidate set for a sweep.
    pub async fn floor_tokens(
        &self,
        collection: &str,
        limit: u32,
    ) -> Result<Vec<FloorToken>, ApiError> {
        let url = self.endpoint("/tokens/bootstrap/v1")?;
        let response: FloorTokensResponse = self
            .get_json(
                url,
                &[("collection", collection), ("limit", &limit.to_string())],
                "floor_tokens",
            )
            .await?;
        info!(
            target: "api::tokens",
            collection,
            count = response.tokens.len(),
            "fetched floor tokens"
        );
        Ok(response.tokens)
    }

    /// Listed tokens of a collection ordered by floor ask (`/tokens/v5`).
    pub async fn collection_tokens(&self, contract: &str) -> Result<Vec<TokenListing>, ApiError> {
        let url = self.endpoint("/tokens/v5")?;
        let response: TokenListingsResponse = self
            .get_json(
                url,
                &[("collection", contract), ("sortBy", "floorAskPrice")],
                "collection_tokens",
            )
            .await?;
        info!(
            target: "api::tokens",
            contract,
            count = response.tokens.len(),
            "fetched collection tokens"
        );
        Ok(response.tokens)
    }

    /// Tokens held by a wallet (`/users/{user}/tokens/v2`), the candidate
    /// set for a listing.
    pub async fn user_tokens(&self, user: &str, limit: u32) -> Result<Vec<UserToken>, ApiError> {
        let url = self.endpoint(&format!("/users/{user}/tokens/v2"))?;
        let response: UserTokensResponse = self
            .get_json(url, &[("limit", &limit.to_string())], "user_tokens")
            .await?;
        info!(
            target: "api::tokens",
            user,
            count = response.tokens.len(),
            "fetched user tokens"
        );
        Ok(response.tokens)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::Schema(format!("invalid endpoint path `{path}`: {err}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        stage: &str,
    ) -> Result<T, ApiError> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(url.as_str())
            .timeout(self.request_timeout)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            record_request(stage, "http_error", Some(status), start);
            return Err(ApiError::Status {
                endpoint: url.to_string(),
                status,
                body,
            });
        }

        let parsed = response.json::<T>().await?;
        record_request(stage, "ok", Some(status), start);
        debug!(
            target: "api::client",
            stage,
            elapsed_ms = start.elapsed().as_secs_f64() * 1_000.0,
            "request completed"
        );
        Ok(parsed)
    }
}

fn record_request(
    stage: &str,
    result: &str,
    status: Option<reqwest::StatusCode>,
    start: std::time::Instant,
) {
    if !prometheus_enabled() {
        return;
    }
    let status_label = status
        .map(|code| code.as_u16().to_string())
        .unwrap_or_else(|| "none".to_string());
    counter!(
        "floorsweep_api_requests_total",
        "stage" => stage.to_string(),
        "result" => result.to_string(),
        "status" => status_label.clone()
    )
    .increment(1);
    histogram!(
        "floorsweep_api_latency_ms",
        "stage" => stage.to_string(),
        "result" => result.to_string(),
        "status" => status_label
    )
    .record(start.elapsed().as_secs_f64() * 1_000.0);
}
