use std::time::Duration;

use serde::Deserialize;

use crate::execute::{OrderPostCheck, PollConfig};

use super::{
    default_logging_level, default_poll_interval_ms, default_poll_max_attempts,
    default_receipt_max_attempts, default_receipt_poll_ms, default_request_timeout_ms,
    default_rpc_url,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub execute: ExecuteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Marketplace API base, e.g. `https://api-goerli.reservoir.tools`.
    #[serde(default = "super::default_api_base")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: super::default_api_base(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Wallet-enabled JSON-RPC endpoint holding the signing key.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Account the flows act as; taker for buys, maker for listings.
    #[serde(default)]
    pub address: Option<String>,
    /// When set, flows refuse to run against an endpoint on another chain.
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default = "default_receipt_max_attempts")]
    pub receipt_max_attempts: u32,
}

impl WalletConfig {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            address: None,
            chain_id: None,
            receipt_poll_ms: default_receipt_poll_ms(),
            receipt_max_attempts: default_receipt_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
    #[serde(default)]
    pub order_post_check: OrderPostCheck,
}

impl ExecuteConfig {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.poll_max_attempts,
        }
    }
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
            order_post_check: OrderPostCheck::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitoringConfig {
    /// Prometheus exporter listen address; metrics stay off when unset.
    #[serde(default)]
    pub prometheus_listen: Option<String>,
}
