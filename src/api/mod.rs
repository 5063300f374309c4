//! Marketplace HTTP API: token and listing reads.

pub mod client;
pub mod error;
pub mod types;

pub use client::MarketApiClient;
pub use error::ApiError;
pub use types::{FloorToken, TokenListing, UserToken};
