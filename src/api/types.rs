use serde::Deserialize;

/// Floor listing from `/tokens/bootstrap/v1`, the cheapest listed tokens of
/// a collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorToken {
    pub contract: String,
    pub token_id: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub maker: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloorTokensResponse {
    #[serde(default)]
    pub tokens: Vec<FloorToken>,
}

/// Token + market pair from `/tokens/v5`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenListing {
    #[serde(default)]
    pub token: Option<TokenDetails>,
    #[serde(default)]
    pub market: Option<TokenMarket>,
}

impl TokenListing {
    /// Floor ask in the chain's native unit, when the token has one.
    pub fn floor_price(&self) -> Option<f64> {
        self.market
            .as_ref()?
            .floor_ask
            .as_ref()?
            .price
            .as_ref()?
            .amount
            .as_ref()?
            .native
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetails {
    pub contract: String,
    pub token_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMarket {
    #[serde(default)]
    pub floor_ask: Option<FloorAsk>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloorAsk {
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub amount: Option<PriceAmount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceAmount {
    #[serde(default)]
    pub native: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenListingsResponse {
    #[serde(default)]
    pub tokens: Vec<TokenListing>,
}

/// Token owned by a user, from `/users/{user}/tokens/v2`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserToken {
    #[serde(default)]
    pub token: Option<TokenDetails>,
    #[serde(default)]
    pub ownership: Option<Ownership>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ownership {
    #[serde(default)]
    pub token_count: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserTokensResponse {
    #[serde(default)]
    pub tokens: Vec<UserToken>,
}
