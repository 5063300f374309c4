use std::fmt;
use std::str::FromStr;

use time::{Duration, OffsetDateTime};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use crate::execute::{ProgressSink, StepExecutor, StepFetcher, set_params};
use crate::flows::{FlowError, TokenRef};
use crate::wallet::WalletSigner;

/// Exchange protocol the order is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderKind {
    Erc721Ex,
    LooksRare,
    WyvernV23,
    ZeroExV4,
    #[default]
    Seaport,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Erc721Ex => "721ex",
            OrderKind::LooksRare => "looks-rare",
            OrderKind::WyvernV23 => "wyvern-v2.3",
            OrderKind::ZeroExV4 => "zeroex-v4",
            OrderKind::Seaport => "seaport",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "721ex" => Ok(OrderKind::Erc721Ex),
            "looks-rare" => Ok(OrderKind::LooksRare),
            "wyvern-v2.3" => Ok(OrderKind::WyvernV23),
            "zeroex-v4" => Ok(OrderKind::ZeroExV4),
            "seaport" => Ok(OrderKind::Seaport),
            other => Err(format!("unknown order kind `{other}`")),
        }
    }
}

/// Orderbook the signed order is posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orderbook {
    Opensea,
    LooksRare,
    #[default]
    Reservoir,
}

impl Orderbook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orderbook::Opensea => "opensea",
            Orderbook::LooksRare => "looks-rare",
            Orderbook::Reservoir => "reservoir",
        }
    }
}

impl fmt::Display for Orderbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orderbook {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "opensea" => Ok(Orderbook::Opensea),
            "looks-rare" => Ok(Orderbook::LooksRare),
            "reservoir" => Ok(Orderbook::Reservoir),
            other => Err(format!("unknown orderbook `{other}`")),
        }
    }
}

/// Listing lifetime presets matching the demo's selector. `None` produces an
/// expiration of 0, which the API reads as no expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpirationPreset {
    OneHour,
    #[default]
    OneWeek,
    OneMonth,
    None,
}

impl ExpirationPreset {
    /// Unix-seconds expiration relative to `now`.
    pub fn expiration_time(&self, now: OffsetDateTime) -> u64 {
        let until = match self {
            ExpirationPreset::OneHour => Duration::hours(1),
            ExpirationPreset::OneWeek => Duration::weeks(1),
            ExpirationPreset::OneMonth => Duration::days(30),
            ExpirationPreset::None => return 0,
        };
        (now + until).unix_timestamp().max(0) as u64
    }
}

impl FromStr for ExpirationPreset {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "one-hour" => Ok(ExpirationPreset::OneHour),
            "one-week" => Ok(ExpirationPreset::OneWeek),
            "one-month" => Ok(ExpirationPreset::OneMonth),
            "none" => Ok(ExpirationPreset::None),
            other => Err(format!("unknown expiration preset `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingFee {
    pub recipient: String,
    /// Fee in basis points (the demo multiplied its percent input by 100).
    pub basis_points: u32,
}

#[derive(Debug, Clone)]
pub struct Listing {
    pub token: TokenRef,
    /// Ask price in wei, decimal string.
    pub wei_price: String,
    pub order_kind: OrderKind,
    pub orderbook: Orderbook,
    pub expiration: ExpirationPreset,
    pub fee: Option<ListingFee>,
}

/// Lists one token for sale, driving the returned approval/signature/post
/// steps to completion.
pub async fn list_token<F: StepFetcher>(
    executor: &StepExecutor<F>,
    api_base: &Url,
    listing: &Listing,
    maker: &str,
    signer: Option<&dyn WalletSigner>,
    progress: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<(), FlowError> {
    let signer = signer.ok_or(FlowError::MissingSigner)?;
    if maker.is_empty() {
        return Err(FlowError::MissingMaker);
    }

    let url = listing_url(api_base, listing, maker, OffsetDateTime::now_utc())?;
    info!(
        target: "flows::list",
        token = %listing.token,
        wei_price = %listing.wei_price,
        orderbook = %listing.orderbook,
        "starting listing"
    );
    super::run(executor, url, signer, progress, cancel).await
}

fn listing_url(
    api_base: &Url,
    listing: &Listing,
    maker: &str,
    now: OffsetDateTime,
) -> Result<Url, FlowError> {
    let mut url = api_base.join("/execute/list/v1")?;
    let mut params = vec![
        ("maker".to_string(), maker.to_string()),
        ("token".to_string(), listing.token.to_string()),
        ("weiPrice".to_string(), listing.wei_price.clone()),
        ("orderKind".to_string(), listing.order_kind.to_string()),
        ("orderbook".to_string(), listing.orderbook.to_string()),
        (
            "expirationTime".to_string(),
            listing.expiration.expiration_time(now).to_string(),
        ),
    ];
    if let Some(fee) = &listing.fee {
        params.push(("fee".to_string(), fee.basis_points.to_string()));
        params.push(("feeRecipient".to_string(), fee.recipient.clone()));
    }
    set_params(&mut url, params);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn listing() -> Listing {
        Listing {
            token: "0xcol:7".parse().unwrap(),
            wei_price: "10000000000000000".into(),
            order_kind: OrderKind::Seaport,
            orderbook: Orderbook::Reservoir,
            expiration: ExpirationPreset::OneWeek,
            fee: None,
        }
    }

    #[test]
    fn builds_the_list_v1_url() {
        let base = Url::parse("https://api-goerli.reservoir.tools").unwrap();
        let now = datetime!(2022-06-01 00:00:00 UTC);
        let url = listing_url(&base, &listing(), "0xmaker", now).unwrap();
        assert_eq!(url.path(), "/execute/list/v1");
        let query = url.query().unwrap();
        assert!(query.contains("maker=0xmaker"));
        assert!(query.contains("token=0xcol%3A7"));
        assert!(query.contains("weiPrice=10000000000000000"));
        assert!(query.contains("orderKind=seaport"));
        assert!(query.contains("orderbook=reservoir"));
        let one_week_later = (now + Duration::weeks(1)).unix_timestamp();
        assert!(query.contains(&format!("expirationTime={one_week_later}")));
        assert!(!query.contains("fee="));
        assert!(!query.contains("feeRecipient="));
    }

    #[test]
    fn fee_pair_is_present_only_when_given() {
        let base = Url::parse("https://api-goerli.reservoir.tools").unwrap();
        let mut with_fee = listing();
        with_fee.fee = Some(ListingFee {
            recipient: "0xfee".into(),
            basis_points: 250,
        });
        let url = listing_url(&base, &with_fee, "0xmaker", OffsetDateTime::now_utc()).unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("fee=250"));
        assert!(query.contains("feeRecipient=0xfee"));
    }

    #[test]
    fn none_preset_means_no_expiry() {
        assert_eq!(
            ExpirationPreset::None.expiration_time(OffsetDateTime::now_utc()),
            0
        );
    }

    #[test]
    fn enum_round_trips_match_the_api_values() {
        for kind in ["721ex", "looks-rare", "wyvern-v2.3", "zeroex-v4", "seaport"] {
            assert_eq!(kind.parse::<OrderKind>().unwrap().as_str(), kind);
        }
        for book in ["opensea", "looks-rare", "reservoir"] {
            assert_eq!(book.parse::<Orderbook>().unwrap().as_str(), book);
        }
    }
}
