use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

mod api;
mod config;
mod execute;
mod flows;
mod monitoring;
mod wallet;

use api::MarketApiClient;
use config::{AppConfig, load_config};
use execute::{HttpStepFetcher, StepExecutor};
use flows::{ExpirationPreset, Listing, ListingFee, OrderKind, Orderbook, TokenRef};
use wallet::RpcWalletSigner;

#[derive(Parser, Debug)]
#[command(name = "floorsweep", version, about = "NFT marketplace execution client")]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Config file path (defaults to floorsweep.toml or config/floorsweep.toml)"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the cheapest listed tokens of a collection
    Floor(FloorCmd),
    /// Show listed tokens of a collection ordered by floor price
    Tokens(TokensCmd),
    /// Show tokens owned by a wallet
    Owned(OwnedCmd),
    /// Buy every given token id from one collection
    Sweep(SweepCmd),
    /// Buy an explicit set of contract:tokenId pairs
    Buy(BuyCmd),
    /// List a token for sale
    List(ListCmd),
}

#[derive(Args, Debug)]
struct FloorCmd {
    /// Collection contract address
    collection: String,
    #[arg(long, default_value_t = 5)]
    limit: u32,
}

#[derive(Args, Debug)]
struct TokensCmd {
    /// Collection contract address
    contract: String,
}

#[derive(Args, Debug)]
struct OwnedCmd {
    /// Wallet address (defaults to the configured wallet)
    user: Option<String>,
    #[arg(long, default_value_t = 10)]
    limit: u32,
}

#[derive(Args, Debug)]
struct SweepCmd {
    /// Collection contract address
    collection: String,
    /// Token ids to sweep
    #[arg(required = true)]
    token_ids: Vec<String>,
    /// Taker address (defaults to the configured wallet)
    #[arg(long)]
    taker: Option<String>,
}

#[derive(Args, Debug)]
struct BuyCmd {
    /// Tokens as contract:tokenId
    #[arg(required = true)]
    tokens: Vec<String>,
    #[arg(long)]
    taker: Option<String>,
}

#[derive(Args, Debug)]
struct ListCmd {
    /// Token as contract:tokenId
    token: String,
    /// Ask price in wei
    #[arg(long)]
    wei_price: String,
    #[arg(long, default_value = "seaport")]
    order_kind: String,
    #[arg(long, default_value = "reservoir")]
    orderbook: String,
    /// one-hour | one-week | one-month | none
    #[arg(long, default_value = "one-week")]
    expiration: String,
    /// Fee in basis points; requires --fee-recipient
    #[arg(long)]
    fee_bps: Option<u32>,
    #[arg(long)]
    fee_recipient: Option<String>,
    /// Maker address (defaults to the configured wallet)
    #[arg(long)]
    maker: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.clone()).context("failed to load configuration")?;
    init_tracing(&config.logging)?;

    if let Some(listen) = &config.monitoring.prometheus_listen {
        monitoring::init_prometheus(listen)?;
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let client = reqwest::Client::new();
    let api_base: Url = config
        .api
        .base_url
        .parse()
        .with_context(|| format!("invalid api base url: {}", config.api.base_url))?;
    let api = MarketApiClient::new(client.clone(), api_base.clone(), config.api.request_timeout());

    match cli.command {
        Command::Floor(cmd) => {
            let tokens = api.floor_tokens(&cmd.collection, cmd.limit).await?;
            if tokens.is_empty() {
                println!("no floor tokens found for {}", cmd.collection);
            }
            for token in tokens {
                println!(
                    "{}:{}  price={}  source={}",
                    token.contract,
                    token.token_id,
                    token
                        .price
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".into()),
                    token.source.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Tokens(cmd) => {
            let tokens = api.collection_tokens(&cmd.contract).await?;
            let listed: Vec<_> = tokens
                .iter()
                .filter(|token| token.floor_price().is_some())
                .collect();
            if listed.is_empty() {
                println!("there are no tokens available to purchase");
            }
            for listing in listed {
                let details = listing.token.as_ref();
                println!(
                    "{}  price={}",
                    details
                        .map(|t| format!("{}:{}", t.contract, t.token_id))
                        .unwrap_or_else(|| "<unknown>".into()),
                    listing.floor_price().unwrap_or_default(),
                );
            }
        }
        Command::Owned(cmd) => {
            let user = match cmd.user.or_else(|| config.wallet.address.clone()) {
                Some(user) => user,
                None => bail!("no wallet address given or configured"),
            };
            let tokens = api.user_tokens(&user, cmd.limit).await?;
            if tokens.is_empty() {
                println!("{user} has no tokens available for listing");
            }
            for token in tokens {
                if let Some(details) = token.token {
                    println!("{}:{}", details.contract, details.token_id);
                }
            }
        }
        Command::Sweep(cmd) => {
            let (signer, account) = build_signer(&client, &config, cmd.taker.clone()).await?;
            let executor = build_executor(&client, &config);
            flows::sweep_tokens(
                &executor,
                &api_base,
                &cmd.collection,
                &cmd.token_ids,
                &account,
                Some(&signer),
                &StdoutProgress,
                &cancel,
            )
            .await?;
        }
        Command::Buy(cmd) => {
            let tokens = cmd
                .tokens
                .iter()
                .map(|raw| raw.parse::<TokenRef>())
                .collect::<Result<Vec<_>, _>>()?;
            let (signer, account) = build_signer(&client, &config, cmd.taker.clone()).await?;
            let executor = build_executor(&client, &config);
            flows::buy_tokens(
                &executor,
                &api_base,
                &tokens,
                &account,
                Some(&signer),
                &StdoutProgress,
                &cancel,
            )
            .await?;
        }
        Command::List(cmd) => {
            let listing = build_listing(&cmd)?;
            let (signer, account) = build_signer(&client, &config, cmd.maker.clone()).await?;
            let executor = build_executor(&client, &config);
            flows::list_token(
                &executor,
                &api_base,
                &listing,
                &account,
                Some(&signer),
                &StdoutProgress,
                &cancel,
            )
            .await?;
        }
    }

    Ok(())
}

/// Renders step progress the way the browser demos rendered their progress
/// text: one line per transition.
struct StdoutProgress;

impl execute::ProgressSink for StdoutProgress {
    fn update(&self, message: &str) {
        println!("progress: {message}");
    }
}

fn build_executor(client: &reqwest::Client, config: &AppConfig) -> StepExecutor<HttpStepFetcher> {
    let fetcher = HttpStepFetcher::new(client.clone(), config.api.request_timeout());
    StepExecutor::new(fetcher)
        .with_poll_config(config.execute.poll_config())
        .with_post_check(config.execute.order_post_check)
}

/// Builds the JSON-RPC signer and resolves the acting account, enforcing the
/// configured chain id before any marketplace call.
async fn build_signer(
    client: &reqwest::Client,
    config: &AppConfig,
    account_override: Option<String>,
) -> Result<(RpcWalletSigner, String)> {
    let account = match account_override.or_else(|| config.wallet.address.clone()) {
        Some(account) => account,
        None => bail!("no wallet address given or configured"),
    };
    let endpoint: Url = config
        .wallet
        .rpc_url
        .parse()
        .with_context(|| format!("invalid wallet rpc url: {}", config.wallet.rpc_url))?;
    let signer = RpcWalletSigner::new(client.clone(), endpoint, account.clone())
        .with_request_timeout(config.api.request_timeout())
        .with_receipt_policy(
            config.wallet.receipt_poll_interval(),
            config.wallet.receipt_max_attempts,
        );

    if let Some(expected) = config.wallet.chain_id {
        let actual = signer.chain_id().await?;
        if actual != expected {
            bail!(
                "connected to the wrong network: wallet rpc reports chain {actual}, expected {expected}"
            );
        }
        info!(chain_id = actual, "wallet network verified");
    }

    Ok((signer, account))
}

fn build_listing(cmd: &ListCmd) -> Result<Listing> {
    let token: TokenRef = cmd.token.parse()?;
    let order_kind: OrderKind = cmd.order_kind.parse().map_err(anyhow::Error::msg)?;
    let orderbook: Orderbook = cmd.orderbook.parse().map_err(anyhow::Error::msg)?;
    let expiration: ExpirationPreset = cmd.expiration.parse().map_err(anyhow::Error::msg)?;
    let fee = match (&cmd.fee_bps, &cmd.fee_recipient) {
        (Some(basis_points), Some(recipient)) => Some(ListingFee {
            recipient: recipient.clone(),
            basis_points: *basis_points,
        }),
        (None, None) => None,
        _ => bail!("--fee-bps and --fee-recipient must be given together"),
    };
    Ok(Listing {
        token,
        wei_price: cmd.wei_price.clone(),
        order_kind,
        orderbook,
        expiration,
        fee,
    })
}

fn init_tracing(config: &config::LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .init();
    } else {
        fmt().with_env_filter(filter).init();
    }
    Ok(())
}
