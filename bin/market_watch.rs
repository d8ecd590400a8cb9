//! # Market Watch Service
//!
//! Console client that connects a wallet session to the NFT marketplace and
//! renders listed items, owned items, and the current listing fee.
//!
//! ## Overview
//!
//! This service:
//! - Connects the dependency container against a JSON-RPC endpoint
//! - Serves marketplace reads through the shared query cache
//! - Optionally keeps following the market (configurable via `--follow-seconds`)
//! - Handles graceful shutdown on Ctrl+C
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin market_watch -- --rpc-url http://localhost:8545
//! ```
//!
//! Press Ctrl+C to stop gracefully.

use nft_market_sdk::{
    artifacts::ArtifactLoader,
    dependencies::DependencyContainer,
    gateway::ChainGateway,
    hooks::{self, HookBundle},
    metadata::MetadataClient,
    query_cache::QueryCache,
    settings::Settings,
    transactions::{LogNotifier, MutationExecutor},
    wallet::StaticWallet,
};
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use ethers::prelude::{Http, Middleware, Provider};
use ethers::types::Address;
use std::str::FromStr;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval_at, Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "market_watch", about = "Console viewer for the NFT marketplace")]
struct Args {
    /// JSON-RPC endpoint of the chain node
    #[arg(long, default_value = "http://localhost:8545")]
    rpc_url: String,

    /// Account to browse as; defaults to the node's first unlocked account
    #[arg(long)]
    account: Option<String>,

    /// Directory holding deployment artifacts (overrides configuration)
    #[arg(long)]
    artifacts_dir: Option<String>,

    /// Refresh the view every N seconds instead of exiting after one render
    #[arg(long)]
    follow_seconds: Option<u64>,
}

#[cfg(feature = "observability")]
fn init_logging(settings: &Settings) {
    let level =
        tracing::Level::from_str(&settings.log.level).unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().json().with_max_level(level).init();
}

#[cfg(not(feature = "observability"))]
fn init_logging(settings: &Settings) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log.level.clone()),
    )
    .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = Args::parse();

    println!("🚀 Starting Market Watch Service");
    println!("═══════════════════════════════════════════════════════════════════\n");

    // 1. Load settings
    let mut settings = Settings::new()?;
    if let Some(dir) = args.artifacts_dir {
        settings.artifacts.base_dir = dir;
    }
    init_logging(&settings);
    println!("✅ Settings loaded");

    #[cfg(feature = "observability")]
    {
        metrics_exporter_prometheus::PrometheusBuilder::new().install()?;
        nft_market_sdk::metrics::describe_metrics();
        println!("✅ Prometheus exporter installed");
    }

    // 2. Connect the RPC provider
    let provider = Arc::new(Provider::<Http>::try_from(args.rpc_url.as_str())?);
    let chain_id = provider.get_chainid().await?.as_u64();
    println!("✅ Provider connected (chain {})", chain_id);

    // 3. Resolve the browsing account
    let account = match args.account.as_deref() {
        Some(raw) => Address::from_str(raw)?,
        None => provider
            .get_accounts()
            .await?
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("node exposes no accounts; pass --account"))?,
    };
    println!("✅ Browsing as {:#x}", account);

    // 4. Wallet session and gateway
    let wallet = Arc::new(StaticWallet::new(vec![account], chain_id));
    let gateway = ChainGateway::new(Arc::clone(&provider)).with_wallet(wallet);
    println!("✅ Wallet session created");

    // 5. Shared services
    let cache = QueryCache::new(settings.cache.persist_idle);
    let metadata = Arc::new(MetadataClient::new(
        settings.metadata.request_timeout(),
        settings.metadata.cache_capacity,
    ));
    let executor = Arc::new(MutationExecutor::new(Arc::new(LogNotifier)));
    let artifacts = ArtifactLoader::new(settings.artifacts.base_dir.clone());

    // 6. Dependency container
    let container =
        DependencyContainer::new(gateway, artifacts, Arc::clone(&cache), &settings);
    let event_loop = container.spawn_event_loop()?;
    let snapshot = container.connect().await?;
    println!(
        "✅ Connected to {} at {:#x}",
        settings.artifacts.contract_name,
        snapshot.contract_address().unwrap_or_default()
    );

    println!("\n📊 Service Configuration:");
    println!("   RPC endpoint: {}", args.rpc_url);
    println!("   Target chain: {}", settings.network.target_chain_id);
    println!("   Artifacts dir: {}", settings.artifacts.base_dir);

    // 7. First render
    let bundle = hooks::build(
        Arc::clone(&snapshot),
        container.query_cache(),
        Arc::clone(&metadata),
        Arc::clone(&executor),
        &settings,
    );
    let _watch = bundle.watch_listed_nfts();
    render(&bundle).await;

    // 8. Follow mode: rebuild the bundle from the latest snapshot on each tick
    let refresh_handle = args.follow_seconds.map(|seconds| {
        println!("\n💡 Following the market (refresh every {} seconds)", seconds);
        let container = Arc::clone(&container);
        let metadata = Arc::clone(&metadata);
        let executor = Arc::clone(&executor);
        let settings = settings.clone();
        tokio::spawn(async move {
            let period = Duration::from_secs(seconds);
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                println!("🔄 Refreshing market view...");
                let bundle = hooks::build(
                    container.snapshot(),
                    container.query_cache(),
                    Arc::clone(&metadata),
                    Arc::clone(&executor),
                    &settings,
                );
                bundle.revalidate_reads();
                render(&bundle).await;
            }
        })
    });

    if let Some(handle) = refresh_handle {
        println!("\nPress Ctrl+C to stop gracefully...\n");
        signal::ctrl_c().await?;
        println!("\n🛑 Shutdown signal received, stopping tasks...");
        handle.abort();
        event_loop.abort();
        println!("✅ Shutdown complete");
    } else {
        event_loop.abort();
    }

    Ok(())
}

/// Renders one market snapshot to the console.
async fn render(bundle: &HookBundle<Provider<Http>>) {
    println!("\n📊 Market Snapshot:");

    match bundle.use_network().await.data {
        Some(network) if network.is_connected_to_network => {
            println!("   Network: {} ({})", network.network_name, "ok".green());
        }
        Some(network) if network.is_loading => {
            println!("   Network: {}", "detecting...".yellow());
        }
        Some(network) => {
            println!(
                "   Network: {} ({} {})",
                network.network_name,
                "expected".red(),
                network.target_network
            );
        }
        None => println!("   Network: {}", "unavailable".yellow()),
    }

    if let Some(price) = bundle.use_listing_price().await.data {
        println!("   Listing fee: {} ETH", price);
    }

    let listed = bundle.use_listed_nfts().await;
    match (&listed.data, &listed.error) {
        (Some(nfts), _) => {
            println!("   Listed items: {}", nfts.len());
            for nft in nfts.iter() {
                println!(
                    "     #{} {} at {} ETH (creator {:#x})",
                    nft.token_id,
                    nft.meta.name.bold(),
                    nft.price,
                    nft.creator
                );
            }
        }
        (None, Some(e)) => println!("   Listed items: {} ({})", "error".red(), e),
        (None, None) => println!("   Listed items: {}", "loading".yellow()),
    }

    let owned = bundle.use_owned_nfts().await;
    match (&owned.data, &owned.error) {
        (Some(nfts), _) => {
            println!("   Owned items: {}", nfts.len());
            for nft in nfts.iter() {
                let status = if nft.is_listed {
                    "listed".green()
                } else {
                    "not listed".normal()
                };
                println!("     #{} {} ({})", nft.token_id, nft.meta.name.bold(), status);
            }
        }
        (None, Some(e)) => println!("   Owned items: {} ({})", "error".red(), e),
        (None, None) => println!("   Owned items: {}", "loading".yellow()),
    }
}
