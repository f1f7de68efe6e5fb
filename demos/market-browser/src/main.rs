//! Read-only terminal browser for the sample marketplace.
//!
//! Connects to the configured node, replays the marketplace event log and
//! prints the catalog, per-tier license prices and marketplace totals.
//! Usage: `market-browser [config.toml]`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ethereum_types::U512;
use serde::Deserialize;

use sampled_connector::event_log::EventLog;
use sampled_connector::pricing::LicensePricing;
use sampled_connector::rpc::HttpNodeRpc;
use sampled_connector::views::MarketView;
use sampled_connector::ConnectorConfig;
use sampled_logger::LogConfig;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct BrowserConfig {
    #[serde(default)]
    connector: ConnectorConfig,
    #[serde(default)]
    log: LogConfig,
}

fn load_config(path: Option<&str>) -> Result<BrowserConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path));
    }
    builder = builder.add_source(config::Environment::with_prefix("SAMPLED").separator("__"));

    builder
        .build()
        .context("failed to assemble configuration")?
        .try_deserialize()
        .context("configuration has an invalid shape")
}

/// Motes to CSPR, for display only.
fn cspr(motes: U512) -> String {
    let whole = motes / U512::from(1_000_000_000u64);
    let frac = (motes % U512::from(1_000_000_000u64)) / U512::from(10_000_000u64);
    format!("{whole}.{:02} CSPR", frac.as_u64())
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args().nth(1);
    let config = load_config(path.as_deref())?;
    sampled_logger::init(&config.log)?;

    let contract_hash = config
        .connector
        .contracts
        .marketplace_hash
        .clone()
        .context("contracts.marketplace-hash is required")?;
    tracing::info!(
        rpc_url = %config.connector.node.rpc_url,
        %contract_hash,
        "browsing marketplace"
    );

    let rpc = Arc::new(HttpNodeRpc::new(config.connector.node.rpc_url.clone()));
    let view = MarketView::new(EventLog::new(
        rpc,
        contract_hash,
        Duration::from_secs(config.connector.node.state_root_ttl_secs),
    ));

    let catalog = view.catalog().await;
    let pricing = LicensePricing::default();
    println!("{} sample(s) listed\n", catalog.len());
    for sample in &catalog {
        let licenses = pricing.all_prices(sample.price);
        println!(
            "#{} {:30} {:>18}  {} bpm  [{}]{}",
            sample.sample_id,
            sample.title,
            cspr(sample.price),
            sample.bpm,
            sample.genre,
            if sample.is_active { "" } else { "  (inactive)" },
        );
        println!(
            "     seller {}  sales {}  licenses: personal {} / commercial {} / broadcast {} / exclusive {}",
            sample.seller,
            sample.total_sales,
            cspr(licenses.personal),
            cspr(licenses.commercial),
            cspr(licenses.broadcast),
            cspr(licenses.exclusive),
        );
    }

    let stats = view.stats().await;
    println!(
        "\ntotals: {} uploads, {} purchases, volume {}, platform fees {}",
        stats.total_uploads,
        stats.total_purchases,
        cspr(stats.total_volume),
        cspr(stats.platform_fee_collected),
    );

    Ok(())
}
