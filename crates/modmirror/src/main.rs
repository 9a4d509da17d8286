use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use modmirror::{Cli, Config, Crawler, reporter, shutdown};
use modmirror_counters::Counters;
use modmirror_fetch::ReqwestClient;
use modmirror_store::ContentStore;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::try_from(Cli::parse())?;
    init_tracing(config.log_json);
    info!(
        dir = %config.dir.display(),
        index = %config.index_url,
        proxy = %config.proxy_url,
        limit = config.limit,
        "starting modmirror"
    );

    let counters = Arc::new(Counters::new());
    let store = ContentStore::open(&config.dir, Arc::clone(&counters))
        .with_context(|| format!("failed to open store in {}", config.dir.display()))?;
    let client = ReqwestClient::new().context("failed to build HTTP client")?;

    let token = CancellationToken::new();
    let signals = shutdown::spawn_signal_listener(token.clone());
    let reporter = tokio::spawn(reporter::run(
        Arc::clone(&counters),
        config.report_interval,
        token.clone(),
    ));

    let crawler = Crawler::new(&config, Arc::new(client), Arc::new(store), token.clone())?;
    let summary = crawler.run().await;

    token.cancel();
    let _ = tokio::join!(signals, reporter);
    info!(
        cursor = %summary.cursor,
        abandoned = summary.abandoned,
        "stopped: {}",
        counters.snapshot()
    );
    Ok(())
}
