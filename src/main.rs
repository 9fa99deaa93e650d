// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use spotq::config;
use spotq::logging;
use spotq::prelude::*;
use spotq::server;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Local download server for the spotq browser plugin.
#[derive(Debug, Parser)]
#[command(name = "spotq")]
#[command(about = "Queue track downloads requested by the browser plugin", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.config/spotq/config.toml.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the listening port.
    #[arg(long)]
    port: Option<u16>,

    /// Override how many downloads may run at once.
    #[arg(long, value_name = "N")]
    max_concurrent: Option<usize>,
}

#[tokio::main]
async fn main() {
    logging::init_logging();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("spotq error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = match cli.config {
        Some(path) => path,
        None => config::config_path()?,
    };
    let mut cfg = config::load_or_init(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    if let Some(port) = cli.port {
        cfg.server_port = port;
    }
    if let Some(n) = cli.max_concurrent {
        cfg.max_concurrent_downloads = n;
    }
    cfg.validate(&path)?;
    cfg.ensure_download_directory()?;

    let executor = SpotdlExecutor::new(&cfg.downloader_program)
        .with_output_template(cfg.output_template.clone());
    let queue = DownloadQueue::new(Arc::new(executor), cfg.max_concurrent_downloads);

    let http = reqwest::Client::builder()
        .user_agent(concat!("spotq/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let catalog = CatalogClient::with_api_base(http, cfg.catalog_api_base.clone())
        .with_market(cfg.artist_market.clone());

    let manager = Arc::new(DownloadManager::new(
        queue,
        catalog,
        cfg.download_directory.clone(),
    ));

    let addr = format!("{}:{}", cfg.bind_address, cfg.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down server...");
            signal.cancel();
        }
    });

    server::serve(listener, manager, shutdown).await?;
    Ok(())
}
