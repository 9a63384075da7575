// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # AURUM Bank Node
//!
//! Entry point for the `aurum-node` binary. Parses CLI arguments,
//! initializes logging and metrics, wires the bank engine to its
//! collaborators, restores the snapshot store, and serves the REST API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     -- start the bank node
//! - `status`  -- query a running node's status endpoint
//! - `version` -- print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod sim;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use aurum_bank::asset::{AssetId, AssetMetadata, AssetTransfer};
use aurum_bank::bank::{Bank, BankConfig};
use aurum_bank::exchange::SwapVenue;
use aurum_bank::ledger::Limits;
use aurum_bank::oracle::PriceFeed;
use aurum_bank::storage::BankStore;

use cli::{AurumNodeCli, Commands};
use logging::LogFormat;
use metrics::BankMetrics;
use sim::{SimMetadata, SimPriceFeed, SimTransferAgent, SimVenue};

/// The bank's custody account on devnet. Production deployments derive
/// this from the custody wallet, not from a constant.
const DEVNET_CUSTODY: &str = "0xcc00000000000000000000000000000000000000";

/// Fill rate of the simulated venue: 99.5% of quote, modeling fees and
/// impact.
const SIM_FILL_RATE_BPS: u128 = 9_950;

/// How often the background task refreshes the total-value gauge and
/// persists a snapshot.
const HOUSEKEEPING_INTERVAL_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AurumNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full bank node: engine, API server, metrics endpoint, and
/// the housekeeping loop.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "aurum_node=info,aurum_bank=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        network = %args.network,
        "starting aurum-node"
    );

    let settlement: AssetId = args
        .settlement
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid settlement asset: {e}"))?;

    // --- Devnet collaborators ---
    // Stand-ins for the chain: a fresh advancing price feed, an
    // in-memory transfer agent, and a venue filling slightly under
    // quote. Production integrations replace these behind the same
    // traits.
    let feed = SimPriceFeed::new(i128::from(args.sim_price));
    let transfers = SimTransferAgent::new(DEVNET_CUSTODY);
    let venue = SimVenue::new(Arc::clone(&transfers), SIM_FILL_RATE_BPS);

    // --- Bank engine ---
    let bank = Bank::new(
        BankConfig::new(
            args.admin.clone(),
            DEVNET_CUSTODY,
            settlement,
            Limits::new(
                u128::from(args.bank_cap),
                u128::from(args.withdrawal_ceiling),
            ),
        ),
        Arc::new(SimMetadata) as Arc<dyn AssetMetadata>,
        Arc::clone(&feed) as Arc<dyn PriceFeed>,
        venue as Arc<dyn SwapVenue>,
        Arc::clone(&transfers) as Arc<dyn AssetTransfer>,
    )
    .await
    .context("failed to construct the bank engine")?;
    let bank = Arc::new(bank);

    // --- Snapshot store ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let store = Arc::new(
        BankStore::open(&db_path)
            .with_context(|| format!("failed to open snapshot store at {}", db_path.display()))?,
    );
    match store.load().context("failed to load snapshot")? {
        Some(snapshot) => {
            bank.restore_snapshot(snapshot);
            tracing::info!(total_value = bank.total_value(), "snapshot restored");
        }
        None => tracing::info!("no snapshot found; starting with empty books"),
    }

    // --- Metrics ---
    let bank_metrics = Arc::new(BankMetrics::new());
    bank_metrics.set_total_value(bank.total_value());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (engine {})",
            env!("CARGO_PKG_VERSION"),
            aurum_bank::config::ENGINE_VERSION,
        ),
        network: args.network.clone(),
        bank: Arc::clone(&bank),
        metrics: Arc::clone(&bank_metrics),
        faucet: Some(Arc::clone(&transfers)),
        started_at: chrono::Utc::now(),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("REST API listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&bank_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("metrics server listening on {}", metrics_addr);

    // --- Housekeeping loop ---
    // Refreshes the total-value gauge and persists a snapshot on a
    // fixed cadence, so a crash loses at most one interval of counter
    // history (balances are also snapshotted on clean shutdown below).
    let housekeeping_bank = Arc::clone(&bank);
    let housekeeping_store = Arc::clone(&store);
    let housekeeping_metrics = Arc::clone(&bank_metrics);
    let housekeeping = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            HOUSEKEEPING_INTERVAL_SECS,
        ));
        loop {
            interval.tick().await;
            housekeeping_metrics.set_total_value(housekeeping_bank.total_value());
            if let Err(e) = housekeeping_store.save(&housekeeping_bank.snapshot()) {
                tracing::error!("periodic snapshot failed: {}", e);
            }
        }
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    housekeeping.abort();
    store
        .save(&bank.snapshot())
        .context("final snapshot failed")?;
    tracing::info!("aurum-node stopped");
    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.rpc_url.trim_end_matches('/'));
    let body = http_get(&url).await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP GET over a raw TCP stream -- just enough for the status
/// subcommand without pulling an HTTP client into the binary.
async fn http_get(url: &str) -> Result<String> {
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| anyhow::anyhow!("only http:// URLs are supported: {url}"))?;
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let addr = if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{authority}:80")
    };

    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let host = authority.split(':').next().unwrap_or(authority);
    let request =
        format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    // Everything after the first blank line is the body.
    Ok(response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string()))
}

/// Prints version information to stdout.
fn print_version() {
    println!("aurum-node {}", env!("CARGO_PKG_VERSION"));
    println!("engine     {}", aurum_bank::config::ENGINE_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
