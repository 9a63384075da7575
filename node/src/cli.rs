//! # CLI Interface
//!
//! Defines the command-line argument structure for `aurum-node` using
//! `clap` derive. Supports three subcommands: `run`, `status`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AURUM bank node.
///
/// Serves the custodial bank engine over a REST API, exposes Prometheus
/// metrics, and (on devnet) wires in simulated price-feed, venue, and
/// transfer collaborators so the engine runs without a chain attached.
#[derive(Parser, Debug)]
#[command(
    name = "aurum-node",
    about = "AURUM custodial bank node",
    version,
    propagate_version = true
)]
pub struct AurumNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the AURUM node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bank node.
    Run(RunArgs),
    /// Query the status of a running node via its RPC endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node data directory where the snapshot store lives.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "AURUM_DATA_DIR", default_value = "~/.aurum")]
    pub data_dir: PathBuf,

    /// Port for the REST API.
    #[arg(long, env = "AURUM_RPC_PORT", default_value_t = 9851)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "AURUM_METRICS_PORT", default_value_t = 9852)]
    pub metrics_port: u16,

    /// Bank-wide capacity ceiling in canonical (6-decimal) units.
    #[arg(long, env = "AURUM_BANK_CAP", default_value_t = 100_000_000_000_000)]
    pub bank_cap: u64,

    /// Per-operation withdrawal ceiling in canonical (6-decimal) units.
    #[arg(long, env = "AURUM_WITHDRAWAL_CEILING", default_value_t = 50_000_000_000)]
    pub withdrawal_ceiling: u64,

    /// Account authorized for admin operations.
    #[arg(
        long,
        env = "AURUM_ADMIN",
        default_value = "0xad00000000000000000000000000000000000000"
    )]
    pub admin: String,

    /// Settlement asset address (the asset conversions settle into).
    #[arg(
        long,
        env = "AURUM_SETTLEMENT",
        default_value = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"
    )]
    pub settlement: String,

    /// Simulated native-asset USD price, 8 fractional digits.
    /// Devnet only; production nodes read a real feed.
    #[arg(long, env = "AURUM_SIM_PRICE", default_value_t = 200_000_000_000)]
    pub sim_price: i64,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "AURUM_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Network label reported by /status (e.g., "devnet").
    #[arg(long, default_value = "devnet")]
    pub network: String,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// RPC endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9851")]
    pub rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        AurumNodeCli::command().debug_assert();
    }
}
