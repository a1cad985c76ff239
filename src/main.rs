//! Inventory Guard
//!
//! A warehouse inventory service that stays correct under concurrent updates
//! and stays responsive while its pricing vendor misbehaves.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──┬──▶ inventory service ──▶ ledger (versioned rows, CAS)
//!                                   │
//!                                   └──▶ vendor client ──▶ circuit breaker ──▶ retry policy
//!                                                                                 │
//!                                                       deadline ◀────────────────┘
//!                                                          │
//!                                                          ▼
//!                                                   vendor (HTTP or /vendor-mock)
//!
//!     Cross-cutting: config (TOML + env), observability (tracing, Prometheus), lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;

use inventory_guard::config;
use inventory_guard::lifecycle;
use inventory_guard::observability::logging;

#[derive(Parser)]
#[command(name = "inventory-guard")]
#[command(about = "Warehouse inventory service with a resilient vendor client", long_about = None)]
struct Args {
    /// Path to a TOML config file; defaults apply when omitted
    #[arg(short, long, env = "INVENTORY_GUARD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = config::load(args.config.as_deref())?;
    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_file = ?args.config,
        "inventory-guard starting"
    );

    lifecycle::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
