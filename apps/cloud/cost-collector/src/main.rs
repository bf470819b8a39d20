//! Cost Collector
//!
//! Prices running GCP resources from the Cloud Billing catalog. Runs once,
//! on a cron schedule, or answers a single price lookup.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::FromEnv;
use eyre::{Result, WrapErr};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

mod catalog;
mod collector;
mod config;
mod inventory;
mod lookup;

use collector::CostCollector;
use config::Config;
use lookup::LookupQuery;

#[derive(Parser)]
#[command(name = "cost-collector")]
#[command(about = "Price running GCP resources from the Cloud Billing catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh prices if due and price the inventory once
    Collect {
        /// Rebuild every catalog even if the snapshot is fresh
        #[arg(short, long)]
        force: bool,

        /// Print every priced and skipped resource
        #[arg(short, long)]
        verbose: bool,
    },

    /// Collect on a cron schedule and serve /metrics
    Schedule {
        /// Cron expression (default: hourly; the refresh interval still gates catalog rebuilds)
        #[arg(short, long, default_value = "0 0 * * * *")]
        cron: String,
    },

    /// Build a snapshot and print the price for one resource shape
    Lookup {
        #[command(subcommand)]
        query: LookupQuery,
    },
}

async fn serve_metrics(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind metrics listener on {addr}"))?;
    info!(%addr, "Serving /metrics");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, observability::metrics_router()).await {
            error!(error = %e, "Metrics server stopped");
        }
    });
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_tracing(&config.environment);
    observability::init_metrics(config.metrics_idle_timeout)?;

    let source = catalog::from_config(&config.catalog)?;
    let collector = CostCollector::new(&config, source);

    match cli.command {
        Commands::Collect { force, verbose } => {
            let (result, report) = collector.collect(force).await?;
            if verbose {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Schedule { cron } => {
            if let Some(listen) = config.metrics {
                serve_metrics(listen.addr).await?;
            }
            Arc::new(collector).run_scheduled(&cron).await?;
        }

        Commands::Lookup { query } => {
            let report = collector.refresh(true).await;
            if let Some(report) = report.filter(|r| !r.is_complete()) {
                for (kind, reason) in &report.failed {
                    error!(catalog = %kind, reason, "Catalog unavailable for lookup");
                }
            }

            let snapshot = collector.store().snapshot().await;
            let answer = lookup::lookup(&snapshot, query)?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
    }

    Ok(())
}
