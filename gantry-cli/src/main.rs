//! Gantry CLI
//!
//! Operator console for a compute cluster: lists nodes, drives node state
//! operations and job lifecycle verbs, and watches either until the cluster
//! converges. All rendering lives here; the polling and convergence logic is
//! `gantry-watch`'s.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Gantry cluster console", long_about = None)]
struct Cli {
    /// Cluster API URL
    #[arg(
        long,
        env = "GANTRY_CLUSTER_URL",
        default_value = "http://localhost:8080"
    )]
    cluster_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gantry=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config {
        cluster_url: cli.cluster_url,
    };

    handle_command(cli.command, &config).await
}
