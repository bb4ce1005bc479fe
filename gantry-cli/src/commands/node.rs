//! Node command handlers
//!
//! Handles node listing and the online/offline operations, including the
//! convergence watch that follows an operation.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use std::time::Duration;

use gantry_client::ClusterClient;
use gantry_core::domain::node::{Node, NodeOperation, NodeState};
use gantry_watch::ClusterOps;

use crate::config::Config;

/// Node subcommands
#[derive(Subcommand)]
pub enum NodeCommands {
    /// List cluster nodes
    List {
        /// Only show nodes in this node group
        #[arg(long)]
        group: Option<String>,

        /// Keep polling and reprinting until interrupted
        #[arg(long)]
        watch: bool,

        /// Poll interval in seconds
        #[arg(long, default_value_t = 2)]
        interval_secs: u64,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Bring nodes online and watch until they get there
    Online {
        /// Node names
        #[arg(required = true)]
        names: Vec<String>,

        /// Poll interval in seconds
        #[arg(long, default_value_t = 2)]
        interval_secs: u64,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Take nodes offline and watch until they get there
    Offline {
        /// Node names
        #[arg(required = true)]
        names: Vec<String>,

        /// Poll interval in seconds
        #[arg(long, default_value_t = 2)]
        interval_secs: u64,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

/// Handle node commands
pub async fn handle_node_command(command: NodeCommands, config: &Config) -> Result<()> {
    let client = ClusterClient::new(&config.cluster_url);

    match command {
        NodeCommands::List {
            group,
            watch,
            interval_secs,
            json,
        } => list_nodes(&client, group, watch, interval_secs, json).await,
        NodeCommands::Online {
            names,
            interval_secs,
            timeout_secs,
        } => {
            operate_nodes(
                client,
                NodeOperation::Online,
                names,
                interval_secs,
                timeout_secs,
            )
            .await
        }
        NodeCommands::Offline {
            names,
            interval_secs,
            timeout_secs,
        } => {
            operate_nodes(
                client,
                NodeOperation::Offline,
                names,
                interval_secs,
                timeout_secs,
            )
            .await
        }
    }
}

/// List nodes once, or keep polling with --watch
async fn list_nodes(
    client: &ClusterClient,
    group: Option<String>,
    watch: bool,
    interval_secs: u64,
    json: bool,
) -> Result<()> {
    if watch {
        let ops = ClusterOps::new(client.clone());
        let mut stream = ops.watch_all_nodes(Duration::from_secs(interval_secs));

        while let Some(nodes) = stream.next().await {
            let nodes = filter_group(nodes, group.as_deref());
            print_nodes(&nodes, json)?;
            println!();
        }
        return Ok(());
    }

    let nodes = match &group {
        Some(group) => client.list_nodes_in_group(group).await?,
        None => client.list_nodes().await?,
    };
    print_nodes(&nodes, json)
}

/// Run a node state operation and watch the nodes until they converge
async fn operate_nodes(
    client: ClusterClient,
    operation: NodeOperation,
    names: Vec<String>,
    interval_secs: u64,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let target = operation.target_state();
    let ops = ClusterOps::new(client);

    println!(
        "{}",
        format!(
            "Requested {} for {} node(s), watching...",
            operation.verb(),
            names.len()
        )
        .bold()
    );

    let mut stream = ops
        .operate_nodes_and_watch(
            operation,
            names,
            Duration::from_secs(interval_secs),
            timeout_secs.map(Duration::from_secs),
        )
        .await?;

    let mut last_batch: Vec<Node> = Vec::new();
    while let Some(batch) = stream.next().await {
        for node in &batch {
            println!(
                "  {} {:<16} {}",
                "▸".cyan(),
                node.name,
                colorize_node_state(&node.state)
            );
        }
        println!();
        last_batch = batch;
    }

    // The watch ends silently on timeout; report stragglers ourselves.
    let pending: Vec<&str> = last_batch
        .iter()
        .filter(|node| node.state != target)
        .map(|node| node.name.as_str())
        .collect();

    if pending.is_empty() {
        println!("{}", format!("All nodes reached {}.", target).green());
    } else {
        println!(
            "{}",
            format!(
                "Timed out with {} node(s) not yet {}: {}",
                pending.len(),
                target,
                pending.join(", ")
            )
            .yellow()
        );
    }

    Ok(())
}

fn filter_group(nodes: Vec<Node>, group: Option<&str>) -> Vec<Node> {
    match group {
        Some(group) => nodes
            .into_iter()
            .filter(|node| node.node_groups.iter().any(|g| g == group))
            .collect(),
        None => nodes,
    }
}

/// Print a node table (or JSON with --json)
fn print_nodes(nodes: &[Node], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(nodes)?);
        return Ok(());
    }

    if nodes.is_empty() {
        println!("{}", "No nodes found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<16} {:<12} {:<10} {}", "NAME", "STATE", "CORES", "GROUPS").bold()
    );
    for node in nodes {
        let cores = node
            .num_cores
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<12} {:<10} {}",
            node.name,
            colorize_node_state(&node.state),
            cores,
            node.node_groups.join(",").dimmed()
        );
    }
    Ok(())
}

/// Colorize a node state for display
fn colorize_node_state(state: &NodeState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        NodeState::Online => text.green(),
        NodeState::Offline => text.red(),
        NodeState::Draining => text.yellow(),
        NodeState::Provisioning | NodeState::Starting => text.cyan(),
        NodeState::Unknown => text.dimmed(),
    }
}
