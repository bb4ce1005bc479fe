//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod node;

pub use job::JobCommands;
pub use node::NodeCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Node management
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },
    /// Job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Node { command } => node::handle_node_command(command, config).await,
        Commands::Job { command } => job::handle_job_command(command, config).await,
    }
}
