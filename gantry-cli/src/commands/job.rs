//! Job command handlers
//!
//! Handles job queries and the lifecycle verbs (submit, cancel, requeue,
//! finish), optionally watching a job to completion after a verb.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use std::time::Duration;

use gantry_client::ClusterClient;
use gantry_core::domain::job::{Job, JobState};
use gantry_watch::{ClusterOps, WatchStream};

use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Show a job
    Show {
        /// Job id
        id: u64,

        /// Print raw JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// List all jobs
    List {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Submit a job to the queue
    Submit {
        /// Job id
        id: u64,

        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Cancel a job
    Cancel {
        /// Job id
        id: u64,

        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Requeue a failed or canceled job
    Requeue {
        /// Job id
        id: u64,

        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Finish a running job ahead of its tasks
    Finish {
        /// Job id
        id: u64,

        #[command(flatten)]
        watch: WatchArgs,
    },
}

/// Watch options shared by the job verbs
#[derive(clap::Args)]
pub struct WatchArgs {
    /// Keep polling the job until it reaches a terminal state
    #[arg(long)]
    watch: bool,

    /// Poll interval in seconds
    #[arg(long, default_value_t = 2)]
    interval_secs: u64,

    /// Give up after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = ClusterClient::new(&config.cluster_url);

    match command {
        JobCommands::Show { id, json } => show_job(&client, id, json).await,
        JobCommands::List { json } => list_jobs(&client, json).await,
        JobCommands::Submit { id, watch } => run_verb(client, Verb::Submit, id, watch).await,
        JobCommands::Cancel { id, watch } => run_verb(client, Verb::Cancel, id, watch).await,
        JobCommands::Requeue { id, watch } => run_verb(client, Verb::Requeue, id, watch).await,
        JobCommands::Finish { id, watch } => run_verb(client, Verb::Finish, id, watch).await,
    }
}

#[derive(Clone, Copy)]
enum Verb {
    Submit,
    Cancel,
    Requeue,
    Finish,
}

impl Verb {
    fn name(self) -> &'static str {
        match self {
            Verb::Submit => "submit",
            Verb::Cancel => "cancel",
            Verb::Requeue => "requeue",
            Verb::Finish => "finish",
        }
    }
}

async fn show_job(client: &ClusterClient, id: u64, json: bool) -> Result<()> {
    let job = client.get_job(id).await?;
    print_job(&job, json)
}

async fn list_jobs(client: &ClusterClient, json: bool) -> Result<()> {
    let jobs = client.list_jobs().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<8} {:<12} {:<24} {}", "ID", "STATE", "NAME", "OWNER").bold()
    );
    for job in jobs {
        println!(
            "{:<8} {:<12} {:<24} {}",
            job.id,
            colorize_job_state(&job.state),
            job.name.as_deref().unwrap_or("-"),
            job.owner.as_deref().unwrap_or("-").dimmed()
        );
    }
    Ok(())
}

/// Fire a job verb, watching it to completion when asked
async fn run_verb(client: ClusterClient, verb: Verb, id: u64, watch: WatchArgs) -> Result<()> {
    if !watch.watch {
        match verb {
            Verb::Submit => client.submit_job(id).await?,
            Verb::Cancel => client.cancel_job(id).await?,
            Verb::Requeue => client.requeue_job(id).await?,
            Verb::Finish => client.finish_job(id).await?,
        }
        println!("{}", format!("Requested {} for job {}.", verb.name(), id).green());
        return Ok(());
    }

    let ops = ClusterOps::new(client);
    let interval = Duration::from_secs(watch.interval_secs);
    let expiration = watch.timeout_secs.map(Duration::from_secs);

    println!(
        "{}",
        format!("Requested {} for job {}, watching...", verb.name(), id).bold()
    );

    let stream = match verb {
        Verb::Submit => ops.submit_job_and_watch(id, interval, expiration).await?,
        Verb::Cancel => ops.cancel_job_and_watch(id, interval, expiration).await?,
        Verb::Requeue => ops.requeue_job_and_watch(id, interval, expiration).await?,
        Verb::Finish => ops.finish_job_and_watch(id, interval, expiration).await?,
    };

    follow_job(stream).await
}

/// Print each snapshot until the watch ends, then summarize
async fn follow_job(mut stream: WatchStream<Job>) -> Result<()> {
    let mut last: Option<Job> = None;
    while let Some(job) = stream.next().await {
        println!(
            "  {} job {} {}",
            "▸".cyan(),
            job.id,
            colorize_job_state(&job.state)
        );
        last = Some(job);
    }

    match last {
        Some(job) if job.ended() => {
            println!("{}", format!("Job {} ended: {}.", job.id, job.state).green());
        }
        Some(job) => {
            println!(
                "{}",
                format!("Timed out; job {} is still {}.", job.id, job.state).yellow()
            );
        }
        None => println!("{}", "No job updates received.".yellow()),
    }
    Ok(())
}

fn print_job(job: &Job, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(job)?);
        return Ok(());
    }

    println!("  {} Job {}", "▸".cyan(), job.id.to_string().bold());
    println!("    State:        {}", colorize_job_state(&job.state));
    println!("    Name:         {}", job.name.as_deref().unwrap_or("-"));
    println!("    Owner:        {}", job.owner.as_deref().unwrap_or("-"));
    if let Some(t) = job.submit_time {
        println!(
            "    Submitted:    {}",
            t.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    if let Some(t) = job.start_time {
        println!(
            "    Started:      {}",
            t.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    if let Some(t) = job.end_time {
        println!(
            "    Ended:        {}",
            t.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    Ok(())
}

/// Colorize a job state for display
fn colorize_job_state(state: &JobState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        JobState::Finished => text.green(),
        JobState::Failed => text.red(),
        JobState::Canceled | JobState::Canceling => text.yellow(),
        JobState::Running | JobState::Finishing => text.cyan(),
        JobState::Queued | JobState::Submitted | JobState::Validating | JobState::Configuring => {
            text.normal()
        }
        JobState::Unknown => text.dimmed(),
    }
}
