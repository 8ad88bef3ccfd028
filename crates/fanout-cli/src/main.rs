//! Fanout CLI - run a distributed action job from the command line.
//!
//! Owners come from a JSON file, workers run in-process behind the
//! local transport, and actions go through the simulated executor. The
//! terminal [`fanout_core::JobResult`] is printed as JSON.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fanout_coordinator::{metrics, JobSupervisor, PoolConfig, PoolSnapshot, Workload};
use fanout_core::{validate_owners, ActionKind, JobReason, Owner, OwnerId};
use fanout_worker::{LocalTransport, WorkerConfig};

mod simulate;

use simulate::SimulatedExecutor;

/// Distribute rate-limited actions across owners and workers
#[derive(Parser)]
#[command(name = "fanout")]
#[command(about = "Distribute rate-limited actions across owners and workers", long_about = None)]
struct Cli {
    /// JSON file holding the owner records
    #[arg(short, long)]
    owners: PathBuf,

    /// Worker tasks to spawn
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Overall job ceiling in seconds
    #[arg(long, default_value_t = 900)]
    timeout_secs: u64,

    /// Probability of a simulated terminal rejection per call
    #[arg(long, default_value_t = 0.05)]
    fail_rate: f64,

    /// Probability of a simulated 429 per call
    #[arg(long, default_value_t = 0.02)]
    throttle_rate: f64,

    /// Print Prometheus metrics for the final state
    #[arg(long)]
    dump_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish posts from every owner
    Post {
        /// Posts per owner
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },

    /// Comment on a target from every owner
    Comment {
        /// Remote reference to comment on
        #[arg(short, long)]
        target_ref: String,

        /// Comments per owner
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },

    /// Like a target from every owner
    Like {
        /// Remote reference to like
        #[arg(short, long)]
        target_ref: String,
    },

    /// Owners like each other's posts
    #[command(name = "cross-like")]
    CrossLike {
        /// Likes each owner should give and receive
        #[arg(short, long, default_value_t = 3)]
        degree: usize,

        /// JSON object mapping owner ids to their target refs;
        /// simulated refs are synthesized when omitted
        #[arg(long)]
        targets: Option<PathBuf>,
    },

    /// Answer a knowledge target from every owner
    Know {
        /// Remote reference to answer
        #[arg(short, long)]
        target_ref: String,
    },

    /// Delete a target post from every owner
    Delete {
        /// Remote reference to delete
        #[arg(short, long)]
        target_ref: String,
    },
}

impl Commands {
    fn workload(&self, owners: &[Owner]) -> Result<Workload, Box<dyn std::error::Error>> {
        let workload = match self {
            Self::Post { count } => Workload::PerOwner {
                kind: ActionKind::Post,
                count: *count,
                target_ref: None,
            },
            Self::Comment { target_ref, count } => Workload::PerOwner {
                kind: ActionKind::Comment,
                count: *count,
                target_ref: Some(target_ref.clone()),
            },
            Self::Like { target_ref } => Workload::PerOwner {
                kind: ActionKind::Like,
                count: 1,
                target_ref: Some(target_ref.clone()),
            },
            Self::Know { target_ref } => Workload::PerOwner {
                kind: ActionKind::Know,
                count: 1,
                target_ref: Some(target_ref.clone()),
            },
            Self::Delete { target_ref } => Workload::PerOwner {
                kind: ActionKind::Delete,
                count: 1,
                target_ref: Some(target_ref.clone()),
            },
            Self::CrossLike { degree, targets } => {
                let target_refs: HashMap<OwnerId, String> = match targets {
                    Some(path) => {
                        let raw = std::fs::read_to_string(path)?;
                        serde_json::from_str(&raw)?
                    }
                    None => owners
                        .iter()
                        .map(|o| (o.id.clone(), format!("sim-post-{}", o.id)))
                        .collect(),
                };
                Workload::CrossLike {
                    degree: *degree,
                    target_refs,
                }
            }
        };
        Ok(workload)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let raw = std::fs::read_to_string(&cli.owners)?;
    let owners: Vec<Owner> = serde_json::from_str(&raw)?;
    validate_owners(&owners)?;
    info!(owners = owners.len(), "Owners loaded");

    let workload = cli.command.workload(&owners)?;

    let config = PoolConfig {
        worker_count: cli.workers,
        job_timeout: Duration::from_secs(cli.timeout_secs),
        ..PoolConfig::default()
    };
    let executor = Arc::new(SimulatedExecutor {
        fail_rate: cli.fail_rate,
        throttle_rate: cli.throttle_rate,
    });
    let transport = LocalTransport::new(WorkerConfig::default(), executor);

    let supervisor =
        JobSupervisor::start(config, Box::new(transport), &owners, &workload).await?;

    let stop = supervisor.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop("interrupted");
        }
    });

    let result = supervisor.wait().await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if cli.dump_metrics {
        let snapshot = PoolSnapshot {
            phase: result.reason.phase(),
            progress: result.progress.clone(),
            busy_workers: 0,
            total_workers: cli.workers,
        };
        println!("{}", metrics::collect_metrics(&snapshot));
    }

    if result.reason != JobReason::Completed {
        std::process::exit(1);
    }
    Ok(())
}
