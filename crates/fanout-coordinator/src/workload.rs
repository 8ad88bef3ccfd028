//! Workload definitions and shard planning.
//!
//! Turns a job description plus the owner list into per-worker shards.
//! Pure with respect to the pool: no transport, no channels, so the
//! partitioning rules are testable on their own.

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use fanout_core::{ActionKind, ActionSpec, Owner, OwnerId};
use fanout_engine::planner::{self, DistributionReport, PlanError};
use fanout_proto::{Assignment, WorkerShard};

/// What a job should do.
#[derive(Debug, Clone)]
pub enum Workload {
    /// Every owner performs `count` actions of one kind.
    PerOwner {
        kind: ActionKind,
        count: u32,
        /// Shared remote reference for kinds that act on a target
        /// (comment, like, know, delete). Posts need none.
        target_ref: Option<String>,
    },

    /// Owners act on each other's targets: each owner both gives and
    /// receives close to `degree` actions.
    CrossLike {
        degree: usize,
        /// The target reference (e.g. first post id) per owner.
        /// Owners missing here are skipped as targets, with a warning.
        target_refs: HashMap<OwnerId, String>,
    },
}

/// Shard planning failures.
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// The owner list is empty.
    #[error("no owners to distribute")]
    NoOwners,

    /// No workers to distribute onto.
    #[error("no active workers")]
    NoWorkers,

    /// The action kind requires a target reference.
    #[error("workload kind '{0}' requires a target_ref")]
    MissingTargetRef(ActionKind),

    /// Cross-like must go through `Workload::CrossLike`.
    #[error("kind '{0}' is not a per-owner workload")]
    NotPerOwner(ActionKind),

    /// The cross planner rejected the request.
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// The result of shard planning.
#[derive(Debug)]
pub struct ShardPlan {
    /// One shard per worker, in worker order. Surplus workers receive
    /// explicitly empty shards.
    pub shards: Vec<WorkerShard>,

    /// Total actions across all shards.
    pub total: u64,

    /// Planner diagnostics for cross workloads.
    pub distribution: Option<DistributionReport>,
}

/// Partition `owners` under `workload` across `worker_count` workers.
pub fn plan_shards(
    owners: &[Owner],
    workload: &Workload,
    worker_count: usize,
    min_owners_per_worker: usize,
) -> Result<ShardPlan, WorkloadError> {
    if owners.is_empty() {
        return Err(WorkloadError::NoOwners);
    }
    if worker_count == 0 {
        return Err(WorkloadError::NoWorkers);
    }

    // More workers than the pool can feed wastes resources; say so.
    let recommended = owners.len().div_ceil(50).max(1);
    if worker_count > recommended * 2 {
        warn!(
            workers = worker_count,
            owners = owners.len(),
            recommended,
            "Far more workers than the owner pool warrants"
        );
    }

    match workload {
        Workload::PerOwner {
            kind,
            count,
            target_ref,
        } => plan_per_owner(owners, *kind, *count, target_ref.as_deref(), worker_count),
        Workload::CrossLike {
            degree,
            target_refs,
        } => plan_cross(
            owners,
            *degree,
            target_refs,
            worker_count,
            min_owners_per_worker,
        ),
    }
}

fn per_owner_spec(
    kind: ActionKind,
    index: u32,
    target_ref: Option<&str>,
) -> Result<ActionSpec, WorkloadError> {
    let require_target = || {
        target_ref
            .map(str::to_owned)
            .ok_or(WorkloadError::MissingTargetRef(kind))
    };
    match kind {
        ActionKind::Post => Ok(ActionSpec::Post { index }),
        ActionKind::Comment => Ok(ActionSpec::Comment {
            target_ref: require_target()?,
        }),
        ActionKind::Like => Ok(ActionSpec::Like {
            target_ref: require_target()?,
        }),
        ActionKind::Know => Ok(ActionSpec::Know {
            target_ref: require_target()?,
        }),
        ActionKind::Delete => Ok(ActionSpec::Delete {
            target_ref: require_target()?,
        }),
        ActionKind::CrossLike => Err(WorkloadError::NotPerOwner(kind)),
    }
}

/// Contiguous slices of `ceil(N / workers)` owners, each owner
/// performing `count` actions. Surplus workers get empty shards.
fn plan_per_owner(
    owners: &[Owner],
    kind: ActionKind,
    count: u32,
    target_ref: Option<&str>,
    worker_count: usize,
) -> Result<ShardPlan, WorkloadError> {
    let per_worker = owners.len().div_ceil(worker_count).max(1);
    let mut shards = Vec::with_capacity(worker_count);
    let mut total = 0u64;

    for chunk_start in (0..worker_count).map(|i| i * per_worker) {
        if chunk_start >= owners.len() {
            shards.push(WorkerShard::empty());
            continue;
        }
        let chunk = &owners[chunk_start..owners.len().min(chunk_start + per_worker)];

        let mut assignments = Vec::with_capacity(chunk.len() * count as usize);
        for owner in chunk {
            for index in 0..count {
                assignments.push(Assignment::new(
                    owner.id.clone(),
                    per_owner_spec(kind, index, target_ref)?,
                ));
            }
        }
        total += assignments.len() as u64;
        shards.push(WorkerShard::new(chunk.to_vec(), assignments));
    }

    Ok(ShardPlan {
        shards,
        total,
        distribution: None,
    })
}

/// Plan the cross graph, then spread each source's actions round-robin
/// so one owner's work lands on different workers instead of
/// serializing on a single queue.
fn plan_cross(
    owners: &[Owner],
    degree: usize,
    target_refs: &HashMap<OwnerId, String>,
    worker_count: usize,
    min_owners_per_worker: usize,
) -> Result<ShardPlan, WorkloadError> {
    let ids: Vec<OwnerId> = owners.iter().map(|o| o.id.clone()).collect();
    let plan = planner::plan(&ids, degree)?;

    let mut by_source: HashMap<&OwnerId, Vec<Assignment>> = HashMap::new();
    let mut skipped = 0usize;
    for edge in &plan.edges {
        let Some(target_ref) = target_refs.get(&edge.to) else {
            skipped += 1;
            continue;
        };
        by_source.entry(&edge.from).or_default().push(Assignment::new(
            edge.from.clone(),
            ActionSpec::CrossLike {
                target_owner: edge.to.clone(),
                target_ref: target_ref.clone(),
            },
        ));
    }
    if skipped > 0 {
        warn!(skipped, "Cross targets without a target ref were skipped");
    }

    // Only as many workers as the pool warrants.
    let workers_used = worker_count
        .min(owners.len().div_ceil(min_owners_per_worker))
        .max(1);

    let max_per_source = by_source.values().map(Vec::len).max().unwrap_or(0);
    let mut batches: Vec<Vec<Assignment>> = vec![Vec::new(); workers_used];
    for round in 0..max_per_source {
        let mut worker_idx = round % workers_used;
        for owner in &ids {
            if let Some(tasks) = by_source.get_mut(&owner) {
                if round < tasks.len() {
                    batches[worker_idx].push(tasks[round].clone());
                    worker_idx = (worker_idx + 1) % workers_used;
                }
            }
        }
    }

    let mut shards = Vec::with_capacity(worker_count);
    let mut total = 0u64;
    for batch in batches {
        total += batch.len() as u64;
        let mut shard_owner_ids: Vec<&OwnerId> = batch.iter().map(|a| &a.owner).collect();
        shard_owner_ids.sort();
        shard_owner_ids.dedup();
        let shard_owners = owners
            .iter()
            .filter(|o| shard_owner_ids.binary_search(&&o.id).is_ok())
            .cloned()
            .collect();
        shards.push(WorkerShard::new(shard_owners, batch));
    }
    // Surplus workers idle this job, told so explicitly.
    while shards.len() < worker_count {
        shards.push(WorkerShard::empty());
    }

    Ok(ShardPlan {
        shards,
        total,
        distribution: Some(plan.report),
    })
}
