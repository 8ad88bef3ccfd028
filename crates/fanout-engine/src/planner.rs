//! Balanced cross-assignment planner.
//!
//! Produces a directed assignment graph over N owners so each owner
//! both originates and receives as close to K edges as possible, with
//! no self-edges and no duplicate pairs. The greedy balancer is a
//! heuristic: for some (N, K) it cannot reach perfect K-regularity, so
//! results carry a [`DistributionReport`] instead of failing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use fanout_core::OwnerId;

/// Planning errors. Only a structurally impossible request fails;
/// under-served distributions are reported, not raised.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Cross assignment needs at least two owners.
    #[error("cross assignment needs at least 2 owners, have {0}")]
    TooFewOwners(usize),
}

/// One scheduled "from acts on to" relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentEdge {
    pub from: OwnerId,
    pub to: OwnerId,
}

/// Diagnostics for a produced plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionReport {
    /// The degree actually targeted: `min(requested, N-1)`.
    pub effective_degree: usize,

    /// True when fewer owners than `requested + 1` forced the degree
    /// down. Expected for small pools and must be surfaced to callers.
    pub degraded: bool,

    /// True when every owner gives and receives exactly the effective
    /// degree.
    pub perfect: bool,

    /// Observed out-degree range.
    pub min_given: usize,
    pub max_given: usize,

    /// Observed in-degree range.
    pub min_received: usize,
    pub max_received: usize,

    /// Balancer passes used.
    pub iterations: usize,
}

/// A produced assignment plan: the edge list plus diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub edges: Vec<AssignmentEdge>,
    pub report: DistributionReport,
}

impl AssignmentPlan {
    /// Edges originating from one owner.
    pub fn edges_from<'a>(&'a self, owner: &'a OwnerId) -> impl Iterator<Item = &'a AssignmentEdge> {
        self.edges.iter().filter(move |e| &e.from == owner)
    }
}

/// Build a near K-regular directed assignment over `owners`.
///
/// Greedy iterative balancing: each pass serves targets in ascending
/// received order (stable on input order), picking for each the
/// candidate source with the fewest edges given. The pass loop is
/// capped at `2 * degree * N`; hitting the cap yields a best-effort
/// plan, reported as imperfect.
pub fn plan(owners: &[OwnerId], degree: usize) -> Result<AssignmentPlan, PlanError> {
    let n = owners.len();
    if n <= 1 {
        return Err(PlanError::TooFewOwners(n));
    }

    let effective = degree.min(n - 1);
    let degraded = n < degree + 1;
    if degraded {
        warn!(
            owners = n,
            requested = degree,
            effective,
            "Not enough owners for requested degree; capping"
        );
    }

    let mut given = vec![0usize; n];
    let mut received = vec![0usize; n];
    // Pairs already assigned, self included so an owner never targets
    // itself.
    let mut used: Vec<HashSet<usize>> = (0..n).map(|i| HashSet::from([i])).collect();
    let mut edges: Vec<(usize, usize)> = Vec::new();

    let cap = 2 * degree.max(1) * n;
    let mut iterations = 0usize;
    let mut capped = false;

    loop {
        iterations += 1;
        if iterations > cap {
            capped = true;
            iterations = cap;
            break;
        }

        let mut targets: Vec<usize> = (0..n).collect();
        targets.sort_by_key(|&t| received[t]);

        let mut advanced = false;
        let mut all_done = true;

        for &target in &targets {
            if received[target] >= effective {
                continue;
            }
            all_done = false;

            let candidate = (0..n)
                .filter(|&s| s != target && !used[s].contains(&target) && given[s] < effective)
                .min_by_key(|&s| (given[s], s));

            let Some(source) = candidate else {
                continue;
            };

            used[source].insert(target);
            given[source] += 1;
            received[target] += 1;
            edges.push((source, target));
            advanced = true;
        }

        if all_done || !advanced {
            break;
        }
    }

    if capped {
        warn!(cap, "Balancer hit the iteration cap; plan may be imperfect");
    }

    let perfect = given.iter().all(|&g| g == effective) && received.iter().all(|&r| r == effective);
    let report = DistributionReport {
        effective_degree: effective,
        degraded,
        perfect,
        min_given: given.iter().copied().min().unwrap_or(0),
        max_given: given.iter().copied().max().unwrap_or(0),
        min_received: received.iter().copied().min().unwrap_or(0),
        max_received: received.iter().copied().max().unwrap_or(0),
        iterations,
    };

    debug!(
        owners = n,
        effective,
        edges = edges.len(),
        perfect = report.perfect,
        iterations = report.iterations,
        "Cross assignment planned"
    );

    Ok(AssignmentPlan {
        edges: edges
            .into_iter()
            .map(|(s, t)| AssignmentEdge {
                from: owners[s].clone(),
                to: owners[t].clone(),
            })
            .collect(),
        report,
    })
}
