//! Prometheus metrics formatting.
//!
//! This module renders a pool snapshot in Prometheus text exposition
//! format.

use std::fmt::Write;

use crate::state::PoolSnapshot;

/// Format a snapshot as Prometheus text.
pub fn collect_metrics(snapshot: &PoolSnapshot) -> String {
    let mut output = String::new();

    collect_worker_metrics(snapshot, &mut output);
    collect_action_metrics(snapshot, &mut output);

    output
}

/// Worker gauges by state.
fn collect_worker_metrics(snapshot: &PoolSnapshot, output: &mut String) {
    let busy = snapshot.busy_workers as u64;
    let idle = snapshot.total_workers.saturating_sub(snapshot.busy_workers) as u64;

    writeln!(output, "# HELP fanout_workers Number of workers by state").ok();
    writeln!(output, "# TYPE fanout_workers gauge").ok();
    writeln!(output, "fanout_workers{{state=\"busy\"}} {busy}").ok();
    writeln!(output, "fanout_workers{{state=\"idle\"}} {idle}").ok();
}

/// Action counters by terminal result, plus the assignment gauge.
fn collect_action_metrics(snapshot: &PoolSnapshot, output: &mut String) {
    let progress = &snapshot.progress;

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP fanout_actions_total Actions by terminal result"
    )
    .ok();
    writeln!(output, "# TYPE fanout_actions_total counter").ok();
    writeln!(
        output,
        "fanout_actions_total{{result=\"success\"}} {}",
        progress.success
    )
    .ok();
    writeln!(
        output,
        "fanout_actions_total{{result=\"failure\"}} {}",
        progress.failure
    )
    .ok();

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP fanout_actions_assigned Actions assigned to the current job"
    )
    .ok();
    writeln!(output, "# TYPE fanout_actions_assigned gauge").ok();
    writeln!(output, "fanout_actions_assigned {}", progress.total).ok();
}
