//! Duel Execution
//!
//! Runs the baseline and then the candidate, each in its own worker
//! process. The master stays sequential: a system is fully decoded and
//! aggregated before the next worker starts, so the two systems never
//! compete for the machine.

use crate::planner::RunPlan;
use crate::supervisor::{Supervisor, SupervisorError};
use duelbench_core::SystemDef;
use duelbench_ipc::RunResult;
use duelbench_stats::{Aggregate, Comparison, aggregate_steps, compare_aggregates};
use indicatif::{ProgressBar, ProgressStyle};

/// One system's decoded run and its aggregate
#[derive(Debug, Clone)]
pub struct SystemRun {
    /// System identifier
    pub id: String,
    /// Display name used in reports
    pub name: String,
    /// Raw decoded run
    pub result: RunResult,
    /// Aggregated measurements
    pub aggregate: Aggregate,
}

/// Both runs and their comparison
#[derive(Debug, Clone)]
pub struct DuelOutcome {
    /// Reference run
    pub baseline: SystemRun,
    /// Evaluated run
    pub candidate: SystemRun,
    /// Step-by-step comparison of the two aggregates
    pub comparison: Comparison,
}

fn run_system(supervisor: &Supervisor, def: &SystemDef) -> Result<SystemRun, SupervisorError> {
    let result = supervisor.run_system(def.id)?;
    if result.steps.is_empty() {
        tracing::warn!(system = def.id, "worker produced no measurements");
    }

    let aggregate = aggregate_steps(&result.steps);
    tracing::info!(
        system = def.id,
        measurements = result.steps.len(),
        steps = aggregate.step_count(),
        wall_ms = result.total_duration.as_millis() as u64,
        "system complete"
    );

    Ok(SystemRun {
        id: def.id.to_string(),
        name: def.name.to_string(),
        result,
        aggregate,
    })
}

/// Names the comparison uses for each side; a role suffix tells them apart
/// when both systems share a display name.
fn comparison_labels(baseline: &SystemRun, candidate: &SystemRun) -> (String, String) {
    if baseline.name == candidate.name {
        (
            format!("{} (baseline)", baseline.name),
            format!("{} (candidate)", candidate.name),
        )
    } else {
        (baseline.name.clone(), candidate.name.clone())
    }
}

/// Run both systems of the plan and compare them.
///
/// The first worker failure aborts the whole duel; no partial outcome is
/// returned.
pub fn execute_plan(
    supervisor: &Supervisor,
    plan: &RunPlan<'_>,
) -> Result<DuelOutcome, SupervisorError> {
    let pb = ProgressBar::new(2);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let run = |def: &SystemDef| {
        pb.set_message(def.id.to_string());
        let outcome = run_system(supervisor, def);
        match &outcome {
            Ok(_) => pb.inc(1),
            Err(_) => pb.abandon_with_message(format!("{} failed", def.id)),
        }
        outcome
    };

    let baseline = run(plan.baseline)?;
    let candidate = run(plan.candidate)?;
    pb.finish_with_message("Complete");

    let (baseline_label, candidate_label) = comparison_labels(&baseline, &candidate);
    let comparison = compare_aggregates(
        &baseline_label,
        &baseline.aggregate,
        &candidate_label,
        &candidate.aggregate,
    );

    Ok(DuelOutcome {
        baseline,
        candidate,
        comparison,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::planner::build_plan;
    use crate::supervisor::WorkerCommand;
    use duelbench_core::{Suite, Workload, WorkloadConfig, WorkloadError};
    use duelbench_stats::RelativeDiff;

    fn never(_: &WorkloadConfig) -> Result<Box<dyn Workload>, WorkloadError> {
        Err(WorkloadError::assertion("not run"))
    }

    fn suite() -> Suite {
        Suite::new("test")
            .system(SystemDef::new("a", "A", never))
            .system(SystemDef::new("b", "B", never))
    }

    /// Worker stand-in: system `a` takes 10 ms per insert, `b` takes 5 ms.
    fn worker() -> WorkerCommand {
        WorkerCommand::new("sh").arg("-c").arg(
            r#"ms=10.00
[ "$3" = "--system=b" ] && ms=5.00
for i in 1 2 3; do echo "SLAVE_STEP:Ops - Insert - ${ms}ms - 1000B"; done"#,
        )
        .arg("sh")
    }

    #[test]
    fn test_execute_plan() {
        let suite = suite();
        let plan = build_plan(&suite, None, None, 3, None).unwrap();
        let supervisor = Supervisor::new(worker(), plan.iterations);

        let outcome = execute_plan(&supervisor, &plan).unwrap();
        assert_eq!(outcome.baseline.id, "a");
        assert_eq!(outcome.candidate.id, "b");
        assert_eq!(outcome.baseline.result.steps.len(), 3);

        let step = &outcome.comparison.categories[0].steps[0];
        assert_eq!(step.duration_diff, RelativeDiff::CandidateBetter(50.0));
        assert_eq!(step.duration_diff.label("A", "B"), "B improved by 50.0%");
        assert_eq!(step.bytes_diff, RelativeDiff::Equal);
    }

    #[test]
    fn test_shared_display_name_labels() {
        let suite = Suite::new("test")
            .system(SystemDef::new("a", "Store", never))
            .system(SystemDef::new("b", "Store", never));
        let plan = build_plan(&suite, None, None, 3, None).unwrap();
        let outcome = execute_plan(&Supervisor::new(worker(), 3), &plan).unwrap();

        assert_eq!(outcome.comparison.baseline, "Store (baseline)");
        assert_eq!(outcome.comparison.candidate, "Store (candidate)");
        let step = &outcome.comparison.categories[0].steps[0];
        assert_eq!(
            step.duration_diff
                .label(&outcome.comparison.baseline, &outcome.comparison.candidate),
            "Store (candidate) improved by 50.0%"
        );
    }

    #[test]
    fn test_same_system_both_sides() {
        let suite = suite();
        let plan = build_plan(&suite, Some("a"), Some("a"), 1, None).unwrap();
        let outcome = execute_plan(&Supervisor::new(worker(), 1), &plan).unwrap();

        assert_eq!(outcome.comparison.baseline, "A (baseline)");
        assert_eq!(outcome.comparison.candidate, "A (candidate)");
        assert_eq!(
            outcome.comparison.categories[0].steps[0].duration_diff,
            RelativeDiff::Equal
        );
    }

    #[test]
    fn test_candidate_failure_aborts() {
        let suite = suite();
        let plan = build_plan(&suite, None, None, 1, None).unwrap();
        let command = WorkerCommand::new("sh")
            .arg("-c")
            .arg(r#"[ "$3" = "--system=b" ] && { echo "SLAVE_ERROR: boom"; exit 1; }; true"#)
            .arg("sh");

        let err = execute_plan(&Supervisor::new(command, 1), &plan).unwrap_err();
        match err {
            SupervisorError::WorkerFailed { system, code, .. } => {
                assert_eq!(system, "b");
                assert_eq!(code, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
