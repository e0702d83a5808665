//! Run Planner
//!
//! Picks the baseline and candidate systems and fixes the run parameters.
//!
//! Selection: explicit ids win; otherwise the baseline is the first
//! registered system and the candidate the first registered system that is
//! not the baseline.

use duelbench_core::{Suite, SystemDef};
use std::time::Duration;
use thiserror::Error;

/// Reasons a run cannot be planned
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// No explicit pair and fewer than two systems registered
    #[error("at least two systems must be registered to pick a default pair, found {0}")]
    NotEnoughSystems(usize),

    #[error("unknown {role} system '{id}' (available: {available})")]
    /// A requested id is not registered
    UnknownSystem {
        /// "baseline" or "candidate"
        role: &'static str,
        /// The requested id
        id: String,
        /// Comma-separated registered ids
        available: String,
    },

    /// Iteration count of zero
    #[error("iterations must be at least 1")]
    ZeroIterations,
}

/// What the master is about to run
#[derive(Debug, Clone)]
pub struct RunPlan<'a> {
    /// Reference system
    pub baseline: &'a SystemDef,
    /// Evaluated system
    pub candidate: &'a SystemDef,
    /// Iterations per worker
    pub iterations: u64,
    /// Bound on each worker run
    pub timeout: Option<Duration>,
}

impl RunPlan<'_> {
    /// Systems in execution order
    pub fn systems(&self) -> [&SystemDef; 2] {
        [self.baseline, self.candidate]
    }
}

fn lookup<'a>(suite: &'a Suite, role: &'static str, id: &str) -> Result<&'a SystemDef, PlanError> {
    suite.find(id).ok_or_else(|| PlanError::UnknownSystem {
        role,
        id: id.to_string(),
        available: suite
            .systems()
            .iter()
            .map(|s| s.id)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Build a run plan from the suite and the resolved options
pub fn build_plan<'a>(
    suite: &'a Suite,
    baseline: Option<&str>,
    candidate: Option<&str>,
    iterations: u64,
    timeout: Option<Duration>,
) -> Result<RunPlan<'a>, PlanError> {
    if iterations == 0 {
        return Err(PlanError::ZeroIterations);
    }

    let baseline = match baseline {
        Some(id) => lookup(suite, "baseline", id)?,
        None => suite
            .systems()
            .first()
            .ok_or(PlanError::NotEnoughSystems(0))?,
    };

    let candidate = match candidate {
        Some(id) => lookup(suite, "candidate", id)?,
        None => suite
            .systems()
            .iter()
            .find(|s| s.id != baseline.id)
            .ok_or(PlanError::NotEnoughSystems(suite.systems().len()))?,
    };

    if baseline.id == candidate.id {
        tracing::warn!(system = baseline.id, "baseline and candidate are the same system");
    }

    Ok(RunPlan {
        baseline,
        candidate,
        iterations,
        timeout,
    })
}
