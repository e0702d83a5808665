//! Measurement Records
//!
//! A [`Step`] is the only value that crosses the worker/master boundary. It is
//! created once per timed operation inside a worker and never mutated.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One timed operation: which step ran, how long it took, and how much it allocated.
///
/// `(category, name)` repeats across iterations and worker runs; the aggregator
/// folds all records sharing that key into one summary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Grouping label (e.g. `"Users"`, `"Files"`)
    pub category: String,
    /// Step label within the category (e.g. `"Insert"`)
    pub name: String,
    /// Wall-clock time spent in the step
    pub duration: Duration,
    /// Heap bytes allocated while the step ran (0 when tracking is unavailable)
    pub allocated_bytes: u64,
}

impl Step {
    /// Create a new measurement record
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        duration: Duration,
        allocated_bytes: u64,
    ) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            duration,
            allocated_bytes,
        }
    }

    /// Duration in fractional milliseconds, the unit used on the wire
    #[inline]
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

/// Outcome of one worker invocation, owned by the orchestrator until it is aggregated.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Identifier of the system that was exercised
    pub system: String,
    /// Decoded measurement records, in emission order
    pub steps: Vec<Step>,
    /// Wall-clock time of the whole worker invocation
    pub total_duration: Duration,
    /// Whether the worker exited cleanly
    pub success: bool,
}

impl RunResult {
    /// Sum of all recorded step durations (excludes process start-up and reclamation)
    pub fn measured_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_ms() {
        let step = Step::new("Ops", "Insert", Duration::from_micros(12_345), 0);
        assert!((step.duration_ms() - 12.345).abs() < 1e-9);
    }

    #[test]
    fn test_measured_duration() {
        let result = RunResult {
            system: "a".to_string(),
            steps: vec![
                Step::new("Ops", "Insert", Duration::from_millis(10), 0),
                Step::new("Ops", "Query", Duration::from_millis(5), 0),
            ],
            total_duration: Duration::from_secs(1),
            success: true,
        };
        assert_eq!(result.measured_duration(), Duration::from_millis(15));
    }

    #[test]
    fn test_step_serializes() {
        let step = Step::new("Ops", "Insert", Duration::from_millis(1), 64);
        let json = serde_json::to_string(&step).unwrap();
        let back: Step = serde_json::from_str(&json).unwrap();
        assert_eq!(step, back);
    }
}
