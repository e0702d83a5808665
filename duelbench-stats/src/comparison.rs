//! Baseline/Candidate Comparison
//!
//! Pairs the aggregates of two systems step by step and classifies the
//! relative difference of mean duration and mean allocation. Lower is better
//! for both metrics, and both use the same classification.

use crate::aggregate::{AggregatedStep, Aggregate};
use std::collections::BTreeSet;
use std::time::Duration;

/// Values below this are treated as zero
pub const EPSILON: f64 = 1e-9;

/// Relative differences smaller than this (in percent) count as a tie
pub const EQUAL_THRESHOLD_PCT: f64 = 0.1;

/// Relative difference `(candidate - baseline) / baseline * 100`, or `None` when the baseline is ~0
pub fn pct_diff(baseline: f64, candidate: f64) -> Option<f64> {
    if baseline.abs() < EPSILON {
        None
    } else {
        Some((candidate - baseline) / baseline * 100.0)
    }
}

/// Classified relative difference between a baseline and a candidate value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelativeDiff {
    /// One side has no measurements for this step
    Missing,
    /// Both values are ~0; no meaningful ratio exists
    NotApplicable,
    /// Baseline is ~0 and the candidate is not, so the ratio is unbounded
    Unbounded,
    /// The values differ by less than [`EQUAL_THRESHOLD_PCT`]
    Equal,
    /// Candidate used less; the payload is the improvement magnitude in percent
    CandidateBetter(f64),
    /// Baseline used less; the payload is how much more the candidate used, in percent
    BaselineBetter(f64),
}

impl RelativeDiff {
    /// Classify two measured values
    pub fn classify(baseline: f64, candidate: f64) -> Self {
        if baseline.abs() < EPSILON && candidate.abs() < EPSILON {
            return RelativeDiff::NotApplicable;
        }

        match pct_diff(baseline, candidate) {
            None => RelativeDiff::Unbounded,
            Some(pct) if pct.abs() < EQUAL_THRESHOLD_PCT => RelativeDiff::Equal,
            Some(pct) if pct < 0.0 => RelativeDiff::CandidateBetter(pct.abs()),
            Some(pct) => RelativeDiff::BaselineBetter(pct),
        }
    }

    /// Classify two possibly-absent values
    pub fn between(baseline: Option<f64>, candidate: Option<f64>) -> Self {
        match (baseline, candidate) {
            (Some(b), Some(c)) => Self::classify(b, c),
            _ => RelativeDiff::Missing,
        }
    }

    /// Magnitude of the difference in percent, when one exists
    pub fn percent(&self) -> Option<f64> {
        match self {
            RelativeDiff::CandidateBetter(p) | RelativeDiff::BaselineBetter(p) => Some(*p),
            RelativeDiff::Equal => Some(0.0),
            _ => None,
        }
    }

    /// Human-readable verdict naming the winning system
    pub fn label(&self, baseline: &str, candidate: &str) -> String {
        match self {
            RelativeDiff::Missing => "no data".to_string(),
            RelativeDiff::NotApplicable => "n/a".to_string(),
            RelativeDiff::Unbounded => format!("{candidate}: unbounded improvement"),
            RelativeDiff::Equal => "approximately equal".to_string(),
            RelativeDiff::CandidateBetter(p) => format!("{candidate} improved by {p:.1}%"),
            RelativeDiff::BaselineBetter(p) => format!("{baseline} better by {p:.1}%"),
        }
    }
}

/// Mean duration and allocation of one side of a comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepMetrics {
    /// Mean duration
    pub duration: Duration,
    /// Mean allocated bytes
    pub bytes: f64,
}

impl From<&AggregatedStep> for StepMetrics {
    fn from(step: &AggregatedStep) -> Self {
        Self {
            duration: step.avg_duration,
            bytes: step.avg_bytes,
        }
    }
}

impl StepMetrics {
    fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

/// One step paired across both systems
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonStep {
    /// Step name
    pub name: String,
    /// Baseline metrics, `None` when the baseline never ran this step
    pub baseline: Option<StepMetrics>,
    /// Candidate metrics, `None` when the candidate never ran this step
    pub candidate: Option<StepMetrics>,
    /// Verdict on mean duration
    pub duration_diff: RelativeDiff,
    /// Verdict on mean allocation
    pub bytes_diff: RelativeDiff,
}

/// All paired steps of one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryComparison {
    /// Category label
    pub category: String,
    /// Steps sorted by name
    pub steps: Vec<ComparisonStep>,
}

/// Per-verdict counts over all compared steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Steps where the candidate was better
    pub candidate_better: usize,
    /// Steps where the baseline was better
    pub baseline_better: usize,
    /// Steps within the tie threshold
    pub equal: usize,
    /// Steps without a usable ratio (missing data, zero values)
    pub undecided: usize,
}

impl Tally {
    fn count(&mut self, diff: RelativeDiff) {
        match diff {
            RelativeDiff::CandidateBetter(_) => self.candidate_better += 1,
            RelativeDiff::BaselineBetter(_) => self.baseline_better += 1,
            RelativeDiff::Equal => self.equal += 1,
            RelativeDiff::Missing | RelativeDiff::NotApplicable | RelativeDiff::Unbounded => {
                self.undecided += 1
            }
        }
    }
}

/// Full comparison of two systems
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Name of the reference system
    pub baseline: String,
    /// Name of the system being evaluated
    pub candidate: String,
    /// Categories sorted by name
    pub categories: Vec<CategoryComparison>,
}

impl Comparison {
    /// Whether neither side produced any measurement
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Count duration verdicts
    pub fn duration_tally(&self) -> Tally {
        self.tally(|s| s.duration_diff)
    }

    /// Count allocation verdicts
    pub fn bytes_tally(&self) -> Tally {
        self.tally(|s| s.bytes_diff)
    }

    fn tally(&self, pick: impl Fn(&ComparisonStep) -> RelativeDiff) -> Tally {
        let mut tally = Tally::default();
        for step in self.categories.iter().flat_map(|c| c.steps.iter()) {
            tally.count(pick(step));
        }
        tally
    }
}

/// Pair two aggregates step by step.
///
/// Categories and step names are the union of both sides, each sorted
/// lexicographically. A step only one side ran is kept with the other side
/// marked as missing.
pub fn compare_aggregates(
    baseline_name: &str,
    baseline: &Aggregate,
    candidate_name: &str,
    candidate: &Aggregate,
) -> Comparison {
    let categories: BTreeSet<&str> = baseline
        .categories
        .iter()
        .chain(candidate.categories.iter())
        .map(|c| c.category.as_str())
        .collect();

    let categories = categories
        .into_iter()
        .map(|category| {
            let names: BTreeSet<&str> = baseline
                .category(category)
                .into_iter()
                .chain(candidate.category(category))
                .flat_map(|c| c.steps.iter().map(|s| s.name.as_str()))
                .collect();

            let steps = names
                .into_iter()
                .map(|name| {
                    let base = baseline.get(category, name).map(StepMetrics::from);
                    let cand = candidate.get(category, name).map(StepMetrics::from);
                    ComparisonStep {
                        name: name.to_string(),
                        baseline: base,
                        candidate: cand,
                        duration_diff: RelativeDiff::between(
                            base.map(|m| m.duration_ms()),
                            cand.map(|m| m.duration_ms()),
                        ),
                        bytes_diff: RelativeDiff::between(
                            base.map(|m| m.bytes),
                            cand.map(|m| m.bytes),
                        ),
                    }
                })
                .collect();

            CategoryComparison {
                category: category.to_string(),
                steps,
            }
        })
        .collect();

    Comparison {
        baseline: baseline_name.to_string(),
        candidate: candidate_name.to_string(),
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_steps;
    use duelbench_ipc::Step;

    fn steps(category: &str, name: &str, ms: u64, bytes: u64, n: usize) -> Vec<Step> {
        (0..n)
            .map(|_| Step::new(category, name, Duration::from_millis(ms), bytes))
            .collect()
    }

    #[test]
    fn test_candidate_halves_time() {
        let diff = RelativeDiff::classify(100.0, 50.0);
        assert_eq!(diff, RelativeDiff::CandidateBetter(50.0));
        assert_eq!(diff.label("A", "B"), "B improved by 50.0%");
    }

    #[test]
    fn test_baseline_better() {
        let diff = RelativeDiff::classify(50.0, 75.0);
        assert_eq!(diff, RelativeDiff::BaselineBetter(50.0));
        assert_eq!(diff.label("A", "B"), "A better by 50.0%");
    }

    #[test]
    fn test_both_zero() {
        let diff = RelativeDiff::classify(0.0, 0.0);
        assert_eq!(diff, RelativeDiff::NotApplicable);
        assert_eq!(diff.label("A", "B"), "n/a");
    }

    #[test]
    fn test_zero_baseline() {
        let diff = RelativeDiff::classify(0.0, 30.0);
        assert_eq!(diff, RelativeDiff::Unbounded);
        assert!(diff.label("A", "B").contains("unbounded improvement"));
        assert_eq!(diff.percent(), None);
    }

    #[test]
    fn test_within_threshold() {
        assert_eq!(RelativeDiff::classify(100.0, 100.05), RelativeDiff::Equal);
        assert_eq!(RelativeDiff::classify(100.0, 99.95), RelativeDiff::Equal);
        assert_eq!(
            RelativeDiff::classify(100.0, 100.05).label("A", "B"),
            "approximately equal"
        );
    }

    #[test]
    fn test_same_magnitude_for_both_metrics() {
        // A 25% improvement reads the same whether it is time or bytes.
        let time = RelativeDiff::classify(40.0, 30.0);
        let bytes = RelativeDiff::classify(4000.0, 3000.0);
        assert_eq!(time.percent(), bytes.percent());
        assert_eq!(time.label("A", "B"), bytes.label("A", "B"));
    }

    #[test]
    fn test_pct_diff() {
        assert_eq!(pct_diff(0.0, 5.0), None);
        assert_eq!(pct_diff(200.0, 100.0), Some(-50.0));
    }

    #[test]
    fn test_compare_end_to_end() {
        let a = aggregate_steps(&steps("Ops", "Insert", 10, 1000, 3));
        let b = aggregate_steps(&steps("Ops", "Insert", 5, 1000, 3));
        let comparison = compare_aggregates("A", &a, "B", &b);

        let step = &comparison.categories[0].steps[0];
        assert_eq!(step.duration_diff, RelativeDiff::CandidateBetter(50.0));
        assert_eq!(step.duration_diff.label("A", "B"), "B improved by 50.0%");
        assert_eq!(step.bytes_diff, RelativeDiff::Equal);
        assert_eq!(step.bytes_diff.label("A", "B"), "approximately equal");
    }

    #[test]
    fn test_union_and_missing_sides() {
        let mut base = steps("Users", "Query", 4, 10, 1);
        base.extend(steps("Users", "Insert", 4, 10, 1));
        let mut cand = steps("Users", "Insert", 2, 10, 1);
        cand.extend(steps("Files", "Upload", 8, 10, 1));

        let comparison =
            compare_aggregates("A", &aggregate_steps(&base), "B", &aggregate_steps(&cand));

        let categories: Vec<_> = comparison
            .categories
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(categories, vec!["Files", "Users"]);

        let upload = &comparison.categories[0].steps[0];
        assert!(upload.baseline.is_none());
        assert!(upload.candidate.is_some());
        assert_eq!(upload.duration_diff, RelativeDiff::Missing);

        let users: Vec<_> = comparison.categories[1]
            .steps
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(users, vec!["Insert", "Query"]);
        assert!(comparison.categories[1].steps[1].candidate.is_none());
    }

    #[test]
    fn test_empty_aggregates() {
        let comparison = compare_aggregates("A", &Aggregate::default(), "B", &Aggregate::default());
        assert!(comparison.is_empty());
        assert_eq!(comparison.duration_tally(), Tally::default());
    }

    #[test]
    fn test_tally() {
        let mut base = steps("Ops", "Fast", 10, 100, 1);
        base.extend(steps("Ops", "Slow", 10, 100, 1));
        base.extend(steps("Ops", "Same", 10, 100, 1));
        let mut cand = steps("Ops", "Fast", 5, 100, 1);
        cand.extend(steps("Ops", "Slow", 20, 100, 1));
        cand.extend(steps("Ops", "Same", 10, 100, 1));

        let comparison =
            compare_aggregates("A", &aggregate_steps(&base), "B", &aggregate_steps(&cand));
        let tally = comparison.duration_tally();
        assert_eq!(tally.candidate_better, 1);
        assert_eq!(tally.baseline_better, 1);
        assert_eq!(tally.equal, 1);
        assert_eq!(comparison.bytes_tally().equal, 3);
    }
}
