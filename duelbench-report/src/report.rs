//! Report Data Structures

use chrono::{DateTime, Utc};
use duelbench_stats::{
    AggregatedStep, Aggregate, CategoryAggregate, Comparison, ComparisonStep, RelativeDiff, Tally,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Current JSON schema version
pub const SCHEMA_VERSION: u32 = 1;

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run metadata
    pub meta: ReportMeta,
    /// Baseline first, then candidate
    pub systems: Vec<SystemReport>,
    /// Present once both systems have run
    pub comparison: Option<ComparisonReport>,
}

impl Report {
    /// Start an empty report
    pub fn new(meta: ReportMeta) -> Self {
        Self {
            meta,
            systems: Vec::new(),
            comparison: None,
        }
    }

    /// Append one system's aggregate
    pub fn with_system(mut self, system: &str, aggregate: &Aggregate) -> Self {
        self.systems.push(SystemReport::new(system, aggregate));
        self
    }

    /// Attach the baseline/candidate comparison
    pub fn with_comparison(mut self, comparison: &Comparison) -> Self {
        self.comparison = Some(ComparisonReport::from(comparison));
        self
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// [`SCHEMA_VERSION`] at the time of writing
    pub schema_version: u32,
    /// duelbench version
    pub version: String,
    /// When the report was generated
    pub timestamp: DateTime<Utc>,
    /// Suite name
    pub suite: String,
    /// Iterations each worker ran
    pub iterations: u64,
    /// Seed handed to the workloads
    pub seed: u64,
    /// Host the workers ran on
    pub host: HostInfo,
}

/// Host the workers ran on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    /// Operating system
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model, "Unknown" when unavailable
    pub cpu: String,
    /// Logical cores
    pub cpu_cores: u32,
}

/// Aggregated results of one system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemReport {
    /// Display name
    pub system: String,
    /// Sum of all category totals
    pub total_ms: f64,
    /// Raw measurement count
    pub measurements: usize,
    /// Categories in name order
    pub categories: Vec<CategoryReport>,
}

impl SystemReport {
    fn new(system: &str, aggregate: &Aggregate) -> Self {
        Self {
            system: system.to_string(),
            total_ms: ms(aggregate.total_duration()),
            measurements: aggregate.measurement_count(),
            categories: aggregate.categories.iter().map(CategoryReport::from).collect(),
        }
    }
}

/// One category of a system report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryReport {
    /// Category label
    pub category: String,
    /// Sum of the step totals
    pub total_ms: f64,
    /// Steps in workload order
    pub steps: Vec<StepReport>,
}

impl From<&CategoryAggregate> for CategoryReport {
    fn from(category: &CategoryAggregate) -> Self {
        Self {
            category: category.category.clone(),
            total_ms: ms(category.total_duration),
            steps: category.steps.iter().map(StepReport::from).collect(),
        }
    }
}

/// Summary statistics of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Step name
    pub name: String,
    /// Measurements in the group
    pub count: usize,
    /// Mean duration
    pub avg_ms: f64,
    /// Fastest measurement
    pub min_ms: f64,
    /// Slowest measurement
    pub max_ms: f64,
    /// Sum of durations
    pub total_ms: f64,
    /// Percentage of the category total
    pub time_share: f64,
    /// Mean allocated bytes
    pub avg_bytes: f64,
    /// Smallest allocation delta
    pub min_bytes: u64,
    /// Largest allocation delta
    pub max_bytes: u64,
}

impl From<&AggregatedStep> for StepReport {
    fn from(step: &AggregatedStep) -> Self {
        Self {
            name: step.name.clone(),
            count: step.count,
            avg_ms: ms(step.avg_duration),
            min_ms: ms(step.min_duration),
            max_ms: ms(step.max_duration),
            total_ms: ms(step.total_duration),
            time_share: step.time_share,
            avg_bytes: step.avg_bytes,
            min_bytes: step.min_bytes,
            max_bytes: step.max_bytes,
        }
    }
}

/// Verdict on one metric of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// One side has no data for the step
    Missing,
    /// Both values are zero
    NotApplicable,
    /// Baseline is zero, candidate is not
    Unbounded,
    /// Within the equality threshold
    Equal,
    /// Candidate is lower
    CandidateBetter,
    /// Baseline is lower
    BaselineBetter,
}

impl From<RelativeDiff> for Verdict {
    fn from(diff: RelativeDiff) -> Self {
        match diff {
            RelativeDiff::Missing => Verdict::Missing,
            RelativeDiff::NotApplicable => Verdict::NotApplicable,
            RelativeDiff::Unbounded => Verdict::Unbounded,
            RelativeDiff::Equal => Verdict::Equal,
            RelativeDiff::CandidateBetter(_) => Verdict::CandidateBetter,
            RelativeDiff::BaselineBetter(_) => Verdict::BaselineBetter,
        }
    }
}

/// Comparison of one metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDiff {
    /// Baseline value, absent when the step has no data
    pub baseline: Option<f64>,
    /// Candidate value, absent when the step has no data
    pub candidate: Option<f64>,
    /// Which side won
    pub verdict: Verdict,
    /// Magnitude in percent, absent when no ratio exists
    pub percent: Option<f64>,
    /// Human-readable verdict
    pub label: String,
}

/// One step paired across both systems
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// Category label
    pub category: String,
    /// Step name
    pub name: String,
    /// Mean duration in milliseconds
    pub time_ms: MetricDiff,
    /// Mean allocated bytes
    pub alloc_bytes: MetricDiff,
}

impl ComparisonEntry {
    fn new(category: &str, step: &ComparisonStep, baseline: &str, candidate: &str) -> Self {
        Self {
            category: category.to_string(),
            name: step.name.clone(),
            time_ms: MetricDiff {
                baseline: step.baseline.map(|m| ms(m.duration)),
                candidate: step.candidate.map(|m| ms(m.duration)),
                verdict: step.duration_diff.into(),
                percent: step.duration_diff.percent(),
                label: step.duration_diff.label(baseline, candidate),
            },
            alloc_bytes: MetricDiff {
                baseline: step.baseline.map(|m| m.bytes),
                candidate: step.candidate.map(|m| m.bytes),
                verdict: step.bytes_diff.into(),
                percent: step.bytes_diff.percent(),
                label: step.bytes_diff.label(baseline, candidate),
            },
        }
    }
}

/// Verdict counts for one metric
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TallyReport {
    /// Steps the candidate won
    pub candidate_better: usize,
    /// Steps the baseline won
    pub baseline_better: usize,
    /// Steps within the equality threshold
    pub equal: usize,
    /// Missing or not comparable
    pub undecided: usize,
}

impl From<Tally> for TallyReport {
    fn from(tally: Tally) -> Self {
        Self {
            candidate_better: tally.candidate_better,
            baseline_better: tally.baseline_better,
            equal: tally.equal,
            undecided: tally.undecided,
        }
    }
}

/// Baseline/candidate comparison section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Baseline display name
    pub baseline: String,
    /// Candidate display name
    pub candidate: String,
    /// One entry per step in either system
    pub entries: Vec<ComparisonEntry>,
    /// Duration verdicts
    pub time_summary: TallyReport,
    /// Allocation verdicts
    pub alloc_summary: TallyReport,
}

impl From<&Comparison> for ComparisonReport {
    fn from(comparison: &Comparison) -> Self {
        let entries = comparison
            .categories
            .iter()
            .flat_map(|c| {
                c.steps.iter().map(|s| {
                    ComparisonEntry::new(&c.category, s, &comparison.baseline, &comparison.candidate)
                })
            })
            .collect();

        Self {
            baseline: comparison.baseline.clone(),
            candidate: comparison.candidate.clone(),
            entries,
            time_summary: comparison.duration_tally().into(),
            alloc_summary: comparison.bytes_tally().into(),
        }
    }
}
