#![warn(missing_docs)]
//! DuelBench Statistical Engine
//!
//! Turns decoded measurement records into reportable numbers:
//! - Per-step aggregation (count, mean/min/max duration and allocation, totals, time share)
//! - Baseline/candidate comparison with explicit labels for zero and missing values

mod aggregate;
mod comparison;

pub use aggregate::{AggregatedStep, Aggregate, CategoryAggregate, aggregate_steps};
pub use comparison::{
    CategoryComparison, Comparison, ComparisonStep, EPSILON, EQUAL_THRESHOLD_PCT, RelativeDiff,
    StepMetrics, Tally, compare_aggregates, pct_diff,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert!((EPSILON - 1e-9).abs() < f64::EPSILON);
        assert!((EQUAL_THRESHOLD_PCT - 0.1).abs() < f64::EPSILON);
    }
}
