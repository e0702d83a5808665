//! Step Aggregation
//!
//! Folds raw measurement records into per-(category, name) summaries:
//! - count, mean/min/max duration and total duration
//! - mean/min/max allocated bytes
//! - each step's share of its category's total time
//!
//! Categories come out sorted by name. Within a category, steps keep the order
//! in which they were first seen, which is the order the workload runs them.

use duelbench_ipc::Step;
use fxhash::FxHashMap;
use std::collections::BTreeMap;
use std::time::Duration;

/// Summary statistics for one (category, name) group
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedStep {
    /// Step name
    pub name: String,
    /// Number of measurements folded into this group (always >= 1)
    pub count: usize,
    /// Arithmetic mean of the durations
    pub avg_duration: Duration,
    /// Fastest measurement
    pub min_duration: Duration,
    /// Slowest measurement
    pub max_duration: Duration,
    /// Arithmetic mean of the allocated bytes
    pub avg_bytes: f64,
    /// Smallest allocation delta
    pub min_bytes: u64,
    /// Largest allocation delta
    pub max_bytes: u64,
    /// Sum of all durations
    pub total_duration: Duration,
    /// `total_duration` as a percentage of the category total (0 when the total is 0)
    pub time_share: f64,
}

/// All aggregated steps of one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAggregate {
    /// Category label
    pub category: String,
    /// Sum of the step totals in this category
    pub total_duration: Duration,
    /// Steps in first-encountered order
    pub steps: Vec<AggregatedStep>,
}

impl CategoryAggregate {
    /// Look up a step by name
    pub fn get(&self, name: &str) -> Option<&AggregatedStep> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Aggregated results for one system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    /// Categories sorted lexicographically
    pub categories: Vec<CategoryAggregate>,
}

impl Aggregate {
    /// Look up a category by name
    pub fn category(&self, category: &str) -> Option<&CategoryAggregate> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Look up one (category, name) group
    pub fn get(&self, category: &str, name: &str) -> Option<&AggregatedStep> {
        self.category(category).and_then(|c| c.get(name))
    }

    /// Whether no measurements were aggregated
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of distinct (category, name) groups
    pub fn step_count(&self) -> usize {
        self.categories.iter().map(|c| c.steps.len()).sum()
    }

    /// Number of raw measurements folded into this aggregate
    pub fn measurement_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| c.steps.iter())
            .map(|s| s.count)
            .sum()
    }

    /// Sum of all category totals
    pub fn total_duration(&self) -> Duration {
        self.categories.iter().map(|c| c.total_duration).sum()
    }
}

/// Running totals for one group while folding
struct StepAccumulator {
    count: usize,
    total: Duration,
    min: Duration,
    max: Duration,
    bytes_sum: u128,
    min_bytes: u64,
    max_bytes: u64,
}

impl StepAccumulator {
    fn new(step: &Step) -> Self {
        Self {
            count: 1,
            total: step.duration,
            min: step.duration,
            max: step.duration,
            bytes_sum: step.allocated_bytes as u128,
            min_bytes: step.allocated_bytes,
            max_bytes: step.allocated_bytes,
        }
    }

    fn push(&mut self, step: &Step) {
        self.count += 1;
        self.total = self.total.saturating_add(step.duration);
        self.min = self.min.min(step.duration);
        self.max = self.max.max(step.duration);
        self.bytes_sum += step.allocated_bytes as u128;
        self.min_bytes = self.min_bytes.min(step.allocated_bytes);
        self.max_bytes = self.max_bytes.max(step.allocated_bytes);
    }

    fn finish(self, name: String, category_total: Duration) -> AggregatedStep {
        let count = self.count as f64;
        // Duration division works on (secs, nanos) and cannot overflow; groups
        // too large for a u32 divisor fall back to fractional seconds.
        let avg_duration = match u32::try_from(self.count) {
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / count),
        };
        let time_share = if category_total.is_zero() {
            0.0
        } else {
            self.total.as_secs_f64() / category_total.as_secs_f64() * 100.0
        };

        AggregatedStep {
            name,
            count: self.count,
            avg_duration,
            min_duration: self.min,
            max_duration: self.max,
            avg_bytes: self.bytes_sum as f64 / count,
            min_bytes: self.min_bytes,
            max_bytes: self.max_bytes,
            total_duration: self.total,
            time_share,
        }
    }
}

/// Steps of one category in first-seen order, with a name index for lookups
#[derive(Default)]
struct CategoryBuilder {
    order: Vec<(String, StepAccumulator)>,
    index: FxHashMap<String, usize>,
}

impl CategoryBuilder {
    fn push(&mut self, step: &Step) {
        match self.index.get(&step.name) {
            Some(&i) => self.order[i].1.push(step),
            None => {
                self.index.insert(step.name.clone(), self.order.len());
                self.order.push((step.name.clone(), StepAccumulator::new(step)));
            }
        }
    }

    fn finish(self, category: String) -> CategoryAggregate {
        let total_duration = self
            .order
            .iter()
            .fold(Duration::ZERO, |acc, (_, s)| acc.saturating_add(s.total));

        let steps = self
            .order
            .into_iter()
            .map(|(name, acc)| acc.finish(name, total_duration))
            .collect();

        CategoryAggregate {
            category,
            total_duration,
            steps,
        }
    }
}

/// Group measurement records by category and name and summarize each group.
///
/// An empty input yields an empty aggregate.
pub fn aggregate_steps(steps: &[Step]) -> Aggregate {
    let mut categories: BTreeMap<&str, CategoryBuilder> = BTreeMap::new();
    for step in steps {
        categories.entry(&step.category).or_default().push(step);
    }

    Aggregate {
        categories: categories
            .into_iter()
            .map(|(category, builder)| builder.finish(category.to_string()))
            .collect(),
    }
}
