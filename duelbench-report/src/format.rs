//! Console Formatting
//!
//! Human-readable output built on [`render_table`]:
//! - per-system summary, one table per category
//! - side-by-side comparison, one table per category

use crate::table::{TableError, render_table};
use duelbench_stats::{Aggregate, Comparison, ComparisonStep, StepMetrics};
use std::fmt::Write as _;
use std::time::Duration;

/// Placeholder for a side that has no measurement
const MISSING: &str = "-";

const SUMMARY_HEADERS: [&str; 10] = [
    "Step",
    "Count",
    "Avg",
    "Min",
    "Max",
    "Total",
    "Share",
    "Avg alloc",
    "Min alloc",
    "Max alloc",
];

/// Format a duration in milliseconds, switching to µs below 1 ms and to s at 1000 ms
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_secs_f64() * 1000.0;
    if ms < 1.0 {
        format!("{:.2} µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{:.2} ms", ms)
    } else {
        format!("{:.2} s", ms / 1000.0)
    }
}

/// Format a byte count as B, KiB or MiB
pub fn format_bytes(bytes: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;

    if bytes < KIB {
        format!("{:.0} B", bytes)
    } else if bytes < MIB {
        format!("{:.2} KiB", bytes / KIB)
    } else {
        format!("{:.2} MiB", bytes / MIB)
    }
}

/// Render one summary table per category for a single system
pub fn format_system_summary(system: &str, aggregate: &Aggregate) -> Result<String, TableError> {
    if aggregate.is_empty() {
        return render_table::<String>(&format!("{system}: results"), &SUMMARY_HEADERS, &[]);
    }

    let mut output = String::new();
    for category in &aggregate.categories {
        let rows: Vec<Vec<String>> = category
            .steps
            .iter()
            .map(|s| {
                vec![
                    s.name.clone(),
                    s.count.to_string(),
                    format_duration(s.avg_duration),
                    format_duration(s.min_duration),
                    format_duration(s.max_duration),
                    format_duration(s.total_duration),
                    format!("{:.1}%", s.time_share),
                    format_bytes(s.avg_bytes),
                    format_bytes(s.min_bytes as f64),
                    format_bytes(s.max_bytes as f64),
                ]
            })
            .collect();

        let title = format!("{system}: {}", category.category);
        output.push_str(&render_table(&title, &SUMMARY_HEADERS, &rows)?);
        let _ = writeln!(
            output,
            "Category total: {}\n",
            format_duration(category.total_duration)
        );
    }

    Ok(output)
}

/// Render one side-by-side table per category
pub fn format_comparison(comparison: &Comparison) -> Result<String, TableError> {
    let baseline = comparison.baseline.as_str();
    let candidate = comparison.candidate.as_str();

    let baseline_time = format!("{baseline} time");
    let candidate_time = format!("{candidate} time");
    let baseline_alloc = format!("{baseline} alloc");
    let candidate_alloc = format!("{candidate} alloc");
    let headers = [
        "Step",
        baseline_time.as_str(),
        candidate_time.as_str(),
        "Time diff",
        baseline_alloc.as_str(),
        candidate_alloc.as_str(),
        "Alloc diff",
    ];

    let heading = format!("{baseline} vs {candidate}");
    if comparison.is_empty() {
        return render_table::<String>(&heading, &headers, &[]);
    }

    let mut output = String::new();
    for category in &comparison.categories {
        let rows: Vec<Vec<String>> = category
            .steps
            .iter()
            .map(|s| comparison_row(s, baseline, candidate))
            .collect();
        let title = format!("{heading}: {}", category.category);
        output.push_str(&render_table(&title, &headers, &rows)?);
        output.push('\n');
    }

    let time = comparison.duration_tally();
    let alloc = comparison.bytes_tally();
    let _ = writeln!(
        output,
        "Time:  {candidate} better in {}, {baseline} better in {}, equal in {}",
        time.candidate_better, time.baseline_better, time.equal
    );
    let _ = writeln!(
        output,
        "Alloc: {candidate} better in {}, {baseline} better in {}, equal in {}",
        alloc.candidate_better, alloc.baseline_better, alloc.equal
    );

    Ok(output)
}

fn comparison_row(step: &ComparisonStep, baseline: &str, candidate: &str) -> Vec<String> {
    let time = |m: Option<StepMetrics>| {
        m.map_or_else(|| MISSING.to_string(), |m| format_duration(m.duration))
    };
    let alloc =
        |m: Option<StepMetrics>| m.map_or_else(|| MISSING.to_string(), |m| format_bytes(m.bytes));

    vec![
        step.name.clone(),
        time(step.baseline),
        time(step.candidate),
        step.duration_diff.label(baseline, candidate),
        alloc(step.baseline),
        alloc(step.candidate),
        step.bytes_diff.label(baseline, candidate),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelbench_ipc::Step;
    use duelbench_stats::{aggregate_steps, compare_aggregates};

    fn run(ms: u64, bytes: u64) -> Aggregate {
        let steps: Vec<_> = (0..3)
            .map(|_| Step::new("Ops", "Insert", Duration::from_millis(ms), bytes))
            .collect();
        aggregate_steps(&steps)
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(250)), "250.00 µs");
        assert_eq!(format_duration(Duration::from_millis(10)), "10.00 ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50 s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0.0), "0 B");
        assert_eq!(format_bytes(1000.0), "1000 B");
        assert_eq!(format_bytes(2048.0), "2.00 KiB");
        assert_eq!(format_bytes(3.0 * 1024.0 * 1024.0), "3.00 MiB");
    }

    #[test]
    fn test_system_summary() {
        let output = format_system_summary("A", &run(10, 1000)).unwrap();
        assert!(output.starts_with("A: Ops\n"));
        assert!(output.contains(" Insert "));
        assert!(output.contains("10.00 ms"));
        assert!(output.contains("100.0%"));
        assert!(output.contains("Category total: 30.00 ms"));
    }

    #[test]
    fn test_empty_summary() {
        let output = format_system_summary("A", &Aggregate::default()).unwrap();
        assert!(output.contains("no data available"));
    }

    #[test]
    fn test_comparison_table() {
        let comparison = compare_aggregates("A", &run(10, 1000), "B", &run(5, 1000));
        let output = format_comparison(&comparison).unwrap();

        assert!(output.contains("A vs B: Ops"));
        assert!(output.contains("A time"));
        assert!(output.contains("B alloc"));
        assert!(output.contains("B improved by 50.0%"));
        assert!(output.contains("approximately equal"));
        assert!(output.contains("Time:  B better in 1, A better in 0, equal in 0"));
    }

    #[test]
    fn test_comparison_missing_side() {
        let comparison = compare_aggregates("A", &run(10, 1000), "B", &Aggregate::default());
        let output = format_comparison(&comparison).unwrap();

        assert!(output.contains("no data"));
        let row = output.lines().find(|l| l.starts_with(" Insert")).unwrap();
        assert!(row.contains(" - "));
    }

    #[test]
    fn test_empty_comparison() {
        let comparison = compare_aggregates("A", &Aggregate::default(), "B", &Aggregate::default());
        let output = format_comparison(&comparison).unwrap();
        assert_eq!(output, "A vs B\n------\nno data available\n");
    }
}
