//! Output Rendering
//!
//! Human output prints each system's summary tables followed by the
//! side-by-side comparison. JSON output serializes the full [`Report`].

use super::execution::DuelOutcome;
use duelbench_report::{
    OutputFormat, Report, ReportMeta, TableError, format_comparison, format_duration,
    format_system_summary, generate_json_report,
};

/// Format a duel for human-readable terminal display
pub fn format_human_output(outcome: &DuelOutcome) -> Result<String, TableError> {
    let mut output = String::new();

    output.push('\n');
    output.push_str("DuelBench Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    let comparison = &outcome.comparison;
    for (label, run) in [
        (&comparison.baseline, &outcome.baseline),
        (&comparison.candidate, &outcome.candidate),
    ] {
        output.push_str(&format_system_summary(label, &run.aggregate)?);
        output.push_str(&format!(
            "{}: {} measurements, worker wall time {}\n\n",
            label,
            run.result.steps.len(),
            format_duration(run.result.total_duration)
        ));
    }

    output.push_str("Comparison\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");
    output.push_str(&format_comparison(&outcome.comparison)?);

    Ok(output)
}

/// Assemble the serializable report
pub fn build_report(outcome: &DuelOutcome, meta: ReportMeta) -> Report {
    let comparison = &outcome.comparison;
    Report::new(meta)
        .with_system(&comparison.baseline, &outcome.baseline.aggregate)
        .with_system(&comparison.candidate, &outcome.candidate.aggregate)
        .with_comparison(&outcome.comparison)
}

/// Render a duel in the requested format
pub fn render_output(
    outcome: &DuelOutcome,
    format: OutputFormat,
    meta: ReportMeta,
) -> anyhow::Result<String> {
    let output = match format {
        OutputFormat::Human => format_human_output(outcome)?,
        OutputFormat::Json => generate_json_report(&build_report(outcome, meta))?,
    };
    Ok(output)
}
