#![warn(missing_docs)]
//! DuelBench Report - Console and JSON Output
//!
//! Generates the two output formats of a run:
//! - Human (fixed-width tables per category)
//! - JSON (machine-readable)

mod format;
mod json;
mod report;
mod table;

pub use format::{format_bytes, format_comparison, format_duration, format_system_summary};
pub use json::generate_json_report;
pub use report::{
    CategoryReport, ComparisonEntry, ComparisonReport, HostInfo, MetricDiff, Report, ReportMeta,
    SCHEMA_VERSION, StepReport, SystemReport, TallyReport, Verdict,
};
pub use table::{NO_DATA, TableError, render_table};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// JSON with full schema
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("Human".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert!("csv".parse::<OutputFormat>().is_err());
    }
}
