//! JSON Output

use crate::report::Report;

/// Generate a prettified JSON report.
///
/// Durations are reported in milliseconds, allocations in bytes.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{HostInfo, ReportMeta, SCHEMA_VERSION};
    use chrono::Utc;
    use duelbench_ipc::Step;
    use duelbench_stats::{aggregate_steps, compare_aggregates};
    use std::time::Duration;

    fn meta() -> ReportMeta {
        ReportMeta {
            schema_version: SCHEMA_VERSION,
            version: "0.1.0".to_string(),
            timestamp: Utc::now(),
            suite: "stores".to_string(),
            iterations: 3,
            seed: 7,
            host: HostInfo {
                os: "linux".to_string(),
                arch: "x86_64".to_string(),
                cpu: "Unknown".to_string(),
                cpu_cores: 1,
            },
        }
    }

    #[test]
    fn test_json_report() {
        let a = aggregate_steps(&[Step::new("Ops", "Insert", Duration::from_millis(10), 64)]);
        let b = aggregate_steps(&[Step::new("Ops", "Insert", Duration::from_millis(5), 64)]);
        let comparison = compare_aggregates("A", &a, "B", &b);

        let report = Report::new(meta())
            .with_system("A", &a)
            .with_system("B", &b)
            .with_comparison(&comparison);
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["meta"]["schema_version"], 1);
        assert_eq!(value["systems"][0]["system"], "A");
        assert_eq!(value["systems"][0]["categories"][0]["steps"][0]["avg_ms"], 10.0);

        let entry = &value["comparison"]["entries"][0];
        assert_eq!(entry["name"], "Insert");
        assert_eq!(entry["time_ms"]["verdict"], "candidate_better");
        assert_eq!(entry["time_ms"]["percent"], 50.0);
        assert_eq!(entry["time_ms"]["label"], "B improved by 50.0%");
        assert_eq!(entry["alloc_bytes"]["verdict"], "equal");
        assert_eq!(value["comparison"]["time_summary"]["candidate_better"], 1);
    }

    #[test]
    fn test_missing_side_serializes_as_null() {
        let a = aggregate_steps(&[Step::new("Ops", "Insert", Duration::from_millis(1), 0)]);
        let comparison = compare_aggregates("A", &a, "B", &Default::default());
        let report = Report::new(meta()).with_comparison(&comparison);

        let value: serde_json::Value =
            serde_json::from_str(&generate_json_report(&report).unwrap()).unwrap();
        let entry = &value["comparison"]["entries"][0];
        assert!(entry["time_ms"]["candidate"].is_null());
        assert_eq!(entry["time_ms"]["verdict"], "missing");
        assert_eq!(entry["time_ms"]["label"], "no data");
    }
}
