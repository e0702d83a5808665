//! Report Metadata Collection
//!
//! Host details (OS, architecture, CPU model and core count) plus the run
//! parameters. The CPU model is read from `/proc/cpuinfo` and degrades to
//! "Unknown" on other platforms.

use chrono::Utc;
use duelbench_core::Suite;
use duelbench_report::{HostInfo, ReportMeta, SCHEMA_VERSION};

/// Build report metadata for a run of `suite`
pub fn build_report_meta(suite: &Suite, iterations: u64) -> ReportMeta {
    let host = HostInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: num_cpus(),
    };

    ReportMeta {
        schema_version: SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        suite: suite.name().to_string(),
        iterations,
        seed: suite.seed(),
        host,
    }
}

/// Get CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("model name"))
                    .and_then(|l| l.split(':').nth(1))
                    .map(|s| s.trim().to_string())
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}
