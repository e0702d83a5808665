//! Master Pipeline
//!
//! Runs the planned pair of systems and turns their output into a report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! RunPlan (baseline, candidate)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  One worker per system, decode, aggregate, compare
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   output    │  Summary + comparison tables, or JSON
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Sequential worker runs and aggregation
//! - [`output`] - Human and JSON rendering
//! - [`metadata`] - Host metadata for JSON reports

mod execution;
mod metadata;
mod output;

pub use execution::{DuelOutcome, SystemRun, execute_plan};
pub use metadata::build_report_meta;
pub use output::{build_report, format_human_output, render_output};
