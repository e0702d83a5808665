#![warn(missing_docs)]
//! # DuelBench
//!
//! Head-to-head benchmark harness: runs the same workload against two
//! competing back-ends and reports, step by step, which one was faster and
//! which one allocated less.
//!
//! - **Process Isolation**: each system runs in its own worker process, so
//!   one back-end's heap and caches never bleed into the other's numbers
//! - **Line Protocol**: workers print `SLAVE_STEP:` lines; the master decodes
//!   them fail-open, ignoring anything else on the stream
//! - **Allocation Tracking**: `TrackingAllocator` attributes heap growth to
//!   individual steps
//! - **Comparison Tables**: per-category summaries and a side-by-side verdict
//!   for time and allocation
//!
//! ## Quick Start
//!
//! ```ignore
//! use duelbench::prelude::*;
//!
//! struct BTreeStore { map: std::collections::BTreeMap<u64, String> }
//!
//! impl Workload for BTreeStore {
//!     fn run(&mut self, rec: &mut Recorder) -> Result<(), WorkloadError> {
//!         rec.measure("Users", "Insert", || {
//!             for i in 0..1000 {
//!                 self.map.insert(i, format!("user{i}"));
//!             }
//!         })?;
//!         Ok(())
//!     }
//! }
//!
//! fn btree(_: &WorkloadConfig) -> Result<Box<dyn Workload>, WorkloadError> {
//!     Ok(Box::new(BTreeStore { map: Default::default() }))
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let suite = Suite::new("stores")
//!         .system(SystemDef::new("btree", "BTreeMap", btree))
//!         .system(SystemDef::new("hash", "HashMap", hash));
//!     duelbench::run(&suite)
//! }
//! ```

// Re-export core types
pub use duelbench_core::{
    DEFAULT_SEED, Recorder, Suite, SystemDef, TrackingAllocator, WorkerMain, Workload,
    WorkloadConfig, WorkloadError, WorkloadFactory, current_allocation, ensure,
    reset_allocation_counter,
};

// Re-export protocol types
pub use duelbench_ipc::{RunResult, Step, decode_output, encode_step};

// Re-export stats
pub use duelbench_stats::{
    Aggregate, AggregatedStep, Comparison, ComparisonStep, RelativeDiff, aggregate_steps,
    compare_aggregates,
};

// Re-export report rendering
pub use duelbench_report::{
    OutputFormat, format_comparison, format_system_summary, generate_json_report, render_table,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Recorder, Suite, SystemDef, TrackingAllocator, Workload, WorkloadConfig, WorkloadError,
        ensure,
    };
}

/// Run the DuelBench CLI harness.
///
/// Call this from your harness binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     duelbench::run(&suite())
/// }
/// ```
pub use duelbench_cli::run;
