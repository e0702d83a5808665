#![warn(missing_docs)]
//! DuelBench Core - Worker Runtime
//!
//! This crate provides the execution environment for workloads:
//! - `Recorder` for timing and allocation capture of individual steps
//! - `Workload`/`Suite` registry of the competing systems
//! - `WorkerMain`, the worker-side iteration loop and protocol output
//! - Global allocator interceptor for memory tracking

mod allocator;
mod measure;
mod recorder;
mod worker;
mod workload;

pub use allocator::{
    TrackingAllocator, allocation_tracking_active, current_allocation, reset_allocation_counter,
};
pub use measure::{Timer, pin_to_cpu, reclaim_memory};
pub use recorder::Recorder;
pub use worker::{WorkerError, WorkerMain};
pub use workload::{
    DEFAULT_SEED, Suite, SystemDef, Workload, WorkloadConfig, WorkloadError, WorkloadFactory,
    ensure,
};
