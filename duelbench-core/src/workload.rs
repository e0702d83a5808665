//! Workload Registry
//!
//! The harness never knows what a workload does. A host binary registers each
//! competing back-end as a [`SystemDef`] in a [`Suite`]; the worker builds the
//! workload from its factory and drives it one iteration at a time.

use crate::recorder::Recorder;
use duelbench_ipc::ProtocolError;
use std::error::Error as StdError;
use thiserror::Error;

/// Default seed handed to workload factories
pub const DEFAULT_SEED: u64 = 0x5eed_d0e1;

/// Errors raised by workloads and the recording primitive
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// A step observed a result that violates its expectations
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// A category or step name cannot be carried by the line protocol
    #[error("invalid step label {label:?}: contains {reason}")]
    InvalidLabel {
        /// The rejected label
        label: String,
        /// What made it unencodable
        reason: &'static str,
    },

    /// The system under test reported an error
    #[error("{context}: {source}")]
    Backend {
        /// What the workload was doing
        context: String,
        /// Underlying back-end error
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl WorkloadError {
    /// Build an assertion failure
    pub fn assertion(message: impl Into<String>) -> Self {
        WorkloadError::Assertion(message.into())
    }

    /// Wrap a back-end error with context
    pub fn backend(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        WorkloadError::Backend {
            context: context.into(),
            source: source.into(),
        }
    }
}

impl From<ProtocolError> for WorkloadError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::InvalidLabel { label, reason } => {
                WorkloadError::InvalidLabel { label, reason }
            }
            other => WorkloadError::backend("protocol", other),
        }
    }
}

/// Fail with an assertion error unless `condition` holds
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), WorkloadError> {
    if condition {
        Ok(())
    } else {
        Err(WorkloadError::Assertion(message()))
    }
}

/// Parameters a workload factory receives
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Identifier of the system being built
    pub system: String,
    /// Number of iterations the worker will run
    pub iterations: u64,
    /// Seed for any pseudo-random test data
    pub seed: u64,
}

/// A benchmark workload bound to one system under test
pub trait Workload {
    /// Drop deferred state before the timed window of the next iteration.
    fn settle(&mut self) {}

    /// Run one iteration, wrapping every timed operation in [`Recorder::record`].
    fn run(&mut self, recorder: &mut Recorder) -> Result<(), WorkloadError>;
}

/// Factory that builds a fresh workload inside the worker process
pub type WorkloadFactory = fn(&WorkloadConfig) -> Result<Box<dyn Workload>, WorkloadError>;

/// A registered system under test
#[derive(Debug, Clone)]
pub struct SystemDef {
    /// Identifier used on the command line and in the worker protocol
    pub id: &'static str,
    /// Human-readable name used in reports
    pub name: &'static str,
    /// Builds the workload for this system
    pub factory: WorkloadFactory,
}

impl SystemDef {
    /// Create a new system definition
    pub fn new(id: &'static str, name: &'static str, factory: WorkloadFactory) -> Self {
        Self { id, name, factory }
    }
}

/// The set of competing systems a harness binary knows about
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    systems: Vec<SystemDef>,
    seed: u64,
}

impl Suite {
    /// Create an empty suite
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            systems: Vec::new(),
            seed: DEFAULT_SEED,
        }
    }

    /// Register a system. Registration order decides the default baseline/candidate.
    pub fn system(mut self, def: SystemDef) -> Self {
        self.systems.push(def);
        self
    }

    /// Override the seed handed to workload factories
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Suite name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seed handed to workload factories
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// All registered systems, in registration order
    pub fn systems(&self) -> &[SystemDef] {
        &self.systems
    }

    /// Look up a system by identifier
    pub fn find(&self, id: &str) -> Option<&SystemDef> {
        self.systems.iter().find(|s| s.id == id)
    }
}
