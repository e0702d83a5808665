//! Worker Process Entry Point
//!
//! Handles the worker side of the master-worker architecture. The worker
//! builds one system's workload, runs it for the requested number of
//! iterations, and prints every recorded step to stdout using the line
//! protocol. The batch is atomic: any error or panic ends the run with a
//! `SLAVE_ERROR:` line and a non-zero exit status.

use crate::measure::{pin_to_cpu, reclaim_memory};
use crate::recorder::Recorder;
use crate::workload::{Suite, WorkloadConfig, WorkloadError};
use duelbench_ipc::{EXIT_SUCCESS, EXIT_WORKER_ERROR, LineWriter, ProtocolError};
use std::io::Write;
use thiserror::Error;

/// Errors that end a worker run
#[derive(Debug, Error)]
pub enum WorkerError {
    /// No system with the requested id is registered
    #[error("unknown system: {0}")]
    UnknownSystem(String),

    /// The workload or its factory returned an error
    #[error("workload failed: {0}")]
    Workload(#[from] WorkloadError),

    /// The workload panicked; holds the panic message
    #[error("workload panicked: {0}")]
    Panic(String),

    /// Protocol output could not be written
    #[error("failed to write measurements: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Worker main loop
pub struct WorkerMain<W: Write> {
    writer: LineWriter<W>,
}

impl WorkerMain<std::io::Stdout> {
    /// Create a worker that reports on stdout
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }
}

impl Default for WorkerMain<std::io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> WorkerMain<W> {
    /// Create a worker that reports to an arbitrary writer
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer: LineWriter::new(writer),
        }
    }

    /// Run the worker and translate the outcome into a process exit status.
    ///
    /// On failure the `SLAVE_ERROR:` line is written before returning.
    pub fn execute(&mut self, suite: &Suite, system: &str, iterations: u64) -> i32 {
        match self.run(suite, system, iterations) {
            Ok(steps) => {
                tracing::debug!(system, iterations, steps, "worker finished");
                EXIT_SUCCESS
            }
            Err(e) => {
                tracing::error!(system, error = %e, "worker failed");
                if let Err(write_err) = self.writer.write_error(&e.to_string()) {
                    tracing::error!(error = %write_err, "could not report worker failure");
                }
                EXIT_WORKER_ERROR
            }
        }
    }

    /// Run every iteration of `system`, returning the number of steps emitted
    pub fn run(&mut self, suite: &Suite, system: &str, iterations: u64) -> Result<usize, WorkerError> {
        let def = suite
            .find(system)
            .ok_or_else(|| WorkerError::UnknownSystem(system.to_string()))?;

        if let Err(e) = pin_to_cpu(0) {
            tracing::debug!(error = %e, "could not pin worker to CPU 0");
        }

        self.writer
            .write_start(&format!("{} x{}", def.id, iterations))?;

        let config = WorkloadConfig {
            system: def.id.to_string(),
            iterations,
            seed: suite.seed(),
        };
        let mut workload = (def.factory)(&config)?;
        let mut recorder = Recorder::new();
        let mut emitted = 0usize;

        for iteration in 0..iterations {
            // Reclaim before the timed window so the previous iteration's garbage
            // is not billed to this one.
            workload.settle();
            reclaim_memory();

            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                workload.run(&mut recorder)
            }));

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(WorkerError::Workload(e)),
                Err(panic) => {
                    let message = if let Some(s) = panic.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    return Err(WorkerError::Panic(message));
                }
            }

            for step in recorder.steps() {
                self.writer.write_step(step)?;
            }
            self.writer.flush()?;

            tracing::debug!(iteration, steps = recorder.len(), "iteration complete");
            emitted += recorder.len();
            recorder.clear();
        }

        self.writer
            .write_success(&format!("{emitted} steps recorded"))?;
        Ok(emitted)
    }

    /// Consume the worker and return the underlying writer
    pub fn into_inner(self) -> W {
        match self.writer.into_inner().into_inner() {
            Ok(writer) => writer,
            Err(e) => e.into_inner().into_parts().0,
        }
    }
}
