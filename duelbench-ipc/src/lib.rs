#![warn(missing_docs)]
//! DuelBench IPC Protocol
//!
//! Text protocol for master-worker communication. Workers print one line per
//! measurement on stdout; the master captures the stream and decodes it after
//! the worker exits. Unrecognized lines are ignored, so workers may freely mix
//! diagnostics into the same stream.

mod protocol;
mod step;

pub use protocol::{
    ERROR_PREFIX, FIELD_DELIMITER, LineWriter, ProtocolError, START_PREFIX, STEP_PREFIX,
    SUCCESS_PREFIX, WorkerLine, decode_output, decode_step, encode_step, find_error, parse_line,
    validate_label,
};
pub use step::{RunResult, Step};

/// Flag that switches a harness binary into worker mode
pub const WORKER_FLAG: &str = "--worker";

/// Test kind passed to workers; the only kind the harness runs today
pub const TEST_TYPE_PERFORMANCE: &str = "performance";

/// Worker exit status when every iteration succeeded
pub const EXIT_SUCCESS: i32 = 0;

/// Worker exit status after a workload error or panic
pub const EXIT_WORKER_ERROR: i32 = 1;

/// Master exit status when a worker fails and the run is abandoned
pub const EXIT_FATAL_ABORT: i32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_WORKER_ERROR);
        assert_ne!(EXIT_WORKER_ERROR, EXIT_FATAL_ABORT);
    }
}
