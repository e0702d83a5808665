//! Recorder - The Step Recording API
//!
//! Workloads wrap every timed operation in [`Recorder::record`]. The recorder
//! measures wall-clock time and heap growth around the action and keeps one
//! [`Step`] per call until the worker flushes them at the end of the iteration.

use crate::allocator::current_allocation;
use crate::measure::Timer;
use crate::workload::WorkloadError;
use duelbench_ipc::{Step, validate_label};

/// Collects measurement records for the current iteration.
///
/// Steps must run one after another: elapsed time and allocations are
/// attributed entirely to the action being recorded.
pub struct Recorder {
    steps: Vec<Step>,
    track_allocations: bool,
}

impl Recorder {
    /// Create a recorder with allocation tracking enabled
    pub fn new() -> Self {
        Self::with_allocation_tracking(true)
    }

    /// Create a recorder, choosing whether allocation deltas are captured
    pub fn with_allocation_tracking(track_allocations: bool) -> Self {
        Self {
            steps: Vec::with_capacity(64),
            track_allocations,
        }
    }

    /// Time `action` and record it as `category`/`name`.
    ///
    /// An error returned by the action is logged and handed back unchanged,
    /// and no record is kept for the failed step. Labels that cannot be carried
    /// by the line protocol are rejected before the action runs.
    pub fn record<T, F>(&mut self, category: &str, name: &str, action: F) -> Result<T, WorkloadError>
    where
        F: FnOnce() -> Result<T, WorkloadError>,
    {
        validate_label(category)?;
        validate_label(name)?;

        let bytes_before = self.allocated_bytes();
        let timer = Timer::start();

        let result = std::hint::black_box(action());

        let duration = timer.stop();
        let allocated_bytes = self.allocated_bytes().saturating_sub(bytes_before);

        match result {
            Ok(value) => {
                self.steps
                    .push(Step::new(category, name, duration, allocated_bytes));
                Ok(value)
            }
            Err(e) => {
                tracing::error!(category, name, error = %e, "step failed");
                Err(e)
            }
        }
    }

    /// Record an action that cannot fail
    pub fn measure<T, F>(&mut self, category: &str, name: &str, action: F) -> Result<T, WorkloadError>
    where
        F: FnOnce() -> T,
    {
        self.record(category, name, || Ok(action()))
    }

    #[inline]
    fn allocated_bytes(&self) -> u64 {
        if self.track_allocations {
            current_allocation().0
        } else {
            0
        }
    }

    /// Steps recorded since the last [`Recorder::clear`]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Take ownership of the recorded steps, leaving the recorder empty
    pub fn take_steps(&mut self) -> Vec<Step> {
        std::mem::take(&mut self.steps)
    }

    /// Discard recorded steps
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps have been recorded
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_record_keeps_order() {
        let mut recorder = Recorder::new();

        recorder.measure("Users", "Insert", || 1 + 1).unwrap();
        recorder.measure("Users", "Query", || ()).unwrap();
        recorder.measure("Files", "Upload", || ()).unwrap();

        let names: Vec<_> = recorder
            .steps()
            .iter()
            .map(|s| (s.category.as_str(), s.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![("Users", "Insert"), ("Users", "Query"), ("Files", "Upload")]
        );
    }

    #[test]
    fn test_record_measures_time() {
        let mut recorder = Recorder::new();
        recorder
            .measure("Ops", "Sleep", || std::thread::sleep(Duration::from_millis(5)))
            .unwrap();
        assert!(recorder.steps()[0].duration >= Duration::from_millis(4));
    }

    #[test]
    fn test_record_returns_value() {
        let mut recorder = Recorder::new();
        let value = recorder.record("Ops", "Count", || Ok(42)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_error_propagates_unchanged() {
        let mut recorder = Recorder::new();
        let result: Result<(), _> = recorder.record("Ops", "Update", || {
            Err(WorkloadError::assertion("expected a non-zero update count"))
        });

        match result {
            Err(WorkloadError::Assertion(message)) => {
                assert_eq!(message, "expected a non-zero update count")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_delimiter_in_label_rejected() {
        let mut recorder = Recorder::new();
        let mut ran = false;
        let result = recorder.measure("Ops", "Insert - batch", || ran = true);

        assert!(matches!(result, Err(WorkloadError::InvalidLabel { .. })));
        assert!(!ran);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_trailing_dash_label_rejected() {
        let mut recorder = Recorder::new();
        let mut ran = false;
        let result = recorder.measure("Ops", "Insert -", || ran = true);
        assert!(matches!(result, Err(WorkloadError::InvalidLabel { .. })));

        let result = recorder.measure("Ops -", "Insert", || ran = true);
        assert!(matches!(result, Err(WorkloadError::InvalidLabel { .. })));

        assert!(!ran);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_tracking_disabled_reports_zero_bytes() {
        let mut recorder = Recorder::with_allocation_tracking(false);
        recorder
            .measure("Ops", "Alloc", || vec![0u8; 4096])
            .unwrap();
        assert_eq!(recorder.steps()[0].allocated_bytes, 0);
    }

    #[test]
    fn test_take_and_clear() {
        let mut recorder = Recorder::new();
        recorder.measure("Ops", "A", || ()).unwrap();
        recorder.measure("Ops", "B", || ()).unwrap();

        let taken = recorder.take_steps();
        assert_eq!(taken.len(), 2);
        assert!(recorder.is_empty());

        recorder.measure("Ops", "C", || ()).unwrap();
        recorder.clear();
        assert_eq!(recorder.len(), 0);
    }
}
