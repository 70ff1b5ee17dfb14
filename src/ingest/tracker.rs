//! Per-filename deduplication state.
//!
//! Raw filesystem notifications can fire several times for one logical
//! write (temp-file rename, flush, editor save dance). Admission collapses
//! these into a single processing attempt per "epoch" - the span from a
//! filename's first admission until a deletion clears its state.

use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local state for one filename.
#[derive(Debug, Clone, Copy, Default)]
struct PipelineState {
    /// True while a create event for this filename is being processed.
    in_flight: bool,

    /// True once the filename has been durably recorded or confirmed
    /// already present. Set only after a successful store check or write.
    completed: bool,
}

/// Tracks which filenames are in flight or already processed.
///
/// The lock is held only for the duration of a state transition, never
/// across a pipeline stage, so distinct filenames process fully in
/// parallel.
#[derive(Debug, Default)]
pub struct DedupTracker {
    entries: Mutex<HashMap<String, PipelineState>>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a create event for processing.
    ///
    /// Returns true exactly once per epoch; false while the filename is
    /// in flight or already completed. Admission atomically sets the
    /// in-flight flag, so no two concurrent callers can both be admitted.
    pub fn admit_create(&self, filename: &str) -> bool {
        let mut entries = self.entries.lock().expect("tracker lock poisoned");
        let state = entries.entry(filename.to_string()).or_default();

        if state.in_flight || state.completed {
            return false;
        }

        state.in_flight = true;
        true
    }

    /// Record a successful attempt: clears in-flight, sets completed.
    pub fn mark_completed(&self, filename: &str) {
        let mut entries = self.entries.lock().expect("tracker lock poisoned");
        let state = entries.entry(filename.to_string()).or_default();
        state.in_flight = false;
        state.completed = true;
    }

    /// Record a failed attempt: clears in-flight only, so a later create
    /// event can retry the filename.
    pub fn mark_failed(&self, filename: &str) {
        let mut entries = self.entries.lock().expect("tracker lock poisoned");
        if let Some(state) = entries.get_mut(filename) {
            state.in_flight = false;
        }
    }

    /// Unconditionally clear all state for a filename, ending its epoch.
    /// A subsequent create event is processed fresh.
    pub fn on_deleted(&self, filename: &str) {
        let mut entries = self.entries.lock().expect("tracker lock poisoned");
        entries.remove(filename);
    }

    /// Whether the filename is currently marked completed.
    pub fn is_completed(&self, filename: &str) -> bool {
        let entries = self.entries.lock().expect("tracker lock poisoned");
        entries.get(filename).map(|s| s.completed).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_admit_once_per_epoch() {
        let tracker = DedupTracker::new();

        assert!(tracker.admit_create("call.mp3"));
        assert!(!tracker.admit_create("call.mp3"));
    }

    #[test]
    fn test_completed_blocks_readmission() {
        let tracker = DedupTracker::new();

        assert!(tracker.admit_create("call.mp3"));
        tracker.mark_completed("call.mp3");
        assert!(!tracker.admit_create("call.mp3"));
        assert!(tracker.is_completed("call.mp3"));
    }

    #[test]
    fn test_failure_permits_retry() {
        let tracker = DedupTracker::new();

        assert!(tracker.admit_create("call.mp3"));
        tracker.mark_failed("call.mp3");

        // Failed attempt clears in-flight but not the epoch, so a new
        // create event is admitted again.
        assert!(tracker.admit_create("call.mp3"));
    }

    #[test]
    fn test_deletion_ends_epoch() {
        let tracker = DedupTracker::new();

        assert!(tracker.admit_create("call.mp3"));
        tracker.mark_completed("call.mp3");
        tracker.on_deleted("call.mp3");

        assert!(!tracker.is_completed("call.mp3"));
        assert!(tracker.admit_create("call.mp3"));
    }

    #[test]
    fn test_distinct_filenames_independent() {
        let tracker = DedupTracker::new();

        assert!(tracker.admit_create("a.mp3"));
        assert!(tracker.admit_create("b.mp3"));
        tracker.mark_completed("a.mp3");
        assert!(!tracker.admit_create("a.mp3"));
        assert!(!tracker.admit_create("b.mp3"));
    }

    #[test]
    fn test_concurrent_admission_single_winner() {
        let tracker = Arc::new(DedupTracker::new());
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let admitted = Arc::clone(&admitted);
                std::thread::spawn(move || {
                    if tracker.admit_create("same.wav") {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }
}
