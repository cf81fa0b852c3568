//! Shared run state: the cooperative-cancellation flag, per-worker
//! progress, and the running counters the engine's `statistic_get`
//! API surface exposes. Shared via `Arc` with every collector and
//! comparator worker.

use super::ThreadKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// The file a single worker is currently processing, if any.
#[derive(Debug, Clone, Default)]
pub struct ThreadProgress {
    pub current_path: Option<PathBuf>,
    pub processed: u64,
}

/// A point-in-time snapshot of the run's counters, returned by
/// `statistic_get`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statistic {
    pub fingerprinted: u64,
    pub duplicates_found: u64,
    pub defects_found: u64,
}

/// Cancellation flag, per-worker progress, and result counters. One
/// `Status` lives for the engine's lifetime and is reset by
/// `begin_run` when a new search starts, so a handle cloned out of the
/// engine before a run can still stop that run from another thread.
#[derive(Debug)]
pub struct Status {
    stopped: AtomicBool,
    collector_progress: Mutex<Vec<ThreadProgress>>,
    comparator_progress: Mutex<Vec<ThreadProgress>>,
    fingerprinted: AtomicU64,
    duplicates_found: AtomicU64,
    defects_found: AtomicU64,
}

impl Status {
    pub fn new(collector_count: usize, comparator_count: usize) -> Self {
        Self {
            stopped: AtomicBool::new(false),
            collector_progress: Mutex::new(vec![ThreadProgress::default(); collector_count]),
            comparator_progress: Mutex::new(vec![ThreadProgress::default(); comparator_count]),
            fingerprinted: AtomicU64::new(0),
            duplicates_found: AtomicU64::new(0),
            defects_found: AtomicU64::new(0),
        }
    }

    /// Reset for a fresh search: clear the stop flag and counters and
    /// resize the per-worker progress slots to this run's pool sizes.
    pub fn begin_run(&self, collector_count: usize, comparator_count: usize) {
        self.stopped.store(false, Ordering::SeqCst);
        *self.collector_progress.lock().unwrap() = vec![ThreadProgress::default(); collector_count];
        *self.comparator_progress.lock().unwrap() = vec![ThreadProgress::default(); comparator_count];
        self.fingerprinted.store(0, Ordering::Relaxed);
        self.duplicates_found.store(0, Ordering::Relaxed);
        self.defects_found.store(0, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn progress_slots(&self, kind: ThreadKind) -> &Mutex<Vec<ThreadProgress>> {
        match kind {
            ThreadKind::Collector => &self.collector_progress,
            ThreadKind::Comparator => &self.comparator_progress,
        }
    }

    pub fn set_progress(&self, kind: ThreadKind, id: usize, path: &Path) {
        let mut slots = self.progress_slots(kind).lock().unwrap();
        if let Some(progress) = slots.get_mut(id) {
            progress.current_path = Some(path.to_path_buf());
            progress.processed += 1;
        }
    }

    /// `status_get(thread_kind, id)`: the per-worker progress the API
    /// surface exposes. Returns `None` for an out-of-range id.
    pub fn status_get(&self, kind: ThreadKind, id: usize) -> Option<ThreadProgress> {
        self.progress_slots(kind).lock().unwrap().get(id).cloned()
    }

    pub fn record_fingerprinted(&self) {
        self.fingerprinted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_defect(&self) {
        self.defects_found.fetch_add(1, Ordering::Relaxed);
    }

    /// `statistic_get()`.
    pub fn statistic_get(&self) -> Statistic {
        Statistic {
            fingerprinted: self.fingerprinted.load(Ordering::Relaxed),
            duplicates_found: self.duplicates_found.load(Ordering::Relaxed),
            defects_found: self.defects_found.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_visible_across_threads() {
        let status = Status::new(1, 1);
        assert!(!status.is_stopped());
        status.stop();
        assert!(status.is_stopped());
    }

    #[test]
    fn progress_tracks_the_most_recent_path_per_worker() {
        let status = Status::new(2, 0);
        status.set_progress(ThreadKind::Collector, 0, Path::new("/a.jpg"));
        status.set_progress(ThreadKind::Collector, 0, Path::new("/b.jpg"));
        status.set_progress(ThreadKind::Collector, 1, Path::new("/c.jpg"));

        let worker0 = status.status_get(ThreadKind::Collector, 0).unwrap();
        assert_eq!(worker0.current_path, Some(PathBuf::from("/b.jpg")));
        assert_eq!(worker0.processed, 2);

        let worker1 = status.status_get(ThreadKind::Collector, 1).unwrap();
        assert_eq!(worker1.processed, 1);

        assert!(status.status_get(ThreadKind::Collector, 2).is_none());
        assert!(status.status_get(ThreadKind::Comparator, 0).is_none());
    }

    #[test]
    fn begin_run_clears_the_previous_run() {
        let status = Status::new(1, 1);
        status.stop();
        status.record_duplicate();
        status.set_progress(ThreadKind::Collector, 0, Path::new("/a.jpg"));

        status.begin_run(2, 2);

        assert!(!status.is_stopped());
        assert_eq!(status.statistic_get().duplicates_found, 0);
        assert_eq!(status.status_get(ThreadKind::Collector, 0).unwrap().processed, 0);
        assert!(status.status_get(ThreadKind::Collector, 1).is_some());
    }

    #[test]
    fn statistic_counters_accumulate() {
        let status = Status::new(1, 1);
        status.record_fingerprinted();
        status.record_fingerprinted();
        status.record_duplicate();
        status.record_defect();

        let stats = status.statistic_get();
        assert_eq!(stats.fingerprinted, 2);
        assert_eq!(stats.duplicates_found, 1);
        assert_eq!(stats.defects_found, 1);
    }
}
