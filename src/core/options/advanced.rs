//! Advanced options: thread counts, queue sizes, and undo depth.
//! Defaults scale with the host machine's CPU count.

/// Maximum items queued per collector worker before the dispatcher
/// busy-waits for room.
pub const COLLECT_THREAD_QUEUE_SIZE_MAX: usize = 16;

/// Sleep interval, in milliseconds, a worker waits before re-polling an
/// empty queue.
pub const DEFAULT_THREAD_SLEEP_INTERVAL_MS: u64 = 2;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdvancedOptions {
    /// Number of collector workers; `None` means `cpus - 1`.
    pub collector_threads: Option<usize>,
    /// Number of comparator workers; `None` means the size-dependent
    /// default described in the thread-manager component.
    pub comparator_threads: Option<usize>,
    /// Bound on the undo/redo deque length.
    pub undo_queue_size: usize,
    /// Reduced-image pyramid side length for the "main" view. Must be a
    /// power of two, at least 16.
    pub reduced_image_size: u32,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            collector_threads: None,
            comparator_threads: None,
            undo_queue_size: 10,
            reduced_image_size: 16,
        }
    }
}

impl AdvancedOptions {
    pub fn resolved_collector_threads(&self) -> usize {
        self.collector_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(2).saturating_sub(1).max(1))
    }

    pub fn resolved_comparator_threads(&self, image_count: usize, transformed_image: bool) -> usize {
        if let Some(n) = self.comparator_threads {
            return n.max(1);
        }
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(2);
        if image_count > 10_000 || transformed_image {
            cpus.max(1)
        } else {
            (cpus / 2).max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparator_threads_scale_with_collection_size() {
        let options = AdvancedOptions::default();
        let small = options.resolved_comparator_threads(100, false);
        let large = options.resolved_comparator_threads(20_000, false);
        assert!(large >= small);
    }

    #[test]
    fn reduced_image_size_defaults_to_sixteen() {
        assert_eq!(AdvancedOptions::default().reduced_image_size, 16);
    }
}
