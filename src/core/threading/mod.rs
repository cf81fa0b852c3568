//! # Threading Module
//!
//! The two worker pools that run one search: a collector pool
//! (decode + pyramid + defect classification, one bounded queue per
//! worker) and a comparator pool (sharded bucket index, broadcast
//! dispatch with a round-robin designated owner). Coordination is
//! plain OS threads over crossbeam channels; `rayon` is used only for
//! data parallelism inside a single defect computation
//! (`core::quality::blurring`), not for pool coordination.

mod collector_pool;
mod comparator_pool;
mod status;

pub use collector_pool::CollectorPool;
pub use comparator_pool::{ComparatorPool, SharedFindings};
pub use status::{Statistic, Status, ThreadProgress};

/// Which pool a worker belongs to, for `status_get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadKind {
    Collector,
    Comparator,
}

/// OS scheduling priority the search main loop requests for a pool
/// over its lifetime. `std::thread` has no portable priority API, so
/// applying this is a documented no-op rather than a real scheduling
/// change; kept as a first-class type so call sites already read the
/// way a platform-specific backend would plug in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    BelowNormal,
    Low,
    Normal,
}

/// Request a priority change for a pool. No-op on every platform this
/// crate targets; see the type's doc comment.
pub fn set_priority(_kind: ThreadKind, _priority: Priority) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_kind_distinguishes_pools() {
        assert_ne!(ThreadKind::Collector, ThreadKind::Comparator);
    }
}
