//! # Options Module
//!
//! Typed configuration aggregate and the path-set model: four option
//! groups the engine's API surface exposes independently, plus the
//! four directory-root sets that steer scanning and hinting.
//!
//! ## Modules
//! - `search` - roots, recursion, attribute gating, format set
//! - `compare` - threshold, transforms, strategy selection knobs
//! - `defect` - blockiness/blurring thresholds, size filters
//! - `advanced` - thread counts, queue sizes, undo depth
//! - `paths` - the four path sets (`Search`, `Ignore`, `Valid`, `Delete`)

mod advanced;
mod compare;
mod defect;
mod paths;
mod search;

pub use advanced::{AdvancedOptions, COLLECT_THREAD_QUEUE_SIZE_MAX, DEFAULT_THREAD_SLEEP_INTERVAL_MS};
pub use compare::{CompareOptions, DENOMINATOR};
pub use defect::DefectOptions;
pub use paths::{PathKind, PathSet};
pub use search::SearchOptions;

/// The full option aggregate, one instance per engine session.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Options {
    pub search: SearchOptions,
    pub compare: CompareOptions,
    pub defect: DefectOptions,
    pub advanced: AdvancedOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_internally_consistent() {
        let options = Options::default();
        assert!(options.compare.threshold <= 100);
        assert!(options.advanced.undo_queue_size > 0);
    }
}
