//! # Comparator Module
//!
//! Finds duplicate and near-duplicate images among a set of
//! fingerprints. Four interchangeable bucketization strategies narrow
//! the `O(n^2)` pairwise comparison down to a tractable candidate set
//! (`Strategy0D` is the unindexed baseline; `Strategy1D`/`Strategy3D`
//! bucket by brightness histogram or spatial quadrant energy;
//! `SsimStrategy` swaps the squared-difference metric for structural
//! similarity). Results are paired into `MatchOutcome`s and folded
//! into `ImageGroup`s by transitive closure, see `grouper`.

mod bucket0d;
mod bucket1d;
mod bucket3d;
mod grouper;
mod metric;
mod persist;
mod ssim;
mod traits;

pub use bucket0d::Strategy0D;
pub use bucket1d::Strategy1D;
pub use bucket3d::Strategy3D;
pub use grouper::group;
pub use metric::ADDITIONAL_DIFFERENCE_FOR_DIFFERENT_CRC32;
pub use persist::{load_results, save_results};
pub use ssim::SsimStrategy;
pub use traits::{Candidate, ComparatorStrategy};

use crate::core::fingerprint::{Defect, ImageData, ImageType, Transform};
use crate::core::hint::Hint;
use crate::core::options::CompareOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// An image as the comparator and result store see it: stable
/// identity plus the mutable bookkeeping (group membership, link
/// count, pending delete/selection) that accumulates as results are
/// produced and acted on. Shared via `Arc` across every `MatchOutcome`
/// that references it, so bookkeeping lives behind a lock instead of
/// requiring a second owning copy per result.
#[derive(Debug)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub size: u64,
    pub time: SystemTime,
    pub image_type: ImageType,
    pub width: u32,
    pub height: u32,
    pub blockiness: f64,
    pub blurring: f64,
    bookkeeping: Mutex<Bookkeeping>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Bookkeeping {
    group: Option<u32>,
    links: u32,
    removed: bool,
    selected: bool,
}

impl ImageInfo {
    pub fn from_data(data: &ImageData) -> Arc<Self> {
        Arc::new(Self {
            path: data.path.clone(),
            size: data.size,
            time: data.time,
            image_type: data.image_type,
            width: data.width,
            height: data.height,
            blockiness: data.blockiness,
            blurring: data.blurring,
            bookkeeping: Mutex::new(Bookkeeping::default()),
        })
    }

    /// Reconstruct an identity/metadata snapshot without a source
    /// `ImageData`, used by `persist::load_results` to rebuild the
    /// `ImageInfo`s a saved result file referenced.
    #[allow(clippy::too_many_arguments)]
    pub fn from_fields(
        path: PathBuf,
        size: u64,
        time: SystemTime,
        image_type: ImageType,
        width: u32,
        height: u32,
        blockiness: f64,
        blurring: f64,
    ) -> Arc<Self> {
        Arc::new(Self {
            path,
            size,
            time,
            image_type,
            width,
            height,
            blockiness,
            blurring,
            bookkeeping: Mutex::new(Bookkeeping::default()),
        })
    }

    pub fn group(&self) -> Option<u32> {
        self.bookkeeping.lock().unwrap().group
    }

    pub fn set_group(&self, group: Option<u32>) {
        self.bookkeeping.lock().unwrap().group = group;
    }

    pub fn links(&self) -> u32 {
        self.bookkeeping.lock().unwrap().links
    }

    pub fn add_link(&self) {
        self.bookkeeping.lock().unwrap().links += 1;
    }

    pub fn is_removed(&self) -> bool {
        self.bookkeeping.lock().unwrap().removed
    }

    pub fn set_removed(&self, removed: bool) {
        self.bookkeeping.lock().unwrap().removed = removed;
    }

    pub fn is_selected(&self) -> bool {
        self.bookkeeping.lock().unwrap().selected
    }

    pub fn set_selected(&self, selected: bool) {
        self.bookkeeping.lock().unwrap().selected = selected;
    }
}

/// A finding emitted by the comparator: either a single defective
/// image, or a pair of images judged near-duplicate.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Defect {
        image: Arc<ImageInfo>,
        defect: Defect,
    },
    Duplicate {
        /// Canonically ordered: `first.path <= second.path`.
        first: Arc<ImageInfo>,
        second: Arc<ImageInfo>,
        difference: f64,
        transform: Transform,
        group: Option<u32>,
        hint: Option<Hint>,
    },
}

impl MatchOutcome {
    pub fn group(&self) -> Option<u32> {
        match self {
            MatchOutcome::Defect { image, .. } => image.group(),
            MatchOutcome::Duplicate { group, .. } => *group,
        }
    }

    pub fn set_group(&mut self, group: Option<u32>) {
        match self {
            MatchOutcome::Defect { image, .. } => image.set_group(group),
            MatchOutcome::Duplicate { group: g, .. } => *g = group,
        }
    }
}

fn canonical_pair(a: Arc<ImageInfo>, b: Arc<ImageInfo>) -> (Arc<ImageInfo>, Arc<ImageInfo>) {
    if a.path <= b.path {
        (a, b)
    } else {
        (b, a)
    }
}

/// A partition cell produced by `grouper::group`: every image judged
/// transitively connected, plus the results that connect them.
#[derive(Debug, Clone)]
pub struct ImageGroup {
    pub id: u32,
    pub images: Vec<Arc<ImageInfo>>,
    pub results: Vec<MatchOutcome>,
    /// True once a user action (delete/rename) invalidates the hints
    /// previously computed for this group, signalling the hint engine
    /// should be re-run before the group is acted on again.
    pub invalid_hint: bool,
}

/// Accumulates `MatchOutcome`s as the comparator runs, filtering out
/// anything the mistake store has suppressed and deduplicating
/// transform-search hits against the same pair.
#[derive(Default)]
pub struct ResultStore {
    results: Vec<MatchOutcome>,
    seen_pairs: std::collections::HashSet<(PathBuf, PathBuf)>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a duplicate pair found by a strategy. Returns `false` if
    /// the pair was suppressed (already a known mistake, or a repeat
    /// hit from a second transform against the same path pair).
    pub fn add_duplicate(
        &mut self,
        a: Arc<ImageInfo>,
        b: Arc<ImageInfo>,
        difference: f64,
        transform: Transform,
        is_mistake: impl FnOnce(&Path, &Path) -> bool,
    ) -> bool {
        let (first, second) = canonical_pair(a, b);
        if is_mistake(&first.path, &second.path) {
            return false;
        }
        let key = (first.path.clone(), second.path.clone());
        if !self.seen_pairs.insert(key) {
            return false;
        }
        first.add_link();
        second.add_link();
        self.results.push(MatchOutcome::Duplicate {
            first,
            second,
            difference,
            transform,
            group: None,
            hint: None,
        });
        true
    }

    pub fn add_defect(&mut self, image: Arc<ImageInfo>, defect: Defect, is_mistake: impl FnOnce(&Path) -> bool) -> bool {
        if is_mistake(&image.path) {
            return false;
        }
        self.results.push(MatchOutcome::Defect { image, defect });
        true
    }

    pub fn results(&self) -> &[MatchOutcome] {
        &self.results
    }

    pub fn into_results(self) -> Vec<MatchOutcome> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Below this collection size, indexing buys nothing over the single
/// bucket.
const SINGLE_BUCKET_LIMIT: usize = 1_000;
/// Below this collection size, the 1-D histogram bucket is enough; the
/// 3-D index only pays for itself past it.
const HISTOGRAM_BUCKET_LIMIT: usize = 10_000;

/// Picks the strategy for a run of `image_count` fingerprints.
/// `use_ssim` always wins over the bucketing choice; otherwise the
/// bucket dimensionality scales with the collection size, except that
/// the 3-D grid only supports thresholds up to its range table and
/// hands looser ones back to the 1-D histogram.
pub fn select_strategy(options: &CompareOptions, image_count: usize) -> Box<dyn ComparatorStrategy + Send> {
    if options.use_ssim {
        Box::new(SsimStrategy::default())
    } else if image_count < SINGLE_BUCKET_LIMIT {
        Box::new(Strategy0D::default())
    } else if image_count < HISTOGRAM_BUCKET_LIMIT || options.threshold > bucket3d::THRESHOLD_DIFFERENCE_MAX {
        Box::new(Strategy1D::new())
    } else {
        Box::new(Strategy3D::new(options.threshold))
    }
}
