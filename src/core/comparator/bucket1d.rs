//! 1-D histogram bucket strategy: fingerprints are indexed by
//! `(sum_of_fast_view + 8) >> 4`, a coarse brightness histogram bucket
//! in `0..256`. A candidate only needs to be compared against
//! fingerprints in buckets within `threshold`-scaled reach of its own.

use crate::core::fingerprint::ImageData;
use crate::core::options::CompareOptions;

use super::traits::{compare_with_transforms, fast_sum, Candidate, ComparatorStrategy};

const BUCKET_COUNT: usize = 256;

fn bucket_key(data: &ImageData) -> usize {
    (((fast_sum(&data.pixel_data) + 8) >> 4) as usize).min(BUCKET_COUNT - 1)
}

/// Half-width, in buckets, of the neighborhood searched around a
/// candidate's own bucket for a given percentage threshold.
fn half_reach(threshold: u32) -> usize {
    (0.5 + BUCKET_COUNT as f64 * threshold as f64 / 100.0).ceil() as usize
}

#[derive(Default)]
pub struct Strategy1D {
    buckets: Vec<Vec<ImageData>>,
}

impl Strategy1D {
    pub fn new() -> Self {
        Self { buckets: (0..BUCKET_COUNT).map(|_| Vec::new()).collect() }
    }
}

impl ComparatorStrategy for Strategy1D {
    fn candidates(
        &self,
        data: &ImageData,
        options: &CompareOptions,
        compare_inside_one_folder: bool,
    ) -> Vec<Candidate<'_>> {
        if self.buckets.is_empty() {
            return Vec::new();
        }
        let key = bucket_key(data);
        let reach = half_reach(options.threshold);
        let lo = key.saturating_sub(reach);
        let hi = (key + reach).min(BUCKET_COUNT - 1);
        self.buckets[lo..=hi]
            .iter()
            .flatten()
            .flat_map(|other| compare_with_transforms(data, other, options, compare_inside_one_folder))
            .collect()
    }

    fn insert(&mut self, data: ImageData) {
        if self.buckets.is_empty() {
            self.buckets = (0..BUCKET_COUNT).map(|_| Vec::new()).collect();
        }
        let key = bucket_key(&data);
        self.buckets[key].push(data);
    }

    fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}
