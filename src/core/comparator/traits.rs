//! Strategy seam every bucketing comparator implements.

use crate::core::fingerprint::{ratio_bucket, ImageData, Pyramid, Transform};
use crate::core::options::CompareOptions;

/// One match found while probing a strategy's internal index: the
/// already-indexed fingerprint it matched against, the reported
/// difference, and which symmetry of that fingerprint produced the
/// match (`Transform::Turn0` unless `transformed_image` is enabled).
pub struct Candidate<'a> {
    pub other: &'a ImageData,
    pub difference: f64,
    pub transform: Transform,
}

/// A pluggable bucketization strategy: decides which previously-seen
/// fingerprints are worth a full pixel comparison against an incoming
/// one, then runs that comparison. `core::comparator::select_strategy`
/// picks one per run.
pub trait ComparatorStrategy {
    /// Compare `data` against every fingerprint already indexed that
    /// could plausibly match (same bucket, or a small neighborhood of
    /// buckets), returning every accepted pair.
    fn candidates(
        &self,
        data: &ImageData,
        options: &CompareOptions,
        compare_inside_one_folder: bool,
    ) -> Vec<Candidate<'_>>;

    /// Index `data` so future `candidates` calls can find it.
    fn insert(&mut self, data: ImageData);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applies every enabled transform of `b` against `a`, delegating the
/// pixel comparison itself to `metric::compare`. Shared by every
/// bucketed strategy so the transform search only needs writing once.
pub(super) fn compare_with_transforms<'a>(
    a: &ImageData,
    b: &'a ImageData,
    options: &CompareOptions,
    compare_inside_one_folder: bool,
) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    if let Some(difference) = super::metric::compare(a, b, options, compare_inside_one_folder) {
        out.push(Candidate { other: b, difference, transform: Transform::Turn0 });
    }
    if options.transformed_image {
        for &t in Transform::NON_IDENTITY.iter() {
            let mut transformed = b.clone();
            transformed.pixel_data = b.pixel_data.transformed(t);
            if quarter_turn(t) {
                // A quarter turn swaps the dimensions, and with them
                // the aspect-ratio bucket the reject chain compares.
                std::mem::swap(&mut transformed.width, &mut transformed.height);
                transformed.ratio = ratio_bucket(transformed.width, transformed.height);
            }
            if let Some(difference) = super::metric::compare(a, &transformed, options, compare_inside_one_folder) {
                out.push(Candidate { other: b, difference, transform: t });
            }
        }
    }
    out
}

fn quarter_turn(t: Transform) -> bool {
    matches!(
        t,
        Transform::Turn90 | Transform::Turn270 | Transform::MirrorTurn90 | Transform::MirrorTurn270
    )
}

pub(super) fn fast_sum(pyramid: &Pyramid) -> u32 {
    pyramid.fast().map(|v| v.sum()).unwrap_or(0)
}
