//! 3-D spatial bucket strategy: the 4x4 fast view is split into four
//! 2x2 quadrant sums; a fingerprint is indexed by overall brightness
//! plus the left-right and top-bottom quadrant differences. This
//! separates images that share overall brightness but differ in where
//! the light falls, narrowing candidate sets further than the 1-D
//! histogram bucket.
//!
//! The grid is a bounded flat array, not a map: the brightness axis
//! has `max_range` cells and each difference axis half that, with the
//! difference axes centered (shifted by a quarter range) since the
//! quadrant differences of real images cluster around zero. Looser
//! thresholds search wider neighborhoods, so they get coarser grids
//! to keep the scanned bucket count flat.

use crate::core::fingerprint::{GrayView, ImageData};
use crate::core::options::{CompareOptions, DENOMINATOR};

use super::traits::{compare_with_transforms, Candidate, ComparatorStrategy};

/// Grid resolution per threshold percent.
const MAX_RANGES: [i32; 11] = [48, 48, 48, 48, 48, 48, 40, 32, 28, 24, 24];

/// Largest threshold the 3-D index supports; `select_strategy` falls
/// back to the 1-D histogram above it.
pub(super) const THRESHOLD_DIFFERENCE_MAX: u32 = DENOMINATOR / 10;

#[derive(Clone, Copy)]
struct Index {
    s: i32,
    x: i32,
    y: i32,
}

fn quadrant_sums(fast: &GrayView) -> [i32; 4] {
    let half = fast.side / 2;
    let mut sums = [0i32; 4];
    for y in 0..fast.side {
        for x in 0..fast.side {
            let quadrant = (if y < half { 0 } else { 2 }) + if x < half { 0 } else { 1 };
            sums[quadrant] += fast.get(x, y) as i32;
        }
    }
    sums
}

pub struct Strategy3D {
    max_range: i32,
    shift: Index,
    range: Index,
    stride: Index,
    half_compare_range: i32,
    sets: Vec<Vec<ImageData>>,
}

impl Strategy3D {
    pub fn new(threshold: u32) -> Self {
        let max_range = MAX_RANGES[threshold.min(THRESHOLD_DIFFERENCE_MAX) as usize];
        let shift = Index { s: 0, x: max_range >> 2, y: max_range >> 2 };
        let range = Index { s: max_range, x: max_range >> 1, y: max_range >> 1 };
        let stride = Index { s: range.x * range.y, x: range.y, y: 1 };
        let half_compare_range =
            (0.5 + max_range as f64 * threshold as f64 / DENOMINATOR as f64).ceil() as i32;
        Self {
            max_range,
            shift,
            range,
            stride,
            half_compare_range,
            sets: vec![Vec::new(); (range.s * range.x * range.y) as usize],
        }
    }

    /// Grid cell for a fingerprint. Quadrant sums top out at 4080, so
    /// `* max_range >> 12` maps each raw axis into `0..max_range`; the
    /// difference axes are offset by `0x7FF` to re-center their
    /// `-2040..=2040` span before the same mapping.
    fn index_of(&self, data: &ImageData) -> Index {
        let Some(fast) = data.pixel_data.fast() else {
            return Index { s: 0, x: 0, y: 0 };
        };
        let [tl, tr, bl, br] = quadrant_sums(fast);
        let s = ((tl + tr + bl + br) * self.max_range) >> 12;
        let x = ((tl - tr + bl - br + 0x7FF) * self.max_range) >> 12;
        let y = ((tl + tr - bl - br + 0x7FF) * self.max_range) >> 12;
        Index {
            s: (s - self.shift.s).clamp(0, self.range.s - 1),
            x: (x - self.shift.x).clamp(0, self.range.x - 1),
            y: (y - self.shift.y).clamp(0, self.range.y - 1),
        }
    }

    fn slot(&self, index: Index) -> usize {
        (index.s * self.stride.s + index.x * self.stride.x + index.y * self.stride.y) as usize
    }
}

impl ComparatorStrategy for Strategy3D {
    fn candidates(
        &self,
        data: &ImageData,
        options: &CompareOptions,
        compare_inside_one_folder: bool,
    ) -> Vec<Candidate<'_>> {
        let i = self.index_of(data);
        let h = self.half_compare_range;
        let mut out = Vec::new();
        for s in (i.s - h).max(0)..(i.s + h).min(self.range.s) {
            for x in (i.x - h).max(0)..(i.x + h).min(self.range.x) {
                for y in (i.y - h).max(0)..(i.y + h).min(self.range.y) {
                    let set = &self.sets[self.slot(Index { s, x, y })];
                    for other in set {
                        out.extend(compare_with_transforms(data, other, options, compare_inside_one_folder));
                    }
                }
            }
        }
        out
    }

    fn insert(&mut self, data: ImageData) {
        let slot = self.slot(self.index_of(&data));
        self.sets[slot].push(data);
    }

    fn len(&self) -> usize {
        self.sets.iter().map(Vec::len).sum()
    }
}

impl Default for Strategy3D {
    fn default() -> Self {
        Self::new(CompareOptions::default().threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::Pyramid;
    use crate::core::scanner::FileInfo;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn image(path: &str, index: usize, fill: u8) -> ImageData {
        let info = FileInfo::new(PathBuf::from(path), 100, SystemTime::UNIX_EPOCH, index);
        let mut data = ImageData::from_file_info(&info, false);
        data.pixel_data = Pyramid::build(GrayView::new(256, vec![fill; 256 * 256]), 16);
        data.crc32 = fill as u32;
        data
    }

    #[test]
    fn identical_uniform_images_land_in_same_bucket_and_match() {
        let mut strategy = Strategy3D::new(5);
        strategy.insert(image("/a.jpg", 0, 90));
        let hits = strategy.candidates(&image("/b.jpg", 1, 90), &CompareOptions::default(), false);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn far_apart_brightness_misses_at_a_tight_threshold() {
        let mut strategy = Strategy3D::new(0);
        strategy.insert(image("/a.jpg", 0, 10));
        let mut options = CompareOptions::default();
        options.threshold = 0;
        let hits = strategy.candidates(&image("/b.jpg", 1, 250), &options, false);
        assert!(hits.is_empty());
    }

    #[test]
    fn extreme_values_stay_inside_the_grid() {
        for threshold in [0u32, 5, 10, 50] {
            let mut strategy = Strategy3D::new(threshold);
            strategy.insert(image("/black.jpg", 0, 0));
            strategy.insert(image("/white.jpg", 1, 255));
            assert_eq!(strategy.len(), 2);
        }
    }

    #[test]
    fn grid_coarsens_as_the_threshold_loosens() {
        assert!(Strategy3D::new(0).sets.len() > Strategy3D::new(10).sets.len());
    }
}
