//! SSIM comparator: an alternative to the squared-difference metric,
//! selected when `CompareOptions::use_ssim` is set. Indexes everything
//! in a single bucket (no spatial pre-filter applies to a structural
//! similarity score) and reports `100 * (1 - ssim)` so it lives on
//! the same `0..=100` difference scale as the other strategies.
//!
//! The per-image mean and variance come from the fields the collector
//! stamped on `ImageData` when it built the pyramid; a fingerprint
//! hydrated from an old cache record carries zeros there, so the view
//! is the fallback.

use crate::core::fingerprint::{GrayView, ImageData};
use crate::core::options::CompareOptions;

use super::traits::{Candidate, ComparatorStrategy};

const C1: f64 = 6.5025; // (0.01 * 255)^2
const C2: f64 = 58.5225; // (0.03 * 255)^2

fn cached_stats(data: &ImageData, view: &GrayView) -> (f64, f64) {
    if data.average != 0.0 || data.variance != 0.0 {
        (data.average, data.variance)
    } else {
        (view.average(), view.variance())
    }
}

fn ssim(a: &ImageData, av: &GrayView, b: &ImageData, bv: &GrayView) -> f64 {
    let (mean_a, var_a) = cached_stats(a, av);
    let (mean_b, var_b) = cached_stats(b, bv);
    let covariance: f64 = av
        .data
        .iter()
        .zip(bv.data.iter())
        .map(|(&x, &y)| (x as f64 - mean_a) * (y as f64 - mean_b))
        .sum::<f64>()
        / av.data.len().max(1) as f64;

    ((2.0 * mean_a * mean_b + C1) * (2.0 * covariance + C2))
        / ((mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2))
}

fn compare_ssim(a: &ImageData, b: &ImageData, options: &CompareOptions) -> Option<f64> {
    if options.type_control && a.image_type != b.image_type {
        return None;
    }
    let (main_a, main_b) = (a.pixel_data.main()?, b.pixel_data.main()?);
    let score = ssim(a, main_a, b, main_b).clamp(-1.0, 1.0);
    let difference = ((1.0 - score) * 100.0).clamp(0.0, 100.0);
    let threshold_unit = options.threshold as f64;
    if difference > threshold_unit {
        None
    } else {
        Some(difference)
    }
}

#[derive(Default)]
pub struct SsimStrategy {
    bucket: Vec<ImageData>,
}

impl ComparatorStrategy for SsimStrategy {
    fn candidates(
        &self,
        data: &ImageData,
        options: &CompareOptions,
        compare_inside_one_folder: bool,
    ) -> Vec<Candidate<'_>> {
        self.bucket
            .iter()
            .filter(|other| compare_inside_one_folder || other.index != data.index)
            .filter_map(|other| {
                compare_ssim(data, other, options)
                    .map(|difference| Candidate { other, difference, transform: crate::core::fingerprint::Transform::Turn0 })
            })
            .collect()
    }

    fn insert(&mut self, data: ImageData) {
        self.bucket.push(data);
    }

    fn len(&self) -> usize {
        self.bucket.len()
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
        data
    }

    #[test]
    fn identical_uniform_images_are_perfectly_similar() {
        let a = image("/a.jpg", 0, 128);
        let b = image("/b.jpg", 1, 128);
        let diff = compare_ssim(&a, &b, &CompareOptions::default()).unwrap();
        assert!(diff < 1.0);
    }
}
