//! Shared squared-difference arithmetic used by every bucketing
//! strategy: a cheap 4x4 fast-view pre-reject followed by a
//! frame-masked main-view threshold, with a small additive penalty
//! when the two files' raw CRC32s differ.

use crate::core::fingerprint::{GrayView, ImageData};
use crate::core::options::CompareOptions;

/// Added to the reported difference when two fingerprints pass the
/// pixel comparison but their raw bytes differ (so bit-identical files
/// always score strictly lower than near-duplicates).
pub const ADDITIONAL_DIFFERENCE_FOR_DIFFERENT_CRC32: f64 = 1e-6;

fn squared_diff(a: &GrayView, b: &GrayView) -> u64 {
    a.data
        .iter()
        .zip(b.data.iter())
        .map(|(&x, &y)| (x as i64 - y as i64).pow(2) as u64)
        .sum()
}

/// Squared-difference sum over the main view, excluding an
/// `ignore_frame_width`-pixel border on every side. Returns the sum
/// plus the number of pixels actually considered.
fn squared_diff_masked(a: &GrayView, b: &GrayView, frame: u32) -> (u64, u64) {
    let side = a.side;
    if frame * 2 >= side {
        return (squared_diff(a, b), (side * side) as u64);
    }
    let mut sum = 0u64;
    let mut count = 0u64;
    for y in frame..side - frame {
        for x in frame..side - frame {
            let d = a.get(x, y) as i64 - b.get(x, y) as i64;
            sum += (d * d) as u64;
            count += 1;
        }
    }
    (sum, count)
}

/// Compare two fingerprints under the fast-reject chain and the
/// fast/main threshold arithmetic. Returns the reported difference
/// (`0..=100`, plus the small CRC penalty) if the pair is accepted,
/// `None` if any reject fires. `compare_inside_one_folder` mirrors
/// `SearchOptions`: when false, pairs from the same search root are
/// rejected before any pixel comparison runs.
pub fn compare(
    a: &ImageData,
    b: &ImageData,
    options: &CompareOptions,
    compare_inside_one_folder: bool,
) -> Option<f64> {
    if options.type_control && a.image_type != b.image_type {
        return None;
    }
    if options.size_control && (a.width != b.width || a.height != b.height) {
        return None;
    }
    if options.ratio_control && a.ratio.abs_diff(b.ratio) > 1 {
        return None;
    }
    if !compare_inside_one_folder && a.index == b.index {
        return None;
    }

    let (fast_a, fast_b) = (a.pixel_data.fast()?, b.pixel_data.fast()?);
    let threshold_unit = options.threshold as f64 * 255.0 / 100.0;
    let fast_threshold = 16.0 * threshold_unit * threshold_unit;
    if squared_diff(fast_a, fast_b) as f64 > fast_threshold {
        return None;
    }

    let (main_a, main_b) = (a.pixel_data.main()?, b.pixel_data.main()?);
    let (main_diff, pixel_count) = squared_diff_masked(main_a, main_b, options.ignore_frame_width);
    if pixel_count == 0 {
        return None;
    }
    let main_threshold = pixel_count as f64 * threshold_unit * threshold_unit;
    if main_diff as f64 > main_threshold {
        return None;
    }

    let max_diff = pixel_count as f64 * 255.0 * 255.0;
    let mut difference = (main_diff as f64 / max_diff).sqrt() * 100.0;
    if a.crc32 != b.crc32 {
        difference += ADDITIONAL_DIFFERENCE_FOR_DIFFERENT_CRC32;
    }
    Some(difference.min(100.0))
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
    fn identical_images_compare_as_zero_difference() {
        let a = image("/a.jpg", 0, 100);
        let b = image("/b.jpg", 1, 100);
        let diff = compare(&a, &b, &CompareOptions::default(), false).unwrap();
        assert!(diff < 1e-9);
    }

    #[test]
    fn differing_crc_adds_penalty_even_when_pixels_match() {
        let a = image("/a.jpg", 0, 100);
        let mut b = image("/b.jpg", 1, 100);
        b.crc32 = 999;
        let diff = compare(&a, &b, &CompareOptions::default(), false).unwrap();
        assert!((diff - ADDITIONAL_DIFFERENCE_FOR_DIFFERENT_CRC32).abs() < 1e-9);
    }

    #[test]
    fn wildly_different_images_are_rejected() {
        let a = image("/a.jpg", 0, 0);
        let b = image("/b.jpg", 1, 255);
        assert!(compare(&a, &b, &CompareOptions::default(), false).is_none());
    }

    #[test]
    fn comparison_is_symmetric() {
        let mut a = image("/a.jpg", 0, 100);
        let b = image("/b.jpg", 1, 103);
        a.crc32 = 1;
        let options = CompareOptions::default();
        let ab = compare(&a, &b, &options, false).unwrap();
        let ba = compare(&b, &a, &options, false).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn same_search_root_is_rejected_unless_enabled() {
        let a = image("/a.jpg", 0, 100);
        let b = image("/b.jpg", 0, 100);
        let options = CompareOptions::default();
        assert!(compare(&a, &b, &options, false).is_none());
        assert!(compare(&a, &b, &options, true).is_some());
    }
}
