//! Comparison options: threshold, transform search, and the knobs that
//! steer strategy selection (see `core::comparator::select_strategy`).

/// Denominator used throughout the comparator for percentage-style
/// thresholds (`threshold`, `difference`, `auto_delete_threshold` all
/// live in `0..=DENOMINATOR`).
pub const DENOMINATOR: u32 = 100;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CompareOptions {
    /// Maximum accepted difference, in `0..=DENOMINATOR`.
    pub threshold: u32,
    /// Also compare rotated/mirrored variants of each fingerprint.
    pub transformed_image: bool,
    /// Reject pairs whose `image_type` differs.
    pub type_control: bool,
    /// Reject pairs whose `(width, height)` differ.
    pub size_control: bool,
    /// Reject pairs whose integer aspect-ratio bucket differs.
    pub ratio_control: bool,
    /// Zero this many pixels of border on every side of the main view
    /// before computing the squared-difference sum.
    pub ignore_frame_width: u32,
    /// Force the SSIM comparator instead of a bucketed strategy.
    pub use_ssim: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            threshold: 5,
            transformed_image: true,
            type_control: true,
            size_control: false,
            ratio_control: true,
            ignore_frame_width: 0,
            use_ssim: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_in_range() {
        let options = CompareOptions::default();
        assert!(options.threshold <= DENOMINATOR);
    }
}
