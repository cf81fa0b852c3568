//! Blurring radius: the finest pyramid level at which edge energy
//! (the absolute second derivative) first climbs back above a
//! range-dependent threshold, walking from the coarsest level down.
//! Blur suppresses high-frequency edges first, so the level where
//! sharpness reappears approximates the blur kernel's radius.

use crate::core::fingerprint::{GrayView, Pyramid};
use rayon::prelude::*;

const MARGIN_FRACTION: f64 = 0.10;

/// Absolute second derivative at each interior pixel, skipping the
/// outer `MARGIN_FRACTION` border on every side.
fn second_derivative_values(view: &GrayView) -> Vec<u32> {
    let side = view.side as i64;
    let margin = (side as f64 * MARGIN_FRACTION).round() as i64;
    let lo = margin.max(1);
    let hi = side - margin - 1;
    let mut values = Vec::new();
    if hi <= lo {
        return values;
    }
    for y in lo..hi {
        for x in lo..hi {
            let center = view.get(x as u32, y as u32) as i32;
            let left = view.get((x - 1) as u32, y as u32) as i32;
            let right = view.get((x + 1) as u32, y as u32) as i32;
            let up = view.get(x as u32, (y - 1) as u32) as i32;
            let down = view.get(x as u32, (y + 1) as u32) as i32;
            let d2x = (left + right - 2 * center).unsigned_abs();
            let d2y = (up + down - 2 * center).unsigned_abs();
            values.push(d2x.max(d2y));
        }
    }
    values
}

/// Linear-interpolated quantile of a value set, `q` in `[0,1]`.
fn quantile(values: &mut [u32], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable();
    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        values[lo] as f64
    } else {
        let frac = pos - lo as f64;
        values[lo] as f64 * (1.0 - frac) + values[hi] as f64 * frac
    }
}

/// Compute the blurring radius for a filled pyramid. Levels are stored
/// finest-first (`levels[0]` is the 256x256 render, `levels.last()` is
/// the 4x4 fast view); this walks them coarse-to-fine as the algorithm
/// requires.
pub fn radius(pyramid: &Pyramid) -> f64 {
    if pyramid.levels.len() < 3 {
        return 0.0;
    }

    // coarse_to_fine[0] is the coarsest (smallest) level.
    let coarse_to_fine: Vec<&GrayView> = pyramid.levels.iter().rev().collect();
    let n = coarse_to_fine.len();

    // The fine levels each sort tens of thousands of derivative values;
    // the levels are independent, so compute them in parallel.
    let quantiles_999: Vec<f64> = coarse_to_fine
        .par_iter()
        .map(|level| quantile(&mut second_derivative_values(level), 0.999))
        .collect();

    let mid = n / 2;
    let mut mid_values = second_derivative_values(coarse_to_fine[mid]);
    let q999_mid = quantile(&mut mid_values.clone(), 0.999);
    let q001_mid = quantile(&mut mid_values, 0.001);
    let range = q999_mid - q001_mid;

    if range < 16.0 {
        return 0.0;
    }

    let exponent = if range < 64.0 { 0.125 } else { -0.125 };
    let threshold = range * (64.0 / range).powf(exponent) / 6.0;

    // First local minimum of the coarse-to-fine quantile sequence.
    let mut start = 0usize;
    for i in 1..n - 1 {
        if quantiles_999[i] <= quantiles_999[i - 1] && quantiles_999[i] <= quantiles_999[i + 1] {
            start = i;
            break;
        }
    }

    // From the local minimum, walk toward finer levels (increasing
    // index) to find the finest level still below threshold.
    let mut crossing = start;
    for i in start..n {
        if quantiles_999[i] < threshold {
            crossing = i;
        } else {
            break;
        }
    }

    if crossing + 1 >= n {
        return (n - 1 - crossing) as f64;
    }

    let here = quantiles_999[crossing];
    let next = quantiles_999[crossing + 1];
    let span = (next - here).abs().max(1e-9);
    let frac = ((threshold - here) / span).clamp(0.0, 1.0);

    (n - 1 - crossing) as f64 - frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::GrayView;

    fn pyramid_from_render(fill: impl Fn(u32, u32) -> u8) -> Pyramid {
        let mut data = vec![0u8; 256 * 256];
        for y in 0..256u32 {
            for x in 0..256u32 {
                data[(y * 256 + x) as usize] = fill(x, y);
            }
        }
        Pyramid::build(GrayView::new(256, data), 16)
    }

    #[test]
    fn uniform_image_reports_low_range_fallback() {
        let pyramid = pyramid_from_render(|_, _| 128);
        assert_eq!(radius(&pyramid), 0.0);
    }

    #[test]
    fn sharp_checkerboard_has_nonnegative_radius() {
        let pyramid = pyramid_from_render(|x, y| if (x + y) % 2 == 0 { 0 } else { 255 });
        assert!(radius(&pyramid) >= 0.0);
    }
}
