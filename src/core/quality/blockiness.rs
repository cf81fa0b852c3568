//! Blockiness score: the ratio of gradient energy at 8x8 JPEG block
//! boundaries to gradient energy in block interiors, on the full-size
//! (256x256) grayscale render. A ratio well above 1 means the edges
//! that fall on block boundaries are systematically sharper than
//! interior edges, the signature of 8x8 DCT quantization artifacts.

use crate::core::fingerprint::Pyramid;

const BLOCK_SIZE: u32 = 8;

pub fn score(pyramid: &Pyramid) -> f64 {
    let Some(view) = pyramid.levels.first() else {
        return 0.0;
    };
    let side = view.side;
    if side <= BLOCK_SIZE {
        return 0.0;
    }

    let mut boundary_sum = 0u64;
    let mut boundary_count = 0u64;
    let mut interior_sum = 0u64;
    let mut interior_count = 0u64;

    for y in 0..side {
        for x in 1..side {
            let gradient = (view.get(x, y) as i32 - view.get(x - 1, y) as i32).unsigned_abs() as u64;
            if x % BLOCK_SIZE == 0 {
                boundary_sum += gradient;
                boundary_count += 1;
            } else {
                interior_sum += gradient;
                interior_count += 1;
            }
        }
    }

    for x in 0..side {
        for y in 1..side {
            let gradient = (view.get(x, y) as i32 - view.get(x, y - 1) as i32).unsigned_abs() as u64;
            if y % BLOCK_SIZE == 0 {
                boundary_sum += gradient;
                boundary_count += 1;
            } else {
                interior_sum += gradient;
                interior_count += 1;
            }
        }
    }

    let boundary_avg = boundary_sum as f64 / boundary_count.max(1) as f64;
    let interior_avg = interior_sum as f64 / interior_count.max(1) as f64;

    if interior_avg < 1e-6 {
        0.0
    } else {
        boundary_avg / interior_avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::GrayView;

    fn pyramid_from_render(side: u32, fill: impl Fn(u32, u32) -> u8) -> Pyramid {
        let mut data = vec![0u8; (side * side) as usize];
        for y in 0..side {
            for x in 0..side {
                data[(y * side + x) as usize] = fill(x, y);
            }
        }
        Pyramid::build(GrayView::new(side, data), 16)
    }

    #[test]
    fn uniform_image_has_zero_blockiness() {
        let pyramid = pyramid_from_render(256, |_, _| 128);
        assert_eq!(score(&pyramid), 0.0);
    }

    #[test]
    fn block_aligned_stripes_score_higher_than_smooth_gradient() {
        let blocky = pyramid_from_render(256, |x, _| if (x / BLOCK_SIZE) % 2 == 0 { 50 } else { 200 });
        let smooth = pyramid_from_render(256, |x, _| x as u8);
        assert!(score(&blocky) > score(&smooth));
    }
}
