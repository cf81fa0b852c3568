//! The reduced grayscale pyramid: a stack of square views, each half
//! the side length of the one above, built by repeated 2x2 averaging
//! down from a 256x256 render to a 4x4 "fast" view. The **main** view
//! is whichever level matches the configured `reduced_image_size`
//! (default 16).

use serde::{Deserialize, Serialize};

/// Square grayscale buffer, `side * side` bytes, row-major.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrayView {
    pub side: u32,
    pub data: Vec<u8>,
}

impl GrayView {
    pub fn new(side: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (side * side) as usize);
        Self { side, data }
    }

    pub fn zeroed(side: u32) -> Self {
        Self { side, data: vec![0u8; (side * side) as usize] }
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.side + x) as usize]
    }

    /// Downsample by averaging each non-overlapping 2x2 block. Requires
    /// an even side.
    pub fn downsample_2x2(&self) -> GrayView {
        let half = self.side / 2;
        let mut out = vec![0u8; (half * half) as usize];
        for y in 0..half {
            for x in 0..half {
                let sum = self.get(2 * x, 2 * y) as u32
                    + self.get(2 * x + 1, 2 * y) as u32
                    + self.get(2 * x, 2 * y + 1) as u32
                    + self.get(2 * x + 1, 2 * y + 1) as u32;
                out[(y * half + x) as usize] = (sum / 4) as u8;
            }
        }
        GrayView::new(half, out)
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate90(&self) -> GrayView {
        let n = self.side;
        let mut out = vec![0u8; self.data.len()];
        for y in 0..n {
            for x in 0..n {
                // (x, y) -> (n-1-y, x)
                out[(x * n + (n - 1 - y)) as usize] = self.get(x, y);
            }
        }
        GrayView::new(n, out)
    }

    /// Mirror horizontally (flip along the vertical axis).
    pub fn mirror(&self) -> GrayView {
        let n = self.side;
        let mut out = vec![0u8; self.data.len()];
        for y in 0..n {
            for x in 0..n {
                out[(y * n + (n - 1 - x)) as usize] = self.get(x, y);
            }
        }
        GrayView::new(n, out)
    }

    pub fn average(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Variance proxy: mean squared deviation from the average.
    pub fn variance(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let avg = self.average();
        self.data.iter().map(|&b| (b as f64 - avg).powi(2)).sum::<f64>() / self.data.len() as f64
    }

    /// Sum over the 4x4 fast view, as used by the 1-D and 3-D bucket
    /// keys.
    pub fn sum(&self) -> u32 {
        self.data.iter().map(|&b| b as u32).sum()
    }
}

/// One of the eight symmetries (identity plus three rotations, times a
/// mirror), used when `transformed_image` is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transform {
    Turn0,
    Turn90,
    Turn180,
    Turn270,
    MirrorTurn0,
    MirrorTurn90,
    MirrorTurn180,
    MirrorTurn270,
}

impl Transform {
    pub const NON_IDENTITY: [Transform; 7] = [
        Transform::Turn90,
        Transform::Turn180,
        Transform::Turn270,
        Transform::MirrorTurn0,
        Transform::MirrorTurn90,
        Transform::MirrorTurn180,
        Transform::MirrorTurn270,
    ];

    pub fn apply(&self, view: &GrayView) -> GrayView {
        match self {
            Transform::Turn0 => view.clone(),
            Transform::Turn90 => view.rotate90(),
            Transform::Turn180 => view.rotate90().rotate90(),
            Transform::Turn270 => view.rotate90().rotate90().rotate90(),
            Transform::MirrorTurn0 => view.mirror(),
            Transform::MirrorTurn90 => view.mirror().rotate90(),
            Transform::MirrorTurn180 => view.mirror().rotate90().rotate90(),
            Transform::MirrorTurn270 => view.mirror().rotate90().rotate90().rotate90(),
        }
    }
}

/// The full stack of averaged-down levels, from 256x256 (index 0) to
/// 4x4 (the fast view, last index).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pyramid {
    pub levels: Vec<GrayView>,
    main_side: u32,
}

impl Pyramid {
    pub fn empty() -> Self {
        Self { levels: Vec::new(), main_side: 0 }
    }

    /// Rebuild a pyramid from its already-computed levels, e.g. when
    /// loading a fingerprint back from the on-disk cache.
    pub fn build_from_levels(levels: Vec<GrayView>, main_side: u32) -> Self {
        Self { levels, main_side }
    }

    /// Build the full pyramid from a 256x256 grayscale render, halving
    /// down to 4x4. `main_side` must be a power of two in `[4, 256]`.
    pub fn build(render256: GrayView, main_side: u32) -> Self {
        debug_assert_eq!(render256.side, 256);
        let mut levels = Vec::new();
        let mut current = render256;
        levels.push(current.clone());
        while current.side > 4 {
            current = current.downsample_2x2();
            levels.push(current.clone());
        }
        Self { levels, main_side }
    }

    pub fn filled(&self) -> bool {
        !self.levels.is_empty()
    }

    pub fn main_side(&self) -> u32 {
        self.main_side
    }

    /// Drop every level above the main view. The larger levels are
    /// only needed while defect metrics run; the comparator and the
    /// on-disk cache want just the main and fast ends of the stack.
    pub fn trim_to_main(&mut self) {
        let main_side = self.main_side;
        self.levels.retain(|l| l.side <= main_side);
    }

    /// The main view: the level whose side equals the configured
    /// `reduced_image_size`.
    pub fn main(&self) -> Option<&GrayView> {
        self.levels.iter().find(|l| l.side == self.main_side)
    }

    /// The fast view: always the smallest (4x4) level.
    pub fn fast(&self) -> Option<&GrayView> {
        self.levels.last()
    }

    /// Level whose side matches `side`, if the pyramid was built that
    /// deep.
    pub fn level(&self, side: u32) -> Option<&GrayView> {
        self.levels.iter().find(|l| l.side == side)
    }

    /// Apply a symmetry to every level. Used when `transformed_image`
    /// is enabled: the comparator compares against all seven
    /// non-identity transforms of the candidate fingerprint.
    pub fn transformed(&self, t: Transform) -> Pyramid {
        Pyramid {
            levels: self.levels.iter().map(|l| t.apply(l)).collect(),
            main_side: self.main_side,
        }
    }
}
