//! # Fingerprint Module
//!
//! Reduces a raw image file to the compact fingerprint the comparator
//! operates on: a CRC32 of the raw bytes, a grayscale pyramid bottoming
//! out at a **main** view and a **fast** view, and (optionally) defect
//! scores.

mod bytes;
mod collector;
mod decode;
mod pyramid;

pub use bytes::{read_file_bytes, FileBytes};
pub use collector::DataCollector;
pub use decode::{DecodedImage, Decoder, ImageDecoder};
pub use pyramid::{GrayView, Pyramid, Transform};

use crate::core::scanner::FileInfo;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// `0xFFFF_FFFF` marks a file whose bytes could not be read at all.
pub const CRC32_UNREADABLE: u32 = 0xFFFF_FFFF;

/// Recognized image container formats, plus `None` (never attempted)
/// and `Undefined` (attempted, decode failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageType {
    None,
    Undefined,
    Jpeg,
    Png,
    Bmp,
    Gif,
    Tiff,
    WebP,
}

impl ImageType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageType::Jpeg,
            "png" => ImageType::Png,
            "bmp" => ImageType::Bmp,
            "gif" => ImageType::Gif,
            "tiff" | "tif" => ImageType::Tiff,
            "webp" => ImageType::WebP,
            _ => ImageType::Undefined,
        }
    }

    /// JPEG and JP2 payloads are checked for a missing end-of-image
    /// marker; this crate doesn't decode JP2 so only JPEG applies.
    pub fn is_marker_checked(&self) -> bool {
        matches!(self, ImageType::Jpeg)
    }
}

/// Classification raised by the defect checks in `core::quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Defect {
    None,
    Unknown,
    JpegEndMarkerAbsent,
    Blockiness,
    Blurring,
}

/// A completed (or partially filled) fingerprint. Mutated only by its
/// owning collector worker until it is inserted into a comparator
/// bucket, after which it is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub path: PathBuf,
    pub size: u64,
    pub time: SystemTime,
    pub hash: u64,

    pub crc32: u32,
    pub image_type: ImageType,
    pub width: u32,
    pub height: u32,
    /// Integer aspect-ratio bucket (`width * 100 / height`, clamped).
    pub ratio: u32,

    pub defect: Defect,
    pub blockiness: f64,
    pub blurring: f64,

    pub pixel_data: Pyramid,

    /// Lazily filled by the SSIM comparator: average pixel value of the
    /// main view.
    pub average: f64,
    /// Lazily filled by the SSIM comparator: variance proxy of the main
    /// view.
    pub variance: f64,

    /// True if this path is under a user-configured *valid* root
    /// (excluded from "possibly defective" reporting).
    pub valid: bool,
    /// Ordinal of the search root this file was discovered under.
    pub index: usize,
}

impl ImageData {
    /// Construct an empty (unfilled) fingerprint from a scanner record.
    pub fn from_file_info(info: &FileInfo, valid: bool) -> Self {
        Self {
            path: info.path.clone(),
            size: info.size,
            time: info.time,
            hash: info.hash,
            crc32: 0,
            image_type: ImageType::None,
            width: 0,
            height: 0,
            ratio: 0,
            defect: Defect::None,
            blockiness: f64::NEG_INFINITY,
            blurring: f64::NEG_INFINITY,
            pixel_data: Pyramid::empty(),
            average: 0.0,
            variance: 0.0,
            valid,
            index: info.index,
        }
    }

    /// True if `size`/`time` still match a `FileInfo` observed on disk,
    /// i.e. this cached fingerprint doesn't need refilling.
    pub fn matches(&self, info: &FileInfo) -> bool {
        self.size == info.size && self.time == info.time
    }

    pub fn crc_unreadable(&self) -> bool {
        self.crc32 == CRC32_UNREADABLE
    }

    /// True if `DataCollector::fill` still has work to do on this
    /// fingerprint: no CRC yet, or the pyramid is wanted but missing.
    /// A file already stamped unreadable is terminal: the cache hit
    /// ruled out size/time drift, so another read would fail the same
    /// way.
    pub fn needs_fill(&self, need_pixels: bool) -> bool {
        if self.crc32 == 0 {
            return true;
        }
        if self.crc_unreadable() {
            return false;
        }
        need_pixels && !self.pixel_data.filled()
    }
}

pub fn ratio_bucket(width: u32, height: u32) -> u32 {
    if height == 0 {
        0
    } else {
        width.saturating_mul(100) / height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_info() -> FileInfo {
        FileInfo::new(PathBuf::from("/a/b.jpg"), 100, SystemTime::UNIX_EPOCH, 0)
    }

    #[test]
    fn fresh_image_data_is_unfilled() {
        let data = ImageData::from_file_info(&file_info(), false);
        assert_eq!(data.crc32, 0);
        assert_eq!(data.image_type, ImageType::None);
        assert!(!data.pixel_data.filled());
    }

    #[test]
    fn matches_detects_unchanged_file() {
        let info = file_info();
        let data = ImageData::from_file_info(&info, false);
        assert!(data.matches(&info));

        let mut changed = info.clone();
        changed.size += 1;
        assert!(!data.matches(&changed));
    }

    #[test]
    fn ratio_bucket_handles_zero_height() {
        assert_eq!(ratio_bucket(100, 0), 0);
        assert_eq!(ratio_bucket(200, 100), 200);
    }
}
