//! # Scanner Module
//!
//! Walks configured search roots and discovers candidate image files.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - WebP (.webp)
//! - GIF (.gif)
//! - BMP (.bmp)
//! - TIFF (.tiff, .tif)
//!
//! ## Example
//! ```rust,ignore
//! use antidupe_core::core::scanner::WalkDirScanner;
//! use antidupe_core::core::options::SearchOptions;
//!
//! let scanner = WalkDirScanner::new(SearchOptions::default());
//! let result = scanner.scan(&[root.into()], &ignore_set)?;
//! ```

mod filter;
mod walker;

pub use filter::ImageFilter;
pub use walker::WalkDirScanner;

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A discovered file, as produced by the scanner. Immutable once built;
/// the collector constructs an `ImageData` fingerprint from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub time: SystemTime,
    /// Fast equality key, not an identity: a deterministic hash of the
    /// lowercased path. Used only for bucketing/dedup shortcuts.
    pub hash: u64,
    /// Ordinal of the search root this file was discovered under.
    pub index: usize,
}

impl FileInfo {
    pub fn new(path: PathBuf, size: u64, time: SystemTime, index: usize) -> Self {
        let hash = path_hash(&path);
        Self { path, size, time, hash, index }
    }
}

/// Deterministic, case-insensitive hash of a path. Not a content hash;
/// used only for quick equality shortcuts, never as a cache key.
pub fn path_hash(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.to_string_lossy().to_lowercase().hash(&mut hasher);
    hasher.finish()
}

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
    Unknown,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "webp" => ImageFormat::WebP,
            "gif" => ImageFormat::Gif,
            "bmp" => ImageFormat::Bmp,
            "tiff" | "tif" => ImageFormat::Tiff,
            _ => ImageFormat::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ImageFormat::Unknown)
    }
}

/// Result of a scan operation: discovered files plus non-fatal errors.
#[derive(Debug)]
pub struct ScanResult {
    pub files: Vec<FileInfo>,
    pub errors: Vec<ScanError>,
}

/// Trait for directory scanners. Implement this to plug in a custom
/// scanner (e.g. an in-memory fixture for tests).
pub trait FileScanner: Send + Sync {
    /// Scan `search_roots`, skipping anything under `ignore_roots`.
    fn scan(&self, search_roots: &[PathBuf], ignore_roots: &[PathBuf]) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events.
    fn scan_with_events(
        &self,
        search_roots: &[PathBuf],
        ignore_roots: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_format_from_extension_lowercase() {
        assert_eq!(ImageFormat::from_extension("jpg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("jpeg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("png"), ImageFormat::Png);
    }

    #[test]
    fn image_format_from_extension_uppercase() {
        assert_eq!(ImageFormat::from_extension("JPG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("PNG"), ImageFormat::Png);
    }

    #[test]
    fn unknown_extension_returns_unknown() {
        assert_eq!(ImageFormat::from_extension("txt"), ImageFormat::Unknown);
        assert_eq!(ImageFormat::from_extension("pdf"), ImageFormat::Unknown);
    }

    #[test]
    fn unknown_format_is_not_supported() {
        assert!(!ImageFormat::Unknown.is_supported());
        assert!(ImageFormat::Jpeg.is_supported());
    }

    #[test]
    fn path_hash_is_case_insensitive() {
        assert_eq!(path_hash(Path::new("/A/B.JPG")), path_hash(Path::new("/a/b.jpg")));
    }

    #[test]
    fn path_hash_differs_for_different_paths() {
        assert_ne!(path_hash(Path::new("/a/b.jpg")), path_hash(Path::new("/a/c.jpg")));
    }
}
