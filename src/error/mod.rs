//! # Error Module
//!
//! Error taxonomy for the duplicate-image detection engine.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-subsystem errors** - callers that only touch one subsystem
//!   (e.g. the cache) can match on its narrow error type without pulling
//!   in the whole taxonomy
//! - Per-file scan/decode failures never appear here - the collector
//!   absorbs them and stamps the image `Undefined`/`Unknown` instead

use std::path::PathBuf;
use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Fingerprinting error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Comparison error: {0}")]
    Compare(#[from] CompareError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Mistake store error: {0}")]
    Mistake(#[from] MistakeError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Nothing to act on")]
    ZeroTarget,

    #[error("Engine is busy with a previous operation")]
    AccessDenied,

    #[error("No group with id {0}")]
    InvalidGroupId(u32),

    #[error("Index {0} is out of range")]
    InvalidIndex(usize),
}

/// Errors that occur during filesystem scanning
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan was cancelled")]
    Cancelled,
}

/// Errors that occur while building a fingerprint (decode/pyramid/defect)
///
/// Per-file occurrences of these are absorbed by the collector and recorded
/// on the `ImageData` itself (`ImageType::Undefined`, `Defect::Unknown`);
/// this type exists for cases the caller asked to be surfaced directly,
/// such as `load_bitmap`.
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Failed to decode image {path}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("Image is empty or has zero dimensions: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output buffer too small: need {needed} bytes, got {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

/// Errors that occur during duplicate comparison
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("No images to compare")]
    NoImages,

    #[error("Invalid threshold: {value} (must be 0-{max})")]
    InvalidThreshold { value: u32, max: u32 },

    #[error("Comparison was cancelled")]
    Cancelled,
}

/// Errors that occur with the persistent image-data cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache file at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid file format in {path}: {reason}")]
    InvalidFileFormat { path: PathBuf, reason: String },

    #[error("Unsupported file version {found} (expected {expected}) in {path}")]
    InvalidVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

/// Errors that occur with the mistake store
#[derive(Error, Debug)]
pub enum MistakeError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Errors that occur in the undo/redo engine
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Filesystem operation on {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Target path already exists and could not be made unique: {path}")]
    NameCollision { path: PathBuf },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/photos/vacation"),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/vacation"));
    }

    #[test]
    fn fingerprint_error_includes_path_and_reason() {
        let error = FingerprintError::DecodeFailed {
            path: PathBuf::from("/photos/broken.jpg"),
            reason: "invalid JPEG".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/broken.jpg"));
        assert!(message.contains("invalid JPEG"));
    }

    #[test]
    fn cache_error_reports_path_and_reason() {
        let error = CacheError::InvalidFileFormat {
            path: PathBuf::from("/cache/index.adi"),
            reason: "bad magic".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("index.adi"));
        assert!(message.contains("bad magic"));
    }

    #[test]
    fn engine_error_wraps_subsystem_errors() {
        let cache_err: EngineError = CacheError::Io {
            path: PathBuf::from("/x"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        }
        .into();
        assert!(matches!(cache_err, EngineError::Cache(_)));
    }
}
