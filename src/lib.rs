//! # antidupe-core
//!
//! A duplicate-image detection engine: scans directory trees, reduces
//! each image to a compact fingerprint (CRC32 + reduced grayscale
//! pyramid), finds near-duplicates across large collections (including
//! rotated and mirrored variants), and flags technically defective
//! images (truncated JPEGs, blockiness, blurring).
//!
//! ## Architecture
//! The library is split into a core engine (front-end-agnostic) and
//! presentation layers:
//! - `core` - the detection pipeline, its indexes, and the undo/redo log
//! - `events` - event-driven progress reporting (GUI-ready)
//! - `error` - the engine's error taxonomy
//! - `cli` - command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use crate::core::engine::Engine;
pub use error::{EngineError, Result};
