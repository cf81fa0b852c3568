//! # Core Module
//!
//! The front-end-agnostic duplicate-image detection engine.
//!
//! ## Modules
//! - `engine` - the session facade driving scan/compare/act cycles
//! - `options` - typed configuration aggregate and path-set model
//! - `scanner` - discovers candidate image files under search roots
//! - `fingerprint` - reduces a file to a CRC32 + grayscale pyramid
//! - `quality` - defect metrics computed from a fingerprint
//! - `comparator` - bucketized duplicate matching and grouping
//! - `hint` - delete-candidate suggestion per duplicate group
//! - `cache` - persistent fingerprint database
//! - `mistake` - permanently suppressed false-positive pairs
//! - `history` - undo/redo transaction log over filesystem mutations
//! - `threading` - collector/comparator worker pool coordination
//! - `io` - the typed binary stream shared by `cache`/`mistake`

pub mod cache;
pub mod comparator;
pub mod engine;
pub mod fingerprint;
pub mod hint;
pub mod history;
pub mod io;
pub mod mistake;
pub mod options;
pub mod quality;
pub mod scanner;
pub mod threading;
