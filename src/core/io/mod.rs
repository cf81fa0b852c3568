//! # I/O Module
//!
//! Typed binary stream primitives used by every core-owned persisted
//! file (`core::cache`, `core::mistake`, and the result store): a magic
//! tag, a version, and a payload written with fixed-width little-endian
//! integers, IEEE-754 doubles, and length-prefixed UTF-16 strings.
//!
//! Kept distinct from the `serde`/`serde_json` surface used by events
//! and reports: those formats are free to evolve, this one is a
//! normatively fixed wire format that every reader must parse bit for
//! bit.

mod stream;

pub use stream::{Reader, Writer, SIZE_CHECK_LIMIT};
