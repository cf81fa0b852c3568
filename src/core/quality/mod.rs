//! # Quality Module
//!
//! Defect metrics computed from a fingerprint's pyramid: blockiness
//! (JPEG 8x8-block compression artifacts), blurring radius (scale-space
//! quantile walk), and the JPEG end-of-image marker check.

pub mod blockiness;
pub mod blurring;
pub mod jpeg_marker;
