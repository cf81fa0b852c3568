//! # antidupe CLI
//!
//! Command-line front end for the duplicate-image detection engine.
//!
//! ## Usage
//! ```bash
//! antidupe scan ~/Photos --threshold 5
//! antidupe scan ~/Photos ~/Backups --output json
//! ```

mod cli;

use antidupe_core::Result;

fn main() -> Result<()> {
    cli::run()
}
