//! Lens DA Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Lens DA archiver.
//!
//! # Overview
//!
//! This crate provides the pieces both archive phases agree on:
//!
//! - **Error Handling**: `ArchiveError` and the crate `Result` alias
//! - **Checksums**: SHA-256 content digests for chunks
//! - **Types**: records, sort keys, ledger references and progress entries
//! - **Layout**: where chunks, the manifest and the progress log live
//! - **Manifest**: the ordered chunk log written by the build phase and read by
//!   the submit phase
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use lensda_common::manifest::Manifest;
//!
//! fn count_chunks() -> lensda_common::Result<usize> {
//!     let manifest = Manifest::load("build/manifest.ndjson")?;
//!     Ok(manifest.len())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod layout;
pub mod logging;
pub mod manifest;
pub mod types;

// Re-export commonly used types
pub use error::{ArchiveError, Result};
