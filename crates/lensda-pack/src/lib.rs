//! Lens DA Pack Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Deterministic merge-and-pack of the Lens dataset into content-addressed
//! chunks.
//!
//! # Pipeline
//!
//! - **Source**: the four tables merged into one canonically ordered stream
//! - **Builder**: greedy packing of record lines into chunks under a ceiling
//! - **Storage**: durable chunk files
//! - **Pipeline**: drives the above and publishes the manifest
//!
//! Running the same build twice over the same data produces byte-identical
//! chunks and an identical manifest.
//!
//! # Example
//!
//! ```no_run
//! use lensda_common::layout::BuildLayout;
//! use lensda_common::types::DEFAULT_CHUNK_CEILING;
//! use lensda_pack::{pipeline, PgRowSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = PgRowSource::connect("postgres://postgres@localhost/lens_raw").await?;
//!     let summary = pipeline::build(&source, &BuildLayout::default(), DEFAULT_CHUNK_CEILING).await?;
//!     println!("{} chunks", summary.chunks);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod pipeline;
pub mod source;
pub mod storage;

pub use builder::{pack, Chunk, ChunkBuilder};
pub use pipeline::{build, build_with_store, BuildSummary};
pub use source::{MemorySource, RowSource};
pub use storage::{ChunkStore, FsChunkStore, MemoryChunkStore};

#[cfg(feature = "database")]
pub use source::PgRowSource;
