//! On-disk layout of a build directory
//!
//! ```text
//! build/
//! ├── chunks/0000001.bin
//! ├── chunks/0000002.bin
//! ├── manifest.ndjson
//! └── uploaded.ndjson
//! ```

use std::path::{Path, PathBuf};

/// Default build directory.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Directory holding chunk files, relative to the build directory.
pub const CHUNKS_DIR_NAME: &str = "chunks";

/// Manifest file name.
pub const MANIFEST_FILE_NAME: &str = "manifest.ndjson";

/// Progress log file name.
pub const PROGRESS_FILE_NAME: &str = "uploaded.ndjson";

/// Paths derived from a build directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join(CHUNKS_DIR_NAME)
    }

    /// Chunk files are named by their zero-padded id so they sort in order
    pub fn chunk_path(&self, chunk_id: u64) -> PathBuf {
        self.chunks_dir().join(format!("{:07}.bin", chunk_id))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.root.join(PROGRESS_FILE_NAME)
    }
}

impl Default for BuildLayout {
    fn default() -> Self {
        Self::new(DEFAULT_BUILD_DIR)
    }
}
