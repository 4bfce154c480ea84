//! Chunk persistence

use crate::builder::Chunk;
use lensda_common::layout::BuildLayout;
use lensda_common::Result;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Durable home for chunk bytes
pub trait ChunkStore {
    /// Persist a chunk and return where it now lives.
    ///
    /// When this returns `Ok` the bytes are on stable storage.
    fn put(&mut self, chunk: &Chunk) -> Result<String>;
}

/// Stores chunks as `chunks/NNNNNNN.bin` under a build directory
#[derive(Debug, Clone)]
pub struct FsChunkStore {
    layout: BuildLayout,
}

impl FsChunkStore {
    pub fn create(layout: BuildLayout) -> Result<Self> {
        std::fs::create_dir_all(layout.chunks_dir())?;
        Ok(Self { layout })
    }

    pub fn chunk_path(&self, chunk_id: u64) -> PathBuf {
        self.layout.chunk_path(chunk_id)
    }
}

impl ChunkStore for FsChunkStore {
    fn put(&mut self, chunk: &Chunk) -> Result<String> {
        let path = self.chunk_path(chunk.id);

        // A crash mid-write must not leave a truncated chunk under the final name
        let mut temp = NamedTempFile::new_in(self.layout.chunks_dir())?;
        temp.write_all(&chunk.bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| e.error)?;

        // Absolute, so later phases find the chunk whatever their working directory
        let location = std::fs::canonicalize(&path)?;
        Ok(location.to_string_lossy().into_owned())
    }
}

/// Keeps chunks in memory
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: Vec<Chunk>,
}

impl MemoryChunkStore {
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

impl ChunkStore for MemoryChunkStore {
    fn put(&mut self, chunk: &Chunk) -> Result<String> {
        self.chunks.push(chunk.clone());
        Ok(format!("memory://{}", chunk.id))
    }
}
