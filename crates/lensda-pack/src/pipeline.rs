//! Build driver: source → chunk builder → chunk store + manifest

use crate::builder::{Chunk, ChunkBuilder};
use crate::source::RowSource;
use crate::storage::{ChunkStore, FsChunkStore};
use futures::StreamExt;
use lensda_common::layout::BuildLayout;
use lensda_common::manifest::{ManifestEntry, ManifestWriter};
use lensda_common::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Outcome of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub chunks: u64,
    pub records: u64,
    pub bytes: u64,
    pub manifest_path: PathBuf,
}

/// Build chunks into `layout`, writing `chunks/` and `manifest.ndjson`
pub async fn build<S>(source: &S, layout: &BuildLayout, ceiling: usize) -> Result<BuildSummary>
where
    S: RowSource + ?Sized,
{
    let mut store = FsChunkStore::create(layout.clone())?;
    build_with_store(source, &mut store, layout.manifest_path(), ceiling).await
}

/// Build chunks into an arbitrary store.
///
/// Each chunk is persisted before its manifest line is written, and the
/// manifest only appears at `manifest_path` once the whole source is drained.
pub async fn build_with_store<S, C>(
    source: &S,
    store: &mut C,
    manifest_path: impl AsRef<Path>,
    ceiling: usize,
) -> Result<BuildSummary>
where
    S: RowSource + ?Sized,
    C: ChunkStore + ?Sized,
{
    let started = Instant::now();
    let mut builder = ChunkBuilder::new(ceiling)?;
    let mut manifest = ManifestWriter::create(manifest_path.as_ref())?;
    let mut records = source.records();
    let mut record_count = 0u64;
    let mut bytes = 0u64;

    info!(ceiling, "Starting chunk build");

    while let Some(record) = records.next().await {
        let record = record?;
        record_count += 1;
        if let Some(chunk) = builder.push(&record)? {
            bytes += persist(store, &mut manifest, &chunk)?;
        }
    }
    if let Some(chunk) = builder.finish() {
        bytes += persist(store, &mut manifest, &chunk)?;
    }

    let chunks = manifest.entries_written();
    let manifest_path = manifest.commit()?;

    info!(
        chunks,
        records = record_count,
        bytes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        manifest = %manifest_path.display(),
        "Chunk build complete"
    );

    Ok(BuildSummary {
        chunks,
        records: record_count,
        bytes,
        manifest_path,
    })
}

fn persist<C>(store: &mut C, manifest: &mut ManifestWriter, chunk: &Chunk) -> Result<u64>
where
    C: ChunkStore + ?Sized,
{
    let storage_location = store.put(chunk)?;
    let entry = ManifestEntry {
        chunk_id: chunk.id,
        content_digest: chunk.digest.clone(),
        byte_length: chunk.len() as u64,
        storage_location,
    };
    manifest.append(&entry)?;

    info!(
        chunk_id = chunk.id,
        bytes = entry.byte_length,
        records = chunk.record_count,
        sha256 = %entry.content_digest,
        "Chunk written"
    );

    Ok(entry.byte_length)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::storage::MemoryChunkStore;
    use lensda_common::manifest::Manifest;
    use lensda_common::types::{Record, SourceTable};
    use tempfile::TempDir;

    fn records(count: i64, payload_len: usize) -> Vec<Record> {
        (0..count)
            .map(|i| Record::new(SourceTable::Events, i / 3, i % 3, 0, "p".repeat(payload_len)))
            .collect()
    }

    #[tokio::test]
    async fn test_build_writes_manifest_and_chunks() {
        let dir = TempDir::new().unwrap();
        let layout = BuildLayout::new(dir.path());
        let source = MemorySource::new(records(10, 92));

        // 100-byte lines, 3 per chunk
        let summary = build(&source, &layout, 350).await.unwrap();
        assert_eq!(summary.chunks, 4);
        assert_eq!(summary.records, 10);
        assert_eq!(summary.bytes, 1_000);

        let manifest = Manifest::load(layout.manifest_path()).unwrap();
        assert_eq!(manifest.len(), 4);
        assert_eq!(manifest.total_bytes(), 1_000);
        let last = manifest.get(4).unwrap();
        assert_eq!(last.byte_length, 100);
        assert_eq!(
            std::fs::read(&last.storage_location).unwrap().len() as u64,
            last.byte_length
        );
    }

    #[tokio::test]
    async fn test_oversize_record_leaves_no_manifest() {
        let dir = TempDir::new().unwrap();
        let layout = BuildLayout::new(dir.path());
        let mut all = records(3, 10);
        all.push(Record::new(SourceTable::Events, 99, 0, 0, "x".repeat(500)));
        let source = MemorySource::new(all);

        let result = build(&source, &layout, 100).await;
        assert!(result.is_err());
        assert!(!layout.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_empty_source_builds_empty_manifest() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("manifest.ndjson");
        let mut store = MemoryChunkStore::default();

        let summary = build_with_store(&MemorySource::default(), &mut store, &manifest_path, 100)
            .await
            .unwrap();

        assert_eq!(summary.chunks, 0);
        assert!(store.chunks().is_empty());
        assert!(Manifest::load(&manifest_path).unwrap().is_empty());
    }
}
