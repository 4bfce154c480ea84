//! Chunk manifest (manifest.ndjson)
//!
//! The manifest is the contract between the build and submit phases: one JSON
//! object per line, one line per chunk, ordered by chunk id starting at 1.
//!
//! ```text
//! {"chunk_id":1,"sha256":"…","bytes":998412,"path":"build/chunks/0000001.bin"}
//! ```

use crate::error::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Metadata of one built chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub chunk_id: u64,

    /// Lowercase hex SHA-256 of the chunk bytes
    #[serde(rename = "sha256")]
    pub content_digest: String,

    #[serde(rename = "bytes")]
    pub byte_length: u64,

    /// Where the chunk bytes were persisted
    #[serde(rename = "path")]
    pub storage_location: String,
}

/// Loaded, validated manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest from entries, checking that ids run 1..=n
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Result<Self> {
        for (index, entry) in entries.iter().enumerate() {
            let expected = index as u64 + 1;
            if entry.chunk_id != expected {
                return Err(ArchiveError::NonContiguousManifest {
                    expected,
                    found: entry.chunk_id,
                });
            }
        }
        Ok(Self { entries })
    }

    /// Load a manifest file.
    ///
    /// Unlike the progress log, a manifest must be complete: any unparseable
    /// line is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut entries = Vec::new();

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: ManifestEntry =
                serde_json::from_str(&line).map_err(|e| ArchiveError::InvalidManifest {
                    line: index + 1,
                    reason: e.to_string(),
                })?;
            entries.push(entry);
        }

        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by chunk id
    pub fn get(&self, chunk_id: u64) -> Option<&ManifestEntry> {
        let index = usize::try_from(chunk_id.checked_sub(1)?).ok()?;
        self.entries.get(index)
    }

    /// Sum of all chunk lengths
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.byte_length).sum()
    }
}

/// Append-only manifest writer.
///
/// Lines go to a temporary file next to the destination; [`ManifestWriter::commit`]
/// renames it into place. A build that fails before commit leaves no manifest
/// behind.
pub struct ManifestWriter {
    destination: PathBuf,
    writer: BufWriter<NamedTempFile>,
    next_chunk_id: u64,
}

impl ManifestWriter {
    /// Start a new manifest that will be published at `destination`
    pub fn create(destination: impl Into<PathBuf>) -> Result<Self> {
        let destination = destination.into();
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let temp = NamedTempFile::new_in(&dir)?;

        Ok(Self {
            destination,
            writer: BufWriter::new(temp),
            next_chunk_id: 1,
        })
    }

    /// Append one entry; ids must arrive as 1, 2, 3, …
    pub fn append(&mut self, entry: &ManifestEntry) -> Result<()> {
        if entry.chunk_id != self.next_chunk_id {
            return Err(ArchiveError::NonContiguousManifest {
                expected: self.next_chunk_id,
                found: entry.chunk_id,
            });
        }

        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.next_chunk_id += 1;
        Ok(())
    }

    /// Number of entries appended so far
    pub fn entries_written(&self) -> u64 {
        self.next_chunk_id - 1
    }

    /// Sync and atomically publish the manifest
    pub fn commit(self) -> Result<PathBuf> {
        let temp = self.writer.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.destination).map_err(|e| e.error)?;
        Ok(self.destination)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(chunk_id: u64) -> ManifestEntry {
        ManifestEntry {
            chunk_id,
            content_digest: format!("{:064x}", chunk_id),
            byte_length: 100 * chunk_id,
            storage_location: format!("build/chunks/{:07}.bin", chunk_id),
        }
    }

    #[test]
    fn test_entry_uses_file_field_names() {
        let json = serde_json::to_value(entry(3)).unwrap();
        assert_eq!(json["chunk_id"], 3);
        assert_eq!(json["bytes"], 300);
        assert_eq!(json["path"], "build/chunks/0000003.bin");
        assert!(json.get("sha256").is_some());
    }

    #[test]
    fn test_write_commit_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.ndjson");

        let mut writer = ManifestWriter::create(&path).unwrap();
        for id in 1..=3 {
            writer.append(&entry(id)).unwrap();
        }
        assert_eq!(writer.entries_written(), 3);
        assert!(!path.exists());
        writer.commit().unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.get(2), Some(&entry(2)));
        assert_eq!(manifest.get(0), None);
        assert_eq!(manifest.get(4), None);
        assert_eq!(manifest.total_bytes(), 600);
    }

    #[test]
    fn test_uncommitted_manifest_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.ndjson");

        let mut writer = ManifestWriter::create(&path).unwrap();
        writer.append(&entry(1)).unwrap();
        drop(writer);

        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_writer_rejects_gaps() {
        let dir = TempDir::new().unwrap();
        let mut writer = ManifestWriter::create(dir.path().join("m.ndjson")).unwrap();
        writer.append(&entry(1)).unwrap();
        let err = writer.append(&entry(3)).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::NonContiguousManifest { expected: 2, found: 3 }
        ));
    }

    #[test]
    fn test_load_rejects_gaps_and_garbage() {
        let dir = TempDir::new().unwrap();

        let gap = dir.path().join("gap.ndjson");
        let lines: Vec<String> = [1, 2, 4]
            .iter()
            .map(|id| serde_json::to_string(&entry(*id)).unwrap())
            .collect();
        std::fs::write(&gap, lines.join("\n")).unwrap();
        assert!(matches!(
            Manifest::load(&gap).unwrap_err(),
            ArchiveError::NonContiguousManifest { expected: 3, found: 4 }
        ));

        let garbage = dir.path().join("garbage.ndjson");
        let first = serde_json::to_string(&entry(1)).unwrap();
        std::fs::write(&garbage, format!("{}\n{{\"chunk_id\":2,", first)).unwrap();
        assert!(matches!(
            Manifest::load(&garbage).unwrap_err(),
            ArchiveError::InvalidManifest { line: 2, .. }
        ));
    }
}
