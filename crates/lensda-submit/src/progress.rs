//! Append-only progress log (uploaded.ndjson)
//!
//! One line per chunk that is both acknowledged and final, written in chunk-id
//! order. On startup the log is replayed to find the chunks a resumed run must
//! skip. A crash can leave a torn last line, so unreadable lines are skipped
//! with a warning instead of failing the run.

use lensda_common::types::ProgressEntry;
use lensda_common::Result;
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Read-only view of a progress log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub done: BTreeSet<u64>,
    pub last: Option<ProgressEntry>,
    pub skipped_lines: usize,
}

impl ProgressSnapshot {
    /// Replay a log without creating or modifying it; a missing file is empty
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let (done, last, skipped_lines) = replay(path, &contents);
        Ok(Self {
            done,
            last,
            skipped_lines,
        })
    }
}

#[derive(Debug)]
pub struct ProgressLog {
    path: PathBuf,
    file: File,
    done: BTreeSet<u64>,
    last: Option<ProgressEntry>,
    skipped_lines: usize,
}

impl ProgressLog {
    /// Open (or create) the log and replay its contents
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let contents = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let (done, last, skipped_lines) = replay(&path, &contents);

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if contents.last().is_some_and(|&b| b != b'\n') {
            // keep the next entry off the torn line
            file.write_all(b"\n")?;
            file.sync_data()?;
        }

        info!(
            path = %path.display(),
            committed = done.len(),
            skipped_lines,
            "Progress log loaded"
        );

        Ok(Self {
            path,
            file,
            done,
            last,
            skipped_lines,
        })
    }

    /// Durably append one entry
    pub fn append(&mut self, entry: &ProgressEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;

        self.done.insert(entry.chunk_id);
        self.last = Some(entry.clone());
        Ok(())
    }

    pub fn is_done(&self, chunk_id: u64) -> bool {
        self.done.contains(&chunk_id)
    }

    /// Chunk ids already committed
    pub fn done(&self) -> &BTreeSet<u64> {
        &self.done
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Entry with the highest chunk id
    pub fn last(&self) -> Option<&ProgressEntry> {
        self.last.as_ref()
    }

    /// Lines ignored during replay
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn replay(path: &Path, contents: &[u8]) -> (BTreeSet<u64>, Option<ProgressEntry>, usize) {
    let mut done = BTreeSet::new();
    let mut last: Option<ProgressEntry> = None;
    let mut skipped = 0;

    for (index, raw) in contents.split(|&b| b == b'\n').enumerate() {
        if raw.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<ProgressEntry>(raw) {
            Ok(entry) => {
                done.insert(entry.chunk_id);
                if last.as_ref().is_none_or(|l| entry.chunk_id > l.chunk_id) {
                    last = Some(entry);
                }
            }
            Err(e) => {
                skipped += 1;
                warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping unreadable progress line"
                );
            }
        }
    }

    (done, last, skipped)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use lensda_common::types::Reference;
    use tempfile::TempDir;

    fn entry(chunk_id: u64) -> ProgressEntry {
        ProgressEntry {
            chunk_id,
            submission_id: format!("sub-{}", chunk_id),
            uploaded_at: DateTime::from_timestamp(1_700_000_000 + chunk_id as i64, 0).unwrap(),
            block_reference: Some(Reference::Number(100 + chunk_id)),
            block_hash: Some("0xabc".into()),
            transaction_reference: None,
        }
    }

    #[test]
    fn test_append_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploaded.ndjson");

        let mut log = ProgressLog::open(&path).unwrap();
        assert!(log.is_empty());
        log.append(&entry(1)).unwrap();
        log.append(&entry(2)).unwrap();
        drop(log);

        let log = ProgressLog::open(&path).unwrap();
        assert_eq!(log.done().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(log.last().unwrap().submission_id, "sub-2");
        assert_eq!(log.skipped_lines(), 0);
    }

    #[test]
    fn test_corrupt_and_torn_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploaded.ndjson");

        let mut contents = serde_json::to_string(&entry(1)).unwrap();
        contents.push_str("\nnot json at all\n");
        contents.push_str(&serde_json::to_string(&entry(2)).unwrap());
        contents.push_str("\n{\"chunk_id\":3,\"submissi");
        std::fs::write(&path, contents).unwrap();

        let mut log = ProgressLog::open(&path).unwrap();
        assert!(log.is_done(1));
        assert!(log.is_done(2));
        assert!(!log.is_done(3));
        assert_eq!(log.skipped_lines(), 2);

        // the new entry must land on its own line
        log.append(&entry(3)).unwrap();
        drop(log);

        let log = ProgressLog::open(&path).unwrap();
        assert!(log.is_done(3));
        assert_eq!(log.skipped_lines(), 2);
    }

    #[test]
    fn test_snapshot_does_not_touch_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploaded.ndjson");

        let empty = ProgressSnapshot::load(&path).unwrap();
        assert!(empty.done.is_empty());
        assert!(!path.exists());

        let torn = format!("{}\n{{\"chunk", serde_json::to_string(&entry(1)).unwrap());
        std::fs::write(&path, &torn).unwrap();
        let snapshot = ProgressSnapshot::load(&path).unwrap();
        assert_eq!(snapshot.done.len(), 1);
        assert_eq!(snapshot.skipped_lines, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), torn);
    }

    #[test]
    fn test_legacy_lines_are_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploaded.ndjson");
        std::fs::write(
            &path,
            "{\"chunk_id\":1,\"submission_id\":\"a\",\"avail_block\":5,\"block_hash\":\"0x1\",\"avail_tx\":\"5-1\",\"uploaded_at\":1700000000}\n",
        )
        .unwrap();

        let log = ProgressLog::open(&path).unwrap();
        assert!(log.is_done(1));
        assert_eq!(
            log.last().unwrap().transaction_reference,
            Some(Reference::Text("5-1".into()))
        );
    }
}
