//! Greedy chunk packing
//!
//! Records are appended in the order they arrive. A chunk is closed as soon as
//! the next record would push it past the ceiling, so every chunk except the
//! last is as full as whole records allow. Records are never split.

use lensda_common::checksum::compute_digest;
use lensda_common::types::Record;
use lensda_common::{ArchiveError, Result};

/// A closed chunk, ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based, dense chunk id
    pub id: u64,
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`
    pub digest: String,
    pub record_count: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Packs records into chunks of at most `ceiling` bytes
#[derive(Debug)]
pub struct ChunkBuilder {
    ceiling: usize,
    buffer: Vec<u8>,
    buffered_records: usize,
    next_id: u64,
}

impl ChunkBuilder {
    pub fn new(ceiling: usize) -> Result<Self> {
        if ceiling == 0 {
            return Err(ArchiveError::config("Chunk ceiling must be greater than 0"));
        }

        Ok(Self {
            ceiling,
            buffer: Vec::new(),
            buffered_records: 0,
            next_id: 1,
        })
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Append a record, returning the chunk it closed, if any.
    ///
    /// Fails with [`ArchiveError::OversizeRecord`] when the record alone is
    /// larger than the ceiling.
    pub fn push(&mut self, record: &Record) -> Result<Option<Chunk>> {
        let line_len = record.line_len();
        if line_len > self.ceiling {
            return Err(ArchiveError::OversizeRecord {
                table: record.table.to_string(),
                size: line_len,
                ceiling: self.ceiling,
            });
        }

        let closed = if !self.buffer.is_empty() && self.buffer.len() + line_len > self.ceiling {
            Some(self.close())
        } else {
            None
        };

        self.buffer.extend_from_slice(&record.to_line());
        self.buffered_records += 1;
        Ok(closed)
    }

    /// Close the trailing partial chunk; an empty builder yields nothing
    pub fn finish(mut self) -> Option<Chunk> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.close())
        }
    }

    fn close(&mut self) -> Chunk {
        let bytes = std::mem::take(&mut self.buffer);
        let chunk = Chunk {
            id: self.next_id,
            digest: compute_digest(&bytes),
            bytes,
            record_count: self.buffered_records,
        };
        self.next_id += 1;
        self.buffered_records = 0;
        chunk
    }
}

/// Pack an already ordered sequence of records in memory
pub fn pack<I>(records: I, ceiling: usize) -> Result<Vec<Chunk>>
where
    I: IntoIterator<Item = Record>,
{
    let mut builder = ChunkBuilder::new(ceiling)?;
    let mut chunks = Vec::new();

    for record in records {
        if let Some(chunk) = builder.push(&record)? {
            chunks.push(chunk);
        }
    }
    chunks.extend(builder.finish());

    Ok(chunks)
}
