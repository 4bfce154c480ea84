//! Common types used across the archiver

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// Size Limits
// ============================================================================

/// Hard limit the ledger enforces on a single submitted blob.
pub const LEDGER_BLOB_LIMIT: usize = 1_000_000;

/// Head-room kept below [`LEDGER_BLOB_LIMIT`].
pub const CHUNK_SAFETY_MARGIN: usize = 1_024;

/// Default chunk size ceiling.
pub const DEFAULT_CHUNK_CEILING: usize = LEDGER_BLOB_LIMIT - CHUNK_SAFETY_MARGIN;

// ============================================================================
// Ordering Sentinels
// ============================================================================

/// Ordering index used for storage logs whose transaction has no event row.
pub const STORAGE_LOGS_FALLBACK_ORDERING_INDEX: i64 = 0;

/// Ordering index for factory deps: after every transaction of the miniblock.
pub const FACTORY_DEPS_ORDERING_INDEX: i64 = 2_147_483_647;

/// Ordering index for initial writes: after the factory deps of the partition.
pub const INITIAL_WRITES_ORDERING_INDEX: i64 = 4_294_967_295;

/// The four source tables of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    Events,
    StorageLogs,
    FactoryDeps,
    InitialWrites,
}

impl SourceTable {
    /// All tables in priority order
    pub const ALL: [SourceTable; 4] = [
        SourceTable::Events,
        SourceTable::StorageLogs,
        SourceTable::FactoryDeps,
        SourceTable::InitialWrites,
    ];

    /// Fixed priority; lower sorts earlier within the same partition and ordering index
    pub fn priority(self) -> i64 {
        match self {
            SourceTable::Events => 0,
            SourceTable::StorageLogs => 1,
            SourceTable::FactoryDeps => 2,
            SourceTable::InitialWrites => 3,
        }
    }

    /// Table name, also used as the line tag inside chunks
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTable::Events => "events",
            SourceTable::StorageLogs => "storage_logs",
            SourceTable::FactoryDeps => "factory_deps",
            SourceTable::InitialWrites => "initial_writes",
        }
    }
}

impl std::str::FromStr for SourceTable {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SourceTable::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| format!("Unknown source table: {}", s))
    }
}

impl std::fmt::Display for SourceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite sort key of a record.
///
/// Field order is the comparison order: partition, then ordering index, then
/// table priority, then the source-local index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SortKey {
    /// Block number the row belongs to
    pub partition: i64,
    /// Position inside the partition (transaction index or a sentinel)
    pub ordering_index: i64,
    /// Per-table priority, see [`SourceTable::priority`]
    pub priority: i64,
    /// Index local to the source table
    pub local_index: i64,
}

/// One tagged row of the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub table: SourceTable,
    pub key: SortKey,
    /// Row serialized as JSON text; never contains a raw newline
    pub payload: String,
}

impl Record {
    /// Build a record, deriving the priority from the table
    pub fn new(
        table: SourceTable,
        partition: i64,
        ordering_index: i64,
        local_index: i64,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            table,
            key: SortKey {
                partition,
                ordering_index,
                priority: table.priority(),
                local_index,
            },
            payload: payload.into(),
        }
    }

    /// Canonical line form stored in chunks: `<table>:<payload>\n`
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.line_len());
        line.extend_from_slice(self.table.as_str().as_bytes());
        line.push(b':');
        line.extend_from_slice(self.payload.as_bytes());
        line.push(b'\n');
        line
    }

    /// Length of [`Record::to_line`] without allocating it
    pub fn line_len(&self) -> usize {
        self.table.as_str().len() + 1 + self.payload.len() + 1
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    // Payload breaks ties so equal keys cannot swap places between runs
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.table.cmp(&other.table))
            .then_with(|| self.payload.cmp(&other.payload))
    }
}

// ============================================================================
// Ledger Types
// ============================================================================

/// Block or transaction reference reported by the ledger.
///
/// Ledgers report block numbers as integers and hashes or extrinsic ids as
/// strings; both are kept as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reference::Number(n) => write!(f, "{}", n),
            Reference::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Reference {
    fn from(value: u64) -> Self {
        Reference::Number(value)
    }
}

impl From<&str> for Reference {
    fn from(value: &str) -> Self {
        Reference::Text(value.to_string())
    }
}

/// Acknowledgment of a chunk by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub chunk_id: u64,
    pub submission_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub uploaded_at: DateTime<Utc>,
}

/// Finality state of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalityRecord {
    pub submission_id: String,
    pub finalized: bool,
    pub block_reference: Option<Reference>,
    pub block_hash: Option<String>,
    pub transaction_reference: Option<Reference>,
}

/// One line of the progress log: a chunk that is submitted and final
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub chunk_id: u64,
    pub submission_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, alias = "avail_block")]
    pub block_reference: Option<Reference>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default, alias = "avail_tx")]
    pub transaction_reference: Option<Reference>,
}

impl ProgressEntry {
    /// Join an acknowledgment with its finality confirmation
    pub fn from_parts(submission: SubmissionRecord, finality: FinalityRecord) -> Self {
        Self {
            chunk_id: submission.chunk_id,
            submission_id: submission.submission_id,
            uploaded_at: submission.uploaded_at,
            block_reference: finality.block_reference,
            block_hash: finality.block_hash,
            transaction_reference: finality.transaction_reference,
        }
    }
}
