//! Record sources
//!
//! A [`RowSource`] yields the whole dataset as one stream of [`Record`]s in
//! canonical order. The ordering itself is the source's job; the chunk builder
//! only ever sees records one after another.
//!
//! | table            | partition            | ordering index                      | local index               |
//! |------------------|----------------------|-------------------------------------|---------------------------|
//! | `events`         | `miniblock_number`   | `tx_index_in_block`                 | `event_index_in_block`    |
//! | `storage_logs`   | `miniblock_number`   | tx index of the first matching event, else 0 | `operation_number` |
//! | `factory_deps`   | `miniblock_number`   | 2147483647                          | rank by `bytecode_hash`   |
//! | `initial_writes` | `l1_batch_number`    | 4294967295                          | `index`                   |

use futures::stream::{self, BoxStream, StreamExt};
use lensda_common::types::Record;
use lensda_common::Result;

/// Source of canonically ordered records
pub trait RowSource {
    /// Stream every record in canonical order
    fn records(&self) -> BoxStream<'_, Result<Record>>;
}

/// In-memory source, sorted on construction
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<Record>,
}

impl MemorySource {
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RowSource for MemorySource {
    fn records(&self) -> BoxStream<'_, Result<Record>> {
        stream::iter(self.records.iter().cloned().map(Ok)).boxed()
    }
}

#[cfg(feature = "database")]
pub use postgres::{merged_rows_query, PgRowSource};

#[cfg(feature = "database")]
mod postgres {
    use super::RowSource;
    use futures::stream::{BoxStream, StreamExt};
    use lensda_common::types::{
        Record, SortKey, SourceTable, FACTORY_DEPS_ORDERING_INDEX, INITIAL_WRITES_ORDERING_INDEX,
        STORAGE_LOGS_FALLBACK_ORDERING_INDEX,
    };
    use lensda_common::{ArchiveError, Result};
    use sqlx::postgres::{PgPool, PgPoolOptions};
    use tracing::info;

    /// Merged, ordered query over the four source tables.
    ///
    /// Every row is rendered with `row_to_json`, so column changes in the
    /// source tables flow into the payload without touching this query. The
    /// trailing `payload` term keeps rows with identical keys in a stable order.
    /// It compares under the "C" collation, i.e. bytewise like `Record`'s `Ord`,
    /// whatever the server's locale.
    pub fn merged_rows_query() -> String {
        format!(
            r#"
            SELECT * FROM (
            SELECT
                e.miniblock_number::BIGINT     AS partition,
                e.tx_index_in_block::BIGINT    AS ordering_index,
                {events}::BIGINT               AS priority,
                e.event_index_in_block::BIGINT AS local_index,
                'events'::TEXT                 AS tbl,
                row_to_json(e)::TEXT           AS payload
            FROM public.events e

            UNION ALL

            SELECT
                s.miniblock_number::BIGINT,
                COALESCE(ev.tx_index_in_block::BIGINT, {fallback}),
                {storage_logs}::BIGINT,
                s.operation_number::BIGINT,
                'storage_logs'::TEXT,
                row_to_json(s)::TEXT
            FROM public.storage_logs s
            LEFT JOIN LATERAL (
                SELECT e.tx_index_in_block
                FROM public.events e
                WHERE e.tx_hash = s.tx_hash
                ORDER BY e.miniblock_number, e.event_index_in_block
                LIMIT 1
            ) ev ON TRUE

            UNION ALL

            SELECT
                f.miniblock_number::BIGINT,
                {factory_deps_index}::BIGINT,
                {factory_deps}::BIGINT,
                ROW_NUMBER() OVER (PARTITION BY f.miniblock_number ORDER BY f.bytecode_hash)::BIGINT,
                'factory_deps'::TEXT,
                row_to_json(f)::TEXT
            FROM public.factory_deps f

            UNION ALL

            SELECT
                w.l1_batch_number::BIGINT,
                {initial_writes_index}::BIGINT,
                {initial_writes}::BIGINT,
                w.index::BIGINT,
                'initial_writes'::TEXT,
                row_to_json(w)::TEXT
            FROM public.initial_writes w
            ) merged
            ORDER BY partition, ordering_index, priority, local_index, payload COLLATE "C"
            "#,
            events = SourceTable::Events.priority(),
            storage_logs = SourceTable::StorageLogs.priority(),
            factory_deps = SourceTable::FactoryDeps.priority(),
            initial_writes = SourceTable::InitialWrites.priority(),
            fallback = STORAGE_LOGS_FALLBACK_ORDERING_INDEX,
            factory_deps_index = FACTORY_DEPS_ORDERING_INDEX,
            initial_writes_index = INITIAL_WRITES_ORDERING_INDEX,
        )
    }

    #[derive(Debug, sqlx::FromRow)]
    struct MergedRow {
        partition: i64,
        ordering_index: i64,
        priority: i64,
        local_index: i64,
        tbl: String,
        payload: String,
    }

    impl MergedRow {
        fn into_record(self) -> Result<Record> {
            let table: SourceTable = self.tbl.parse().map_err(ArchiveError::database)?;
            if table.priority() != self.priority {
                return Err(ArchiveError::database(format!(
                    "Row from {} carries priority {}, expected {}",
                    table,
                    self.priority,
                    table.priority()
                )));
            }

            Ok(Record {
                table,
                key: SortKey {
                    partition: self.partition,
                    ordering_index: self.ordering_index,
                    priority: self.priority,
                    local_index: self.local_index,
                },
                payload: self.payload,
            })
        }
    }

    /// Postgres-backed source streaming the merged query
    pub struct PgRowSource {
        pool: PgPool,
        query: String,
    }

    impl PgRowSource {
        /// Connect with a single connection; the merged query is one long cursor
        pub async fn connect(dsn: &str) -> Result<Self> {
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .connect(dsn)
                .await
                .map_err(|e| ArchiveError::database(e.to_string()))?;
            info!("Connected to source database");
            Ok(Self::from_pool(pool))
        }

        pub fn from_pool(pool: PgPool) -> Self {
            Self {
                pool,
                query: merged_rows_query(),
            }
        }
    }

    impl RowSource for PgRowSource {
        fn records(&self) -> BoxStream<'_, Result<Record>> {
            sqlx::query_as::<_, MergedRow>(&self.query)
                .fetch(&self.pool)
                .map(|row| {
                    row.map_err(|e| ArchiveError::database(e.to_string()))
                        .and_then(MergedRow::into_record)
                })
                .boxed()
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    mod tests {
        use super::*;

        #[test]
        fn test_query_carries_ordering_contract() {
            let query = merged_rows_query();
            assert!(query.contains("2147483647::BIGINT"));
            assert!(query.contains("4294967295::BIGINT"));
            assert!(query.contains("COALESCE(ev.tx_index_in_block::BIGINT, 0)"));
            assert!(query.contains(
                r#"ORDER BY partition, ordering_index, priority, local_index, payload COLLATE "C""#
            ));
        }

        #[test]
        fn test_row_conversion_checks_priority() {
            let row = MergedRow {
                partition: 7,
                ordering_index: FACTORY_DEPS_ORDERING_INDEX,
                priority: 2,
                local_index: 1,
                tbl: "factory_deps".to_string(),
                payload: r#"{"bytecode_hash":"\\x01"}"#.to_string(),
            };
            let record = row.into_record().unwrap();
            assert_eq!(record.table, SourceTable::FactoryDeps);
            assert_eq!(record.key.partition, 7);

            let bad = MergedRow {
                partition: 7,
                ordering_index: 0,
                priority: 0,
                local_index: 0,
                tbl: "storage_logs".to_string(),
                payload: "{}".to_string(),
            };
            assert!(matches!(bad.into_record(), Err(ArchiveError::Database(_))));

            let unknown = MergedRow {
                partition: 7,
                ordering_index: 0,
                priority: 0,
                local_index: 0,
                tbl: "blocks".to_string(),
                payload: "{}".to_string(),
            };
            assert!(unknown.into_record().is_err());
        }
    }
}
