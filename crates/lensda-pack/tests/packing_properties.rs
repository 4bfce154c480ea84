//! Property tests for chunk packing

use lensda_common::checksum::compute_digest;
use lensda_common::types::{
    Record, SourceTable, FACTORY_DEPS_ORDERING_INDEX, INITIAL_WRITES_ORDERING_INDEX,
};
use lensda_pack::{pack, MemorySource, RowSource};
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = Record> {
    (0usize..4, 0i64..20, 0i64..8, 0i64..50, "[a-z0-9]{0,120}").prop_map(
        |(table, partition, tx_index, local_index, body)| {
            let table = SourceTable::ALL[table];
            let ordering_index = match table {
                SourceTable::FactoryDeps => FACTORY_DEPS_ORDERING_INDEX,
                SourceTable::InitialWrites => INITIAL_WRITES_ORDERING_INDEX,
                _ => tx_index,
            };
            let payload = format!(r#"{{"v":"{}"}}"#, body);
            Record::new(table, partition, ordering_index, local_index, payload)
        },
    )
}

fn ordered(records: Vec<Record>) -> Vec<Record> {
    let source = MemorySource::new(records);
    futures::executor::block_on(async {
        use futures::StreamExt;
        source
            .records()
            .map(|r| r.unwrap_or_else(|e| panic!("source failed: {e}")))
            .collect()
            .await
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn chunks_never_exceed_ceiling(
        records in prop::collection::vec(record_strategy(), 0..200),
        ceiling in 160usize..2_000,
    ) {
        let chunks = pack(ordered(records), ceiling)
            .unwrap_or_else(|e| panic!("pack failed: {e}"));
        for chunk in &chunks {
            prop_assert!(!chunk.is_empty());
            prop_assert!(chunk.len() <= ceiling);
            prop_assert_eq!(&chunk.digest, &compute_digest(&chunk.bytes));
        }
    }

    #[test]
    fn packing_is_lossless_and_dense(
        records in prop::collection::vec(record_strategy(), 0..200),
        ceiling in 160usize..2_000,
    ) {
        let records = ordered(records);
        let expected: Vec<u8> = records.iter().flat_map(|r| r.to_line()).collect();
        let chunks = pack(records.clone(), ceiling)
            .unwrap_or_else(|e| panic!("pack failed: {e}"));

        let concatenated: Vec<u8> = chunks.iter().flat_map(|c| c.bytes.clone()).collect();
        prop_assert_eq!(concatenated, expected);

        let ids: Vec<u64> = chunks.iter().map(|c| c.id).collect();
        let dense: Vec<u64> = (1..=chunks.len() as u64).collect();
        prop_assert_eq!(ids, dense);

        let counted: usize = chunks.iter().map(|c| c.record_count).sum();
        prop_assert_eq!(counted, records.len());
    }

    #[test]
    fn packing_is_greedy(
        records in prop::collection::vec(record_strategy(), 1..200),
        ceiling in 160usize..2_000,
    ) {
        let records = ordered(records);
        let chunks = pack(records.clone(), ceiling)
            .unwrap_or_else(|e| panic!("pack failed: {e}"));

        // the first record of each following chunk did not fit in the previous one
        let mut offset = 0;
        for pair in chunks.windows(2) {
            offset += pair[0].record_count;
            prop_assert!(pair[0].len() + records[offset].line_len() > ceiling);
        }
    }

    #[test]
    fn input_order_does_not_change_output(
        records in prop::collection::vec(record_strategy(), 0..100),
        ceiling in 160usize..2_000,
    ) {
        let mut reversed = records.clone();
        reversed.reverse();

        let a = pack(ordered(records), ceiling).unwrap_or_else(|e| panic!("pack failed: {e}"));
        let b = pack(ordered(reversed), ceiling).unwrap_or_else(|e| panic!("pack failed: {e}"));
        prop_assert_eq!(a, b);
    }
}
